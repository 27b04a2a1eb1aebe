//! Audio session abstraction
//!
//! The engine never talks to a decoder directly: it asks an [`AudioBackend`]
//! to start a session and gets back an [`AudioSession`] to control. When a
//! session ends by itself the backend reports it through the
//! [`SessionNotifier`], which posts into the engine mailbox.

use super::events::EngineMessage;
use crate::error::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

/// Everything a backend needs to start one track
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub session_id: u64,
    pub track_id: i64,
    pub path: PathBuf,
    /// 0.0-1.0, fixed for the lifetime of the session
    pub volume: f32,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Decoder reached the end of the track
    Completed,
    /// Decoder or sink failed mid-stream
    Failed(String),
    /// Session was torn down on request
    Stopped,
}

/// Controls one running session
pub trait AudioSession: Send {
    fn session_id(&self) -> u64;

    /// Stop pulling audio; the decoder stalls on back-pressure
    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Tear the session down in the background
    ///
    /// Returns immediately. Failure to terminate the decoder is logged by
    /// the backend, not reported.
    fn stop(&mut self);

    /// Seconds of audio delivered to the sink so far
    fn position_secs(&self) -> f64;
}

/// Starts sessions
pub trait AudioBackend: Send + 'static {
    /// Launch a session, or fail with `ExternalFailure` if the decoder
    /// cannot be started
    fn start(
        &mut self,
        request: SessionRequest,
        notifier: SessionNotifier,
    ) -> Result<Box<dyn AudioSession>>;
}

/// Reports the end of one session into the engine mailbox
#[derive(Debug, Clone)]
pub struct SessionNotifier {
    session_id: u64,
    mailbox: mpsc::Sender<EngineMessage>,
}

impl SessionNotifier {
    pub(crate) fn new(session_id: u64, mailbox: mpsc::Sender<EngineMessage>) -> Self {
        Self {
            session_id,
            mailbox,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub async fn finished(self, outcome: SessionOutcome) {
        let message = EngineMessage::SessionFinished {
            session_id: self.session_id,
            outcome,
        };
        if self.mailbox.send(message).await.is_err() {
            debug!(
                "Engine gone, dropping completion of session {}",
                self.session_id
            );
        }
    }
}
