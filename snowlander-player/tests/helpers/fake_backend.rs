//! In-process audio backend

use snowlander_player::error::{Error, Result};
use snowlander_player::playback::{
    AudioBackend, AudioSession, SessionNotifier, SessionOutcome, SessionRequest,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything the engine did to one session
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub request: SessionRequest,
    pub paused: bool,
    pub stopped: bool,
}

#[derive(Default)]
struct Recorded {
    sessions: Vec<FakeSession>,
    notifiers: Vec<Option<SessionNotifier>>,
    failing_paths: HashSet<PathBuf>,
    position_secs: f64,
}

/// Clones share state, so the test keeps one while the engine owns another
#[derive(Clone, Default)]
pub struct FakeBackend {
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sessions for `path` fail to launch
    pub fn fail_path(&self, path: impl AsRef<Path>) {
        self.recorded
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.as_ref().to_path_buf());
    }

    /// Position every session reports
    pub fn set_position(&self, secs: f64) {
        self.recorded.lock().unwrap().position_secs = secs;
    }

    pub fn sessions(&self) -> Vec<FakeSession> {
        self.recorded.lock().unwrap().sessions.clone()
    }

    pub fn session(&self, session_id: u64) -> FakeSession {
        self.sessions()
            .into_iter()
            .find(|s| s.request.session_id == session_id)
            .expect("no such session")
    }

    pub fn last_session(&self) -> FakeSession {
        self.sessions().last().cloned().expect("no session started")
    }

    /// Track ids in the order their sessions started
    pub fn started_tracks(&self) -> Vec<i64> {
        self.sessions().iter().map(|s| s.request.track_id).collect()
    }

    /// Report the end of a session, as the decoder would
    pub async fn finish(&self, session_id: u64, outcome: SessionOutcome) {
        let notifier = {
            let mut recorded = self.recorded.lock().unwrap();
            let index = recorded
                .sessions
                .iter()
                .position(|s| s.request.session_id == session_id)
                .expect("no such session");
            recorded.notifiers[index]
                .take()
                .expect("session already finished")
        };
        notifier.finished(outcome).await;
    }

    pub async fn complete_last(&self) {
        let id = self.last_session().request.session_id;
        self.finish(id, SessionOutcome::Completed).await;
    }
}

impl AudioBackend for FakeBackend {
    fn start(
        &mut self,
        request: SessionRequest,
        notifier: SessionNotifier,
    ) -> Result<Box<dyn AudioSession>> {
        let mut recorded = self.recorded.lock().unwrap();
        if recorded.failing_paths.contains(&request.path) {
            return Err(Error::ExternalFailure(format!(
                "Audio file not found: {}",
                request.path.display()
            )));
        }

        let session_id = request.session_id;
        recorded.sessions.push(FakeSession {
            request,
            paused: false,
            stopped: false,
        });
        recorded.notifiers.push(Some(notifier));

        Ok(Box::new(FakeSessionHandle {
            session_id,
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct FakeSessionHandle {
    session_id: u64,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeSessionHandle {
    fn update(&self, f: impl FnOnce(&mut FakeSession)) {
        let mut recorded = self.recorded.lock().unwrap();
        if let Some(session) = recorded
            .sessions
            .iter_mut()
            .find(|s| s.request.session_id == self.session_id)
        {
            f(session);
        }
    }
}

impl AudioSession for FakeSessionHandle {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    fn pause(&mut self) -> Result<()> {
        self.update(|s| s.paused = true);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.update(|s| s.paused = false);
        Ok(())
    }

    fn stop(&mut self) {
        self.update(|s| s.stopped = true);
    }

    fn position_secs(&self) -> f64 {
        self.recorded.lock().unwrap().position_secs
    }
}
