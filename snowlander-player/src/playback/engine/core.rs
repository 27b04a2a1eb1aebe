//! Core playback engine: lifecycle and message dispatch
//!
//! The engine task owns the playback state, the active audio session and
//! the connection. Nothing else mutates them: commands, session completions
//! and connection loss all arrive through one mailbox and are handled in
//! arrival order.

use crate::error::{Error, Result};
use crate::playback::events::{EngineCommand, EngineMessage, Reply};
use crate::playback::handle::PlayerHandle;
use crate::playback::session::{AudioBackend, AudioSession, SessionNotifier};
use crate::playback::state::{PlaybackState, VoiceConnection};
use crate::status::{StatusAggregator, StatusUpdate};
use snowlander_common::config::PlayerConfig;
use snowlander_common::db::Track;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Engine tuning taken from the player config
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// How often the playing session's position is written to the status
    pub position_interval: Duration,
    /// Result bound for searches that do not give one
    pub search_limit: i64,
    pub mailbox_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            position_interval: Duration::from_millis(5000),
            search_limit: 10,
            mailbox_capacity: 64,
        }
    }
}

impl From<&PlayerConfig> for EngineSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            position_interval: Duration::from_millis(config.position_interval_ms),
            search_limit: config.search_limit,
            ..Self::default()
        }
    }
}

/// The session currently attached to the sink
pub(super) struct ActiveSession {
    pub(super) id: u64,
    pub(super) track: Track,
    pub(super) audio: Box<dyn AudioSession>,
}

/// Playback engine - single owner of all playback state
pub struct PlaybackEngine {
    pub(super) db: Pool<Sqlite>,
    pub(super) status: StatusAggregator,
    pub(super) backend: Box<dyn AudioBackend>,
    /// Used to hand out session notifiers without keeping the mailbox open
    pub(super) mailbox: mpsc::WeakSender<EngineMessage>,
    pub(super) state: PlaybackState,
    pub(super) session: Option<ActiveSession>,
    pub(super) connection: Option<VoiceConnection>,
    pub(super) next_session_id: u64,
}

impl PlaybackEngine {
    /// Start the engine task and return a handle to it
    ///
    /// The task runs until [`PlayerHandle::shutdown`] or until every handle
    /// and session notifier has been dropped.
    pub fn spawn(
        db: Pool<Sqlite>,
        status: StatusAggregator,
        backend: Box<dyn AudioBackend>,
        settings: EngineSettings,
    ) -> (PlayerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(settings.mailbox_capacity.max(1));

        let engine = PlaybackEngine {
            db: db.clone(),
            status: status.clone(),
            backend,
            mailbox: tx.downgrade(),
            state: PlaybackState::Idle,
            session: None,
            connection: None,
            next_session_id: 0,
        };

        let position_interval = settings.position_interval;
        let task = tokio::spawn(engine.run(rx, position_interval));
        info!("Playback engine started");

        (PlayerHandle::new(tx, db, status, settings.search_limit), task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<EngineMessage>, position_interval: Duration) {
        let mut ticker = tokio::time::interval(position_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(EngineMessage::Command(EngineCommand::Shutdown { reply })) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(message) => self.handle_message(message).await,
                    None => {
                        debug!("All engine handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.sample_position().await,
            }
        }

        info!("Playback engine stopped");
    }

    async fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Command(command) => self.handle_command(command).await,
            EngineMessage::SessionFinished {
                session_id,
                outcome,
            } => self.on_session_finished(session_id, outcome).await,
            EngineMessage::ConnectionLost => self.on_connection_lost().await,
        }
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::PlayTrack { track, reply } => {
                let result = self.play_track(track).await;
                respond(reply, result);
            }
            EngineCommand::Request {
                term,
                requested_by,
                reply,
            } => {
                let result = self.request(&term, requested_by.as_deref()).await;
                respond(reply, result);
            }
            EngineCommand::Enqueue {
                track_id,
                requested_by,
                reply,
            } => {
                let result = self.enqueue(track_id, requested_by.as_deref()).await;
                respond(reply, result);
            }
            EngineCommand::RemoveFromQueue { entry_id, reply } => {
                let result = self.remove_from_queue(entry_id).await;
                respond(reply, result);
            }
            EngineCommand::Pause { reply } => {
                let result = self.pause().await;
                respond(reply, result);
            }
            EngineCommand::Resume { reply } => {
                let result = self.resume().await;
                respond(reply, result);
            }
            EngineCommand::Stop { reply } => {
                let result = self.stop().await;
                respond(reply, result);
            }
            EngineCommand::Skip { reply } => {
                let result = self.skip().await;
                respond(reply, result);
            }
            EngineCommand::SetVolume { volume, reply } => {
                let result = self.set_volume(volume).await;
                respond(reply, result);
            }
            EngineCommand::Connect {
                guild_id,
                channel_id,
                reply,
            } => {
                let result = self.connect(guild_id, channel_id).await;
                respond(reply, result);
            }
            EngineCommand::Disconnect { reply } => {
                let result = self.disconnect().await;
                respond(reply, result);
            }
            EngineCommand::Shutdown { reply } => {
                // Intercepted by the run loop
                let _ = reply.send(());
            }
        }
    }

    /// Write the playing session's position into the status
    async fn sample_position(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let position = match self.session.as_ref() {
            Some(session) => session.audio.position_secs(),
            None => return,
        };
        self.status
            .apply_update(StatusUpdate::new().position(position))
            .await;
    }

    /// Detach the active session and stop it in the background
    ///
    /// Leaves the engine Idle. Any completion the session still reports is
    /// stale from here on.
    pub(super) fn end_session(&mut self) -> Option<ActiveSession> {
        self.state = PlaybackState::Idle;
        let mut session = self.session.take()?;
        debug!("Ending session {} (track {})", session.id, session.track.id);
        session.audio.stop();
        Some(session)
    }

    pub(super) fn allocate_session_id(&mut self) -> u64 {
        self.next_session_id += 1;
        self.next_session_id
    }

    pub(super) fn notifier(&self, session_id: u64) -> Result<SessionNotifier> {
        self.mailbox
            .upgrade()
            .map(|tx| SessionNotifier::new(session_id, tx))
            .ok_or(Error::EngineUnavailable)
    }

    async fn shutdown(&mut self) {
        info!("Shutting down playback engine");
        if self.end_session().is_some() {
            self.status
                .apply_update(
                    StatusUpdate::new()
                        .playing(false)
                        .current_track(None)
                        .position(0.0),
                )
                .await;
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T>) {
    if reply.send(result).is_err() {
        debug!("Caller went away before the engine replied");
    }
}
