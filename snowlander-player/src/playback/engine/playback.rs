//! Session control

use super::core::{ActiveSession, PlaybackEngine};
use crate::db::tracks;
use crate::error::{Error, Result};
use crate::playback::session::SessionRequest;
use crate::playback::state::{PlaybackState, VoiceConnection};
use crate::status::StatusUpdate;
use snowlander_common::db::Track;
use snowlander_common::events::{SnowEvent, TrackView};
use std::path::PathBuf;
use tracing::{info, warn};

impl PlaybackEngine {
    /// Replace whatever is playing with `track`
    ///
    /// Requires a connection. On launch failure the engine is left Idle and
    /// the backend's error is returned.
    pub(super) async fn play_track(&mut self, track: Track) -> Result<()> {
        if self.connection.is_none() {
            return Err(Error::NotConnected);
        }

        self.end_session();

        let session_id = self.allocate_session_id();
        let notifier = self.notifier(session_id)?;
        let volume = self.status.status().await.volume;
        let request = SessionRequest {
            session_id,
            track_id: track.id,
            path: PathBuf::from(&track.filepath),
            volume,
        };

        let audio = match self.backend.start(request, notifier) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Failed to start track {} ({}): {}", track.id, track.filepath, e);
                self.status
                    .apply_update(
                        StatusUpdate::new()
                            .playing(false)
                            .current_track(None)
                            .position(0.0),
                    )
                    .await;
                return Err(e);
            }
        };

        info!(
            "Now playing: {} by {} (session {})",
            track.display_title(),
            track.display_artist(),
            session_id
        );

        self.session = Some(ActiveSession {
            id: session_id,
            track: track.clone(),
            audio,
        });
        self.state = PlaybackState::Playing;

        let track = match tracks::record_play(&self.db, track.id).await {
            Ok(()) => tracks::get_track(&self.db, track.id).await.unwrap_or(track),
            Err(e) => {
                warn!("Failed to record play of track {}: {}", track.id, e);
                track
            }
        };

        self.status
            .fanout()
            .broadcast(SnowEvent::track_started(TrackView::from(&track)));
        self.status
            .apply_update(
                StatusUpdate::new()
                    .playing(true)
                    .current_track(Some(track.id))
                    .position(0.0),
            )
            .await;

        Ok(())
    }

    pub(super) async fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(Error::InvalidState("Nothing is playing".to_string()));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::InvalidState("Nothing is playing".to_string()))?;

        session.audio.pause()?;
        let position = session.audio.position_secs();
        self.state = PlaybackState::Paused;
        info!("Paused session {} at {:.1}s", session.id, position);

        self.status
            .apply_update(StatusUpdate::new().playing(false).position(position))
            .await;
        Ok(())
    }

    pub(super) async fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            return Err(Error::InvalidState("Playback is not paused".to_string()));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::InvalidState("Playback is not paused".to_string()))?;

        session.audio.resume()?;
        self.state = PlaybackState::Playing;
        info!("Resumed session {}", session.id);

        self.status
            .apply_update(StatusUpdate::new().playing(true))
            .await;
        Ok(())
    }

    /// Stop playback; a no-op when already Idle
    pub(super) async fn stop(&mut self) -> Result<()> {
        if self.end_session().is_none() {
            return Ok(());
        }
        info!("Playback stopped");

        self.status
            .apply_update(
                StatusUpdate::new()
                    .playing(false)
                    .current_track(None)
                    .position(0.0),
            )
            .await;
        Ok(())
    }

    /// End the current session and move on as if it had completed
    pub(super) async fn skip(&mut self) -> Result<()> {
        let session = self
            .end_session()
            .ok_or_else(|| Error::InvalidState("Nothing is playing".to_string()))?;
        info!("Skipped track {}", session.track.id);

        self.status
            .apply_update(
                StatusUpdate::new()
                    .playing(false)
                    .current_track(None)
                    .position(0.0),
            )
            .await;
        self.advance_queue().await;
        Ok(())
    }

    /// Clamp and store the volume; the running session keeps its own
    pub(super) async fn set_volume(&mut self, volume: f32) -> Result<f32> {
        if !volume.is_finite() {
            return Err(Error::InvalidState(format!("Invalid volume: {}", volume)));
        }
        let volume = volume.clamp(0.0, 1.0);
        info!("Volume set to {:.2}", volume);

        self.status
            .apply_update(StatusUpdate::new().volume(volume))
            .await;
        Ok(volume)
    }

    /// Attach to a voice channel, moving if already connected elsewhere
    pub(super) async fn connect(&mut self, guild_id: String, channel_id: String) -> Result<()> {
        let connection = VoiceConnection {
            guild_id,
            channel_id,
        };
        if self.connection.as_ref() == Some(&connection) {
            return Ok(());
        }

        match &self.connection {
            Some(old) => info!("Moving from channel {} to {}", old.channel_id, connection.channel_id),
            None => info!(
                "Connected to channel {} in guild {}",
                connection.channel_id, connection.guild_id
            ),
        }

        let update = StatusUpdate::new().connected(true).channel(
            Some(connection.guild_id.clone()),
            Some(connection.channel_id.clone()),
        );
        self.connection = Some(connection);
        self.status.apply_update(update).await;
        Ok(())
    }

    pub(super) async fn disconnect(&mut self) -> Result<()> {
        if self.connection.is_none() && self.session.is_none() {
            return Ok(());
        }
        info!("Disconnecting from voice");
        self.drop_connection(true).await;
        Ok(())
    }

    pub(super) async fn on_connection_lost(&mut self) {
        warn!("Voice connection lost");
        self.drop_connection(false).await;
    }

    /// Unconditional Idle without a connection
    ///
    /// `clear_channel` also forgets the guild and channel ids.
    async fn drop_connection(&mut self, clear_channel: bool) {
        self.end_session();
        self.connection = None;

        let mut update = StatusUpdate::new()
            .connected(false)
            .playing(false)
            .current_track(None)
            .position(0.0);
        if clear_channel {
            update = update.channel(None, None);
        }
        self.status.apply_update(update).await;
    }
}
