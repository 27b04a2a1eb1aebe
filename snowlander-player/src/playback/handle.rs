//! Public entry point to the coordinator
//!
//! Reads (catalog, pending queue, snapshot) go straight to the database and
//! the status slot. Everything that mutates playback, queue or status is
//! sent to the engine task and awaited.

use super::events::{EngineCommand, EngineMessage, Reply, RequestOutcome};
use crate::db::tracks::TrackFilter;
use crate::db::{queue, tracks};
use crate::error::{Error, Result};
use crate::sse::{SubscriberId, Subscription};
use crate::status::StatusAggregator;
use snowlander_common::db::{QueueEntry, QueueEntryWithTrack, Track};
use snowlander_common::events::StatusView;
use sqlx::{Pool, Sqlite};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Cloneable handle to a running engine
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<EngineMessage>,
    db: Pool<Sqlite>,
    status: StatusAggregator,
    search_limit: i64,
}

impl PlayerHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<EngineMessage>,
        db: Pool<Sqlite>,
        status: StatusAggregator,
        search_limit: i64,
    ) -> Self {
        Self {
            tx,
            db,
            status,
            search_limit,
        }
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> EngineCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::Command(command(reply)))
            .await
            .map_err(|_| Error::EngineUnavailable)?;
        rx.await.map_err(|_| Error::EngineUnavailable)?
    }

    // Catalog

    pub async fn find_track(&self, term: &str) -> Result<Track> {
        tracks::find_track(&self.db, term).await
    }

    /// Search with an explicit bound, or the configured default
    pub async fn search_tracks(&self, term: &str, limit: Option<i64>) -> Result<Vec<Track>> {
        tracks::search_tracks(&self.db, term, limit.unwrap_or(self.search_limit)).await
    }

    pub async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        tracks::list_tracks(&self.db, filter).await
    }

    pub async fn get_track(&self, track_id: i64) -> Result<Track> {
        tracks::get_track(&self.db, track_id).await
    }

    pub async fn track_count(&self) -> Result<i64> {
        tracks::track_count(&self.db).await
    }

    // Queue

    pub async fn enqueue(&self, track_id: i64, requested_by: Option<String>) -> Result<QueueEntry> {
        self.call(|reply| EngineCommand::Enqueue {
            track_id,
            requested_by,
            reply,
        })
        .await
    }

    /// Play the best match for `term` now, or queue it if something is
    /// already playing
    pub async fn request(&self, term: &str, requested_by: Option<String>) -> Result<RequestOutcome> {
        let term = term.to_string();
        self.call(|reply| EngineCommand::Request {
            term,
            requested_by,
            reply,
        })
        .await
    }

    pub async fn list_pending(&self, limit: i64) -> Result<Vec<QueueEntryWithTrack>> {
        queue::list_pending(&self.db, limit).await
    }

    pub async fn remove_from_queue(&self, entry_id: i64) -> Result<bool> {
        self.call(|reply| EngineCommand::RemoveFromQueue { entry_id, reply })
            .await
    }

    // Playback

    pub async fn play_track(&self, track: Track) -> Result<()> {
        self.call(|reply| EngineCommand::PlayTrack { track, reply })
            .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.call(|reply| EngineCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.call(|reply| EngineCommand::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.call(|reply| EngineCommand::Stop { reply }).await
    }

    pub async fn skip(&self) -> Result<()> {
        self.call(|reply| EngineCommand::Skip { reply }).await
    }

    /// Returns the volume actually stored (clamped to 0.0-1.0)
    pub async fn set_volume(&self, volume: f32) -> Result<f32> {
        self.call(|reply| EngineCommand::SetVolume { volume, reply })
            .await
    }

    // Connection

    pub async fn connect(&self, guild_id: impl Into<String>, channel_id: impl Into<String>) -> Result<()> {
        let guild_id = guild_id.into();
        let channel_id = channel_id.into();
        self.call(|reply| EngineCommand::Connect {
            guild_id,
            channel_id,
            reply,
        })
        .await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.call(|reply| EngineCommand::Disconnect { reply }).await
    }

    /// Report that the voice layer dropped the connection
    pub async fn connection_lost(&self) {
        if self.tx.send(EngineMessage::ConnectionLost).await.is_err() {
            warn!("Connection loss reported after engine shutdown");
        }
    }

    // Status and events

    pub async fn current_snapshot(&self) -> Result<StatusView> {
        self.status.current_snapshot().await
    }

    pub fn subscribe(&self) -> Subscription {
        self.status.fanout().subscribe()
    }

    /// Subscription plus a snapshot that no buffered `status_update` predates
    pub async fn subscribe_with_snapshot(&self) -> (Subscription, Result<StatusView>) {
        self.status.subscribe_with_snapshot().await
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.status.fanout().unsubscribe(id)
    }

    /// Stop the engine and wait for it to wind down
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        let message = EngineMessage::Command(EngineCommand::Shutdown { reply });
        if self.tx.send(message).await.is_err() {
            return;
        }
        let _ = rx.await;
    }
}
