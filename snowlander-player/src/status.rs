//! Status aggregator
//!
//! Holds the single authoritative [`PlaybackStatus`] slot. Every mutation
//! goes through [`StatusAggregator::apply_update`], which writes the row
//! through to `bot_status` and broadcasts a `status_update` to observers.

use crate::db::{queue, status as status_db, tracks};
use crate::error::Result;
use crate::sse::{EventFanout, Subscription};
use snowlander_common::db::PlaybackStatus;
use snowlander_common::events::{SnowEvent, StatusView, TrackView};
use snowlander_common::time::now;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Partial status change; `None` fields are left untouched
///
/// Nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub guild_id: Option<Option<String>>,
    pub channel_id: Option<Option<String>>,
    pub is_connected: Option<bool>,
    pub is_playing: Option<bool>,
    pub current_track_id: Option<Option<i64>>,
    pub volume: Option<f32>,
    pub position: Option<f64>,
}

impl StatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(mut self, is_connected: bool) -> Self {
        self.is_connected = Some(is_connected);
        self
    }

    pub fn channel(mut self, guild_id: Option<String>, channel_id: Option<String>) -> Self {
        self.guild_id = Some(guild_id);
        self.channel_id = Some(channel_id);
        self
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = Some(is_playing);
        self
    }

    pub fn current_track(mut self, track_id: Option<i64>) -> Self {
        self.current_track_id = Some(track_id);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    fn apply_to(self, status: &mut PlaybackStatus) {
        if let Some(v) = self.guild_id {
            status.guild_id = v;
        }
        if let Some(v) = self.channel_id {
            status.channel_id = v;
        }
        if let Some(v) = self.is_connected {
            status.is_connected = v;
        }
        if let Some(v) = self.is_playing {
            status.is_playing = v;
        }
        if let Some(v) = self.current_track_id {
            status.current_track_id = v;
        }
        if let Some(v) = self.volume {
            status.volume = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.position {
            status.position = v.max(0.0);
        }
        status.last_updated = now();
    }
}

struct StatusInner {
    db: Pool<Sqlite>,
    fanout: EventFanout,
    slot: RwLock<PlaybackStatus>,
    /// Held from slot write to broadcast, and while a subscriber joins
    publish: Mutex<()>,
    persist_timeout: Duration,
}

/// Cheaply cloneable handle to the status slot
#[derive(Clone)]
pub struct StatusAggregator {
    inner: Arc<StatusInner>,
}

impl StatusAggregator {
    /// Start from an explicit status (nothing is read or written yet)
    pub fn new(
        db: Pool<Sqlite>,
        fanout: EventFanout,
        initial: PlaybackStatus,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                db,
                fanout,
                slot: RwLock::new(initial),
                publish: Mutex::new(()),
                persist_timeout,
            }),
        }
    }

    /// Restore the slot from the persisted row
    ///
    /// Volume and channel ids survive a restart. No audio session does, so
    /// the connected/playing flags, current track and position are reset and
    /// the reset row is written back.
    pub async fn load(
        db: Pool<Sqlite>,
        fanout: EventFanout,
        default_volume: f32,
        persist_timeout: Duration,
    ) -> Result<Self> {
        let status = match status_db::load_status(&db).await? {
            Some(mut stored) => {
                info!(
                    "Restored status row (volume {:.2}, channel {:?})",
                    stored.volume, stored.channel_id
                );
                stored.is_connected = false;
                stored.is_playing = false;
                stored.current_track_id = None;
                stored.position = 0.0;
                stored.last_updated = now();
                stored
            }
            None => {
                info!("No status row yet, starting with volume {:.2}", default_volume);
                PlaybackStatus::with_volume(default_volume)
            }
        };

        let aggregator = Self::new(db, fanout, status.clone(), persist_timeout);
        aggregator.persist(&status).await;
        Ok(aggregator)
    }

    pub fn fanout(&self) -> &EventFanout {
        &self.inner.fanout
    }

    /// Copy of the raw status row
    pub async fn status(&self) -> PlaybackStatus {
        self.inner.slot.read().await.clone()
    }

    /// Apply the supplied fields, persist, broadcast, and return the new
    /// snapshot
    pub async fn apply_update(&self, update: StatusUpdate) -> StatusView {
        let _publishing = self.inner.publish.lock().await;
        let status = {
            let mut slot = self.inner.slot.write().await;
            update.apply_to(&mut slot);
            slot.clone()
        };

        self.persist(&status).await;

        let view = self.enrich(&status).await;
        self.inner.fanout.broadcast(SnowEvent::status(view.clone()));
        view
    }

    /// Subscribe and take a snapshot with no status broadcast in between
    ///
    /// Every `status_update` the subscription receives is newer than the
    /// returned snapshot.
    pub async fn subscribe_with_snapshot(&self) -> (Subscription, Result<StatusView>) {
        let _publishing = self.inner.publish.lock().await;
        let subscription = self.inner.fanout.subscribe();
        let snapshot = self.current_snapshot().await;
        (subscription, snapshot)
    }

    /// Status enriched with queue length and current track detail
    pub async fn current_snapshot(&self) -> Result<StatusView> {
        let status = self.status().await;
        let queue_length = queue::pending_count(&self.inner.db).await?;
        let current_track = match status.current_track_id {
            Some(id) => Some(TrackView::from(&tracks::get_track(&self.inner.db, id).await?)),
            None => None,
        };
        Ok(view_of(&status, current_track, queue_length))
    }

    /// Snapshot for a broadcast: lookup failures degrade to missing detail
    async fn enrich(&self, status: &PlaybackStatus) -> StatusView {
        let queue_length = queue::pending_count(&self.inner.db)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to count pending queue entries: {}", e);
                0
            });

        let current_track = match status.current_track_id {
            Some(id) => match tracks::get_track(&self.inner.db, id).await {
                Ok(track) => Some(TrackView::from(&track)),
                Err(e) => {
                    warn!("Failed to load current track {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        view_of(status, current_track, queue_length)
    }

    /// Write-through with a bounded wait; failure only costs durability
    async fn persist(&self, status: &PlaybackStatus) {
        match tokio::time::timeout(
            self.inner.persist_timeout,
            status_db::save_status(&self.inner.db, status),
        )
        .await
        {
            Ok(Ok(())) => debug!("Status persisted"),
            Ok(Err(e)) => warn!("Failed to persist status: {}", e),
            Err(_) => warn!(
                "Persisting status timed out after {:?}",
                self.inner.persist_timeout
            ),
        }
    }
}

fn view_of(status: &PlaybackStatus, current_track: Option<TrackView>, queue_length: i64) -> StatusView {
    StatusView {
        guild_id: status.guild_id.clone(),
        channel_id: status.channel_id.clone(),
        is_connected: status.is_connected,
        is_playing: status.is_playing,
        current_track,
        volume: status.volume,
        position: status.position,
        queue_length,
    }
}
