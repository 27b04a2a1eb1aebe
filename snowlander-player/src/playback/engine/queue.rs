//! Queue operations and auto-advance

use super::core::PlaybackEngine;
use crate::db::{queue, tracks};
use crate::error::{Error, Result};
use crate::playback::events::RequestOutcome;
use crate::playback::session::SessionOutcome;
use crate::playback::state::PlaybackState;
use crate::status::StatusUpdate;
use snowlander_common::db::QueueEntry;
use snowlander_common::events::{QueueItemView, SnowEvent};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    pub(super) async fn enqueue(
        &mut self,
        track_id: i64,
        requested_by: Option<&str>,
    ) -> Result<QueueEntry> {
        let entry = queue::enqueue(&self.db, track_id, requested_by).await?;
        info!(
            "Queued track {} at position {} (entry {})",
            track_id, entry.position, entry.id
        );

        match queue::get_entry(&self.db, entry.id).await {
            Ok(item) => {
                self.status
                    .fanout()
                    .broadcast(SnowEvent::queue_added(QueueItemView::from(&item)));
            }
            Err(e) => warn!("Failed to load queue entry {} for broadcast: {}", entry.id, e),
        }
        self.status.apply_update(StatusUpdate::new()).await;

        Ok(entry)
    }

    pub(super) async fn remove_from_queue(&mut self, entry_id: i64) -> Result<bool> {
        let removed = queue::remove(&self.db, entry_id).await?;
        if removed {
            info!("Removed queue entry {}", entry_id);
            self.status
                .fanout()
                .broadcast(SnowEvent::queue_removed(entry_id));
            self.status.apply_update(StatusUpdate::new()).await;
        }
        Ok(removed)
    }

    /// "Play X": start the best match now if nothing is playing, otherwise
    /// queue it
    pub(super) async fn request(
        &mut self,
        term: &str,
        requested_by: Option<&str>,
    ) -> Result<RequestOutcome> {
        let track = tracks::find_track(&self.db, term).await?;

        if self.state == PlaybackState::Playing {
            let entry = self.enqueue(track.id, requested_by).await?;
            Ok(RequestOutcome::Queued { track, entry })
        } else {
            if self.connection.is_none() {
                return Err(Error::NotConnected);
            }
            self.play_track(track.clone()).await?;
            Ok(RequestOutcome::Started(track))
        }
    }

    pub(super) async fn on_session_finished(&mut self, session_id: u64, outcome: SessionOutcome) {
        let current = self.session.as_ref().map(|s| s.id);
        if current != Some(session_id) {
            debug!(
                "Ignoring completion of stale session {} (current {:?})",
                session_id, current
            );
            return;
        }

        match &outcome {
            SessionOutcome::Completed => info!("Session {} completed", session_id),
            SessionOutcome::Failed(reason) => warn!("Session {} failed: {}", session_id, reason),
            SessionOutcome::Stopped => debug!("Session {} stopped", session_id),
        }

        self.session = None;
        self.state = PlaybackState::Idle;
        self.status
            .apply_update(
                StatusUpdate::new()
                    .playing(false)
                    .current_track(None)
                    .position(0.0),
            )
            .await;

        self.advance_queue().await;
    }

    /// Start the next queued track
    ///
    /// Entries whose track fails to launch are left marked played and the
    /// next one is tried. Nothing is taken off the queue while disconnected.
    pub(super) async fn advance_queue(&mut self) {
        if self.connection.is_none() {
            debug!("Not connected, leaving the queue untouched");
            return;
        }

        loop {
            let next = match queue::peek_next(&self.db).await {
                Ok(Some(next)) => next,
                Ok(None) => {
                    debug!("Queue empty, staying idle");
                    return;
                }
                Err(e) => {
                    warn!("Failed to read the queue: {}", e);
                    return;
                }
            };

            if let Err(e) = queue::advance(&self.db, next.entry.id).await {
                warn!("Failed to advance queue entry {}: {}", next.entry.id, e);
                return;
            }

            let mut item = QueueItemView::from(&next);
            item.played = true;
            self.status
                .fanout()
                .broadcast(SnowEvent::queue_advanced(item));

            match self.play_track(next.track).await {
                Ok(()) => return,
                Err(e @ (Error::NotConnected | Error::EngineUnavailable)) => {
                    warn!("Cannot start queue entry {}: {}", next.entry.id, e);
                    return;
                }
                Err(e) => warn!("Skipping queue entry {}: {}", next.entry.id, e),
            }
        }
    }
}
