//! Event envelope pushed to observers
//!
//! Every event carries a `type` discriminator (`status_update`,
//! `queue_update`, `track_update`) and a payload in the external
//! representation from [`views`].

mod views;

pub use views::{QueueItemView, StatusView, TrackView};

use serde::{Deserialize, Serialize};

/// What happened to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    /// A request was appended
    Added,
    /// An unplayed request was removed
    Removed,
    /// The engine took the next request off the queue
    Advanced,
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueAction::Added => write!(f, "added"),
            QueueAction::Removed => write!(f, "removed"),
            QueueAction::Advanced => write!(f, "advanced"),
        }
    }
}

/// SNOWLANDER event envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnowEvent {
    /// Status snapshot changed
    StatusUpdate { data: StatusView },

    /// Queue changed
    ///
    /// `data` carries the affected item for `added`/`advanced`;
    /// `queue_item_id` alone identifies a `removed` item.
    QueueUpdate {
        action: QueueAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<QueueItemView>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue_item_id: Option<i64>,
    },

    /// A track started playing
    TrackUpdate { data: TrackView },
}

impl SnowEvent {
    pub fn status(view: StatusView) -> Self {
        SnowEvent::StatusUpdate { data: view }
    }

    pub fn queue_added(item: QueueItemView) -> Self {
        SnowEvent::QueueUpdate {
            queue_item_id: Some(item.id),
            action: QueueAction::Added,
            data: Some(item),
        }
    }

    pub fn queue_advanced(item: QueueItemView) -> Self {
        SnowEvent::QueueUpdate {
            queue_item_id: Some(item.id),
            action: QueueAction::Advanced,
            data: Some(item),
        }
    }

    pub fn queue_removed(queue_item_id: i64) -> Self {
        SnowEvent::QueueUpdate {
            action: QueueAction::Removed,
            data: None,
            queue_item_id: Some(queue_item_id),
        }
    }

    pub fn track_started(track: TrackView) -> Self {
        SnowEvent::TrackUpdate { data: track }
    }

    /// Wire name of the `type` discriminator
    pub fn event_type(&self) -> &'static str {
        match self {
            SnowEvent::StatusUpdate { .. } => "status_update",
            SnowEvent::QueueUpdate { .. } => "queue_update",
            SnowEvent::TrackUpdate { .. } => "track_update",
        }
    }
}
