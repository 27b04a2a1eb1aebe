//! External representations handed to the bot and web layers

use crate::db::{QueueEntryWithTrack, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Track as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackView {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    pub play_count: i64,
}

impl From<&Track> for TrackView {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            filename: track.filename.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            genre: track.genre.clone(),
            year: track.year,
            duration: track.duration,
            format: track.format.clone(),
            play_count: track.play_count,
        }
    }
}

/// Queue entry with its track inlined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItemView {
    pub id: i64,
    pub track: TrackView,
    pub position: i64,
    #[serde(default)]
    pub requested_by: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub played: bool,
}

impl From<&QueueEntryWithTrack> for QueueItemView {
    fn from(item: &QueueEntryWithTrack) -> Self {
        Self {
            id: item.entry.id,
            track: TrackView::from(&item.track),
            position: item.entry.position,
            requested_by: item.entry.requested_by.clone(),
            requested_at: item.entry.requested_at,
            played: item.entry.played,
        }
    }
}

/// Status snapshot enriched with queue length and current track detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub is_connected: bool,
    pub is_playing: bool,
    #[serde(default)]
    pub current_track: Option<TrackView>,
    pub volume: f32,
    pub position: f64,
    pub queue_length: i64,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            guild_id: None,
            channel_id: None,
            is_connected: false,
            is_playing: false,
            current_track: None,
            volume: 0.5,
            position: 0.0,
            queue_length: 0,
        }
    }
}
