//! Database records
//!
//! Plain records mapped explicitly from rows. Relationships (queue entry to
//! track, status to current track) are ids; joins happen in the query
//! functions that need them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Catalog entry for one audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// File size in bytes
    pub file_size: Option<i64>,
    pub format: Option<String>,
    pub bitrate: Option<i64>,
    pub sample_rate: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_played: Option<DateTime<Utc>>,
    pub play_count: i64,
}

impl Track {
    /// Title if tagged, otherwise the file name
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.filename)
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or("Unknown Artist")
    }
}

impl<'r> FromRow<'r, SqliteRow> for Track {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            filename: row.try_get("filename")?,
            filepath: row.try_get("filepath")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            album: row.try_get("album")?,
            genre: row.try_get("genre")?,
            year: row.try_get("year")?,
            duration: row.try_get("duration")?,
            file_size: row.try_get("file_size")?,
            format: row.try_get("format")?,
            bitrate: row.try_get("bitrate")?,
            sample_rate: row.try_get("sample_rate")?,
            created_at: row.try_get("created_at")?,
            last_played: row.try_get("last_played")?,
            play_count: row.try_get("play_count")?,
        })
    }
}

/// Track metadata as produced by the library importer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrack {
    pub filename: String,
    pub filepath: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
    pub file_size: Option<i64>,
    pub format: Option<String>,
    pub bitrate: Option<i64>,
    pub sample_rate: Option<i64>,
}

/// One play request in `queue_items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub track_id: i64,
    /// Ordering among unplayed entries (lower plays first)
    pub position: i64,
    pub requested_by: Option<String>,
    pub requested_at: DateTime<Utc>,
    /// Historical entry (already handed to the playback engine)
    pub played: bool,
}

impl<'r> FromRow<'r, SqliteRow> for QueueEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            track_id: row.try_get("track_id")?,
            position: row.try_get("position")?,
            requested_by: row.try_get("requested_by")?,
            requested_at: row.try_get("requested_at")?,
            played: row.try_get("played")?,
        })
    }
}

/// Queue entry joined with its track
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntryWithTrack {
    pub entry: QueueEntry,
    pub track: Track,
}

/// The single `bot_status` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub is_connected: bool,
    pub is_playing: bool,
    pub current_track_id: Option<i64>,
    /// 0.0-1.0
    pub volume: f32,
    /// Seconds into the current track
    pub position: f64,
    pub last_updated: DateTime<Utc>,
}

impl PlaybackStatus {
    /// Row contents used when nothing has been persisted yet
    pub fn with_volume(volume: f32) -> Self {
        Self {
            guild_id: None,
            channel_id: None,
            is_connected: false,
            is_playing: false,
            current_track_id: None,
            volume: volume.clamp(0.0, 1.0),
            position: 0.0,
            last_updated: Utc::now(),
        }
    }
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self::with_volume(0.5)
    }
}

impl<'r> FromRow<'r, SqliteRow> for PlaybackStatus {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let volume: f64 = row.try_get("volume")?;
        Ok(Self {
            guild_id: row.try_get("guild_id")?,
            channel_id: row.try_get("channel_id")?,
            is_connected: row.try_get("is_connected")?,
            is_playing: row.try_get("is_playing")?,
            current_track_id: row.try_get("current_track_id")?,
            volume: volume as f32,
            position: row.try_get("position")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}
