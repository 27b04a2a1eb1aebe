//! Playback state machine states

use serde::{Deserialize, Serialize};

/// Engine state
///
/// `Idle` has no audio session. `Playing` and `Paused` both hold one; the
/// current track is kept across pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn has_session(self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Voice channel the audio sink is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConnection {
    pub guild_id: String,
    pub channel_id: String,
}
