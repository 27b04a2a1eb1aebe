//! Engine mailbox messages
//!
//! Commands from the handle, session completions from the audio backend
//! and connection loss from the voice layer all arrive on one channel, so
//! the engine handles them strictly one at a time.

use super::session::SessionOutcome;
use crate::error::Result;
use snowlander_common::db::{QueueEntry, Track};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// What `request` did with the matched track
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Nothing was playing, so the track started immediately
    Started(Track),
    /// Something was playing, so the track was appended to the queue
    Queued { track: Track, entry: QueueEntry },
}

impl RequestOutcome {
    pub fn track(&self) -> &Track {
        match self {
            RequestOutcome::Started(track) => track,
            RequestOutcome::Queued { track, .. } => track,
        }
    }
}

#[derive(Debug)]
pub(crate) enum EngineCommand {
    PlayTrack {
        track: Track,
        reply: Reply<()>,
    },
    Request {
        term: String,
        requested_by: Option<String>,
        reply: Reply<RequestOutcome>,
    },
    Enqueue {
        track_id: i64,
        requested_by: Option<String>,
        reply: Reply<QueueEntry>,
    },
    RemoveFromQueue {
        entry_id: i64,
        reply: Reply<bool>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    Skip {
        reply: Reply<()>,
    },
    SetVolume {
        volume: f32,
        reply: Reply<f32>,
    },
    Connect {
        guild_id: String,
        channel_id: String,
        reply: Reply<()>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug)]
pub(crate) enum EngineMessage {
    Command(EngineCommand),
    SessionFinished {
        session_id: u64,
        outcome: SessionOutcome,
    },
    /// The voice layer dropped the connection
    ConnectionLost,
}
