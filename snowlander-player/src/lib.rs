//! # SNOWLANDER Player Library (snowlander-player)
//!
//! Queue and playback coordination core for the SNOWLANDER music bot.
//!
//! **Purpose:** Keep the ordered play queue, drive one external decoder
//! session at a time, maintain the authoritative playback status, and push
//! every change to connected observers.
//!
//! **Architecture:** A single engine task owns playback state; the chat bot
//! and HTTP layer talk to it through [`PlayerHandle`]. State changes fan
//! out over per-subscriber channels, served to web clients as SSE.

pub mod api;
pub mod db;
pub mod error;
pub mod playback;
pub mod sse;
pub mod status;

pub use error::{Error, Result};
pub use playback::{PlaybackEngine, PlayerHandle};
pub use status::{StatusAggregator, StatusUpdate};
