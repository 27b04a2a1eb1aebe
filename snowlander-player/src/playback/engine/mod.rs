//! Playback engine actor
//!
//! - `core.rs`: engine struct, mailbox loop, command dispatch, position tick
//! - `playback.rs`: session control (play, pause, resume, stop, skip,
//!   volume, connection)
//! - `queue.rs`: queue mutations and auto-advance on completion

mod core;
mod playback;
mod queue;

pub use self::core::{EngineSettings, PlaybackEngine};
