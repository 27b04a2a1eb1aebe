//! Error types for snowlander-player
//!
//! The variants follow the coordinator's failure taxonomy: lookups that miss
//! (`NotFound`, `TrackNotFound`), operations rejected in the current state
//! (`InvalidState`), playback without a connection (`NotConnected`), and
//! failures of the decoder process or persistence (`ExternalFailure`,
//! `Database`, `Io`). None of them are fatal to the engine.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog or queue lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Track id not present in the catalog
    #[error("Track not found: {0}")]
    TrackNotFound(i64),

    /// Operation not valid in the current playback state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Playback requested without an active audio connection
    #[error("Not connected to a voice channel")]
    NotConnected,

    /// Decoder spawn/stream failure
    #[error("External failure: {0}")]
    ExternalFailure(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library (config, schema setup)
    #[error(transparent)]
    Common(#[from] snowlander_common::Error),

    /// The engine task is gone (shut down or panicked)
    #[error("Playback engine unavailable")]
    EngineUnavailable,
}

impl Error {
    /// Lookup misses, which callers report as a normal user message
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::TrackNotFound(_))
    }

    /// Failures outside the core: decoder process, persistence, I/O
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::ExternalFailure(_) | Error::Database(_) | Error::Io(_) | Error::Common(_)
        )
    }
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;
