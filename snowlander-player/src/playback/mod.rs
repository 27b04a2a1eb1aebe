//! Playback engine, audio sessions and the handle used to drive them

pub mod decoder;
pub mod engine;
pub mod events;
pub mod handle;
pub mod session;
pub mod state;

pub use decoder::DecoderBackend;
pub use engine::{EngineSettings, PlaybackEngine};
pub use events::RequestOutcome;
pub use handle::PlayerHandle;
pub use session::{AudioBackend, AudioSession, SessionNotifier, SessionOutcome, SessionRequest};
pub use state::{PlaybackState, VoiceConnection};
