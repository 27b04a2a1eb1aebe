//! # SNOWLANDER Common Library
//!
//! Shared code for the SNOWLANDER playback coordinator:
//! - Database records and schema initialisation
//! - Event envelope and external view types
//! - Configuration loading
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
