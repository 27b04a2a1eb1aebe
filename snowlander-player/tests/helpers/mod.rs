//! Test helper modules for snowlander-player integration tests
//!
//! - FakeBackend: in-process audio backend that records sessions and lets
//!   the test finish them
//! - TestPlayer: engine over an in-memory database with seeded tracks

#![allow(dead_code)]

pub mod fake_backend;
pub mod test_player;

pub use fake_backend::{FakeBackend, FakeSession};
pub use test_player::TestPlayer;
