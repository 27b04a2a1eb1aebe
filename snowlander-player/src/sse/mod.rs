//! Event fan-out to connected observers

pub mod broadcaster;

pub use broadcaster::{BroadcastReport, EventFanout, SubscriberId, Subscription};
