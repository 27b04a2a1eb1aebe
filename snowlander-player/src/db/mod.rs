//! Database access layer
//!
//! Repository-style queries for the catalog, the play queue and the status
//! row. Joins are explicit in the queries that need them.

pub mod queue;
pub mod status;
pub mod tracks;
