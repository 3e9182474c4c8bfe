//! Storage Layer - SQLite-backed persistence
//!
//! One table per registry entity, columns and constraints exactly as declared.
//! Every import drops and recreates the tables before loading.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, GtfsStore};
