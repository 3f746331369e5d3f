//! Database layer for the tracker
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - A [`RecordStore`](crate::store::RecordStore) implementation for
//!   trackers, categories and completion records

pub mod repo;
pub mod schema;

pub use repo::Database;
