//! # tracker-core
//!
//! Core library for tracker - a habit tracker.
//!
//! This library provides:
//! - Domain types for trackers, categories and completion records
//! - Database storage layer with SQLite
//! - A query engine producing the filtered, grouped tracker list
//! - Completion statistics
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Every mutation flows in one direction:
//! - **Store:** the write goes to a [`RecordStore`] (SQLite by default)
//! - **Query:** the engine re-reads the store and rebuilds the grouped view
//! - **Observers:** subscribers receive a section/row diff or a full reload
//!
//! ## Example
//!
//! ```rust,no_run
//! use tracker_core::{Config, Database, EngineSettings, TrackerQueryEngine};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let engine = TrackerQueryEngine::new(db, EngineSettings::from(&config))
//!     .expect("failed to load trackers");
//! println!("{} sections", engine.number_of_sections());
//! ```

// Re-export commonly used items at the crate root
pub use analytics::StatisticsSummary;
pub use config::Config;
pub use db::Database;
pub use error::{ConstraintViolation, Error, Result};
pub use query::{
    CompletionFilter, EngineSettings, GroupedDiff, GroupedView, QueryEvent, RefreshPolicy,
    TrackerObserver, TrackerQueryEngine,
};
pub use store::RecordStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod store;
pub mod types;
