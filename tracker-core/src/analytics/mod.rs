//! Analytics module for the tracker
//!
//! Provides aggregate statistics over completion records:
//! - Best streak across all trackers
//! - Ideal days (every known tracker completed)
//! - Total completions and average per active day
//! - Per-tracker completion counts and the current streak

pub mod statistics;

pub use statistics::{compute_statistics, completion_counts, current_streak, StatisticsSummary};
