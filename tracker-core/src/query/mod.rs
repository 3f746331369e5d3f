//! Query layer for the tracker list
//!
//! Turns the stored trackers into the visible, grouped list:
//! - Filtering by weekday, search text and completion state
//! - Grouping into category sections in a stable order
//! - Section/row diffs between consecutive views
//! - Observer notification of changes

pub mod diff;
pub mod engine;
pub mod filter;
pub mod observer;

pub use diff::{GroupedDiff, GroupedView, Section};
pub use engine::{EngineSettings, RefreshPolicy, TrackerQueryEngine};
pub use filter::{fold, CompletionFilter, TrackerFilter};
pub use observer::{EventLog, ObserverId, QueryEvent, TrackerObserver};
