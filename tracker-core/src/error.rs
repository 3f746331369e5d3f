//! Error types for tracker-core

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the tracker-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or migrating the database failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store could not be queried; the last good view is kept
    #[error("storage read failed: {0}")]
    StorageRead(#[source] rusqlite::Error),

    /// A mutation could not be persisted
    #[error("storage write failed: {0}")]
    StorageWrite(#[source] rusqlite::Error),

    /// Request rejected before it reached storage
    #[error("constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Tracker not found
    #[error("tracker not found: {0}")]
    TrackerNotFound(Uuid),

    /// Category not found
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    /// A stored weekday mask had bits outside the seven weekdays
    #[error("invalid weekday mask: {0:#x}")]
    InvalidMask(i64),
}

/// Validation failures raised by the engine before touching the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error("tracker {tracker_id} is already completed on {day}")]
    DuplicateCompletion { tracker_id: Uuid, day: NaiveDate },

    #[error("cannot complete a tracker on {day}, a future date (today is {today})")]
    FutureCompletion { day: NaiveDate, today: NaiveDate },

    #[error("tracker name must not be empty")]
    EmptyName,

    #[error("category title must not be empty")]
    EmptyCategoryTitle,

    #[error("category already exists: {0}")]
    DuplicateCategory(String),

    /// The fallback category cannot be removed while trackers still use it.
    #[error("category {0:?} still holds trackers and cannot be deleted")]
    SentinelCategoryInUse(String),
}

impl Error {
    /// True for failures caused by the store rather than by the request.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageRead(_) | Error::StorageWrite(_) | Error::Database(_)
        )
    }
}

/// Result type alias for tracker-core
pub type Result<T> = std::result::Result<T, Error>;
