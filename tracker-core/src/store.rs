//! The durable record store consumed by the query engine.
//!
//! [`Database`](crate::db::Database) is the SQLite implementation. Read
//! failures surface as [`Error::StorageRead`](crate::Error::StorageRead) and
//! write failures as [`Error::StorageWrite`](crate::Error::StorageWrite) so
//! the engine can decide whether its in-memory view is still valid.

use uuid::Uuid;

use crate::error::Result;
use crate::types::{Category, CompletionRecord, Tracker};

/// Create/read/update/delete access to trackers, categories and completions.
pub trait RecordStore {
    /// All trackers with their category titles, in no particular order.
    fn list_trackers(&self) -> Result<Vec<Tracker>>;

    fn get_tracker(&self, id: Uuid) -> Result<Option<Tracker>>;

    /// Insert a tracker, creating its category if absent.
    fn insert_tracker(&self, tracker: &Tracker) -> Result<()>;

    /// Overwrite every field of an existing tracker, creating its category if absent.
    fn update_tracker(&self, tracker: &Tracker) -> Result<()>;

    /// Delete a tracker and its completion records.
    ///
    /// Returns the number of completion records removed with it.
    fn delete_tracker(&self, id: Uuid) -> Result<usize>;

    /// All categories sorted by title, with member counts.
    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Get-or-create a category. Returns `true` if it was created.
    fn ensure_category(&self, title: &str) -> Result<bool>;

    /// Rename a category; member trackers follow it.
    fn rename_category(&self, old_title: &str, new_title: &str) -> Result<()>;

    /// Delete a category, moving its trackers to `fallback_title`.
    ///
    /// Returns the number of trackers reassigned.
    fn delete_category(&self, title: &str, fallback_title: &str) -> Result<usize>;

    fn list_completions(&self) -> Result<Vec<CompletionRecord>>;

    fn has_completion(&self, record: &CompletionRecord) -> Result<bool>;

    fn insert_completion(&self, record: &CompletionRecord) -> Result<()>;

    /// Returns `false` if no such record existed.
    fn delete_completion(&self, record: &CompletionRecord) -> Result<bool>;
}
