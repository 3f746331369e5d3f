//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::*;
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn format_day(day: NaiveDate) -> String {
        day.format(DAY_FORMAT).to_string()
    }

    fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
    }

    // ============================================
    // Tracker operations
    // ============================================

    fn row_to_tracker(row: &Row) -> rusqlite::Result<Tracker> {
        let id_str: String = row.get("id")?;
        let color_hex: String = row.get("color_hex")?;
        let mask: i64 = row.get("schedule_mask")?;

        let id = Uuid::parse_str(&id_str).map_err(|e| Self::conversion_error(0, e))?;
        let color = Color::from_hex(&color_hex).unwrap_or_else(|| {
            tracing::warn!(
                tracker_id = %id,
                color_hex = %color_hex,
                "Invalid stored color, using black"
            );
            Color::BLACK
        });
        let schedule = WeekdayMask::from_bits(mask).map_err(|e| Self::conversion_error(4, e))?;

        Ok(Tracker {
            id,
            name: row.get("name")?,
            emoji: row.get("emoji")?,
            color,
            schedule,
            category: row.get("category_title")?,
        })
    }

    fn insert_category_if_missing(conn: &Connection, title: &str) -> rusqlite::Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO categories (title, created_at) VALUES (?1, ?2)",
            params![title, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// Count of stored trackers (for diagnostics).
    pub fn count_trackers(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM trackers", [], |r| r.get(0))
            .map_err(Error::StorageRead)
    }

    // ============================================
    // Completion operations
    // ============================================

    fn row_to_completion(row: &Row) -> rusqlite::Result<CompletionRecord> {
        let id_str: String = row.get("tracker_id")?;
        let day_str: String = row.get("day")?;

        Ok(CompletionRecord {
            tracker_id: Uuid::parse_str(&id_str).map_err(|e| Self::conversion_error(0, e))?,
            day: NaiveDate::parse_from_str(&day_str, DAY_FORMAT)
                .map_err(|e| Self::conversion_error(1, e))?,
        })
    }

    /// Completion records for one tracker, oldest first.
    pub fn completions_for(&self, tracker_id: Uuid) -> Result<Vec<CompletionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT tracker_id, day FROM completions WHERE tracker_id = ? ORDER BY day")
            .map_err(Error::StorageRead)?;
        let records = stmt
            .query_map([tracker_id.to_string()], Self::row_to_completion)
            .map_err(Error::StorageRead)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::StorageRead)?;
        Ok(records)
    }
}

impl RecordStore for Database {
    fn list_trackers(&self) -> Result<Vec<Tracker>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, name, emoji, color_hex, schedule_mask, category_title
                FROM trackers
                ORDER BY category_title, name, id
                "#,
            )
            .map_err(Error::StorageRead)?;

        let trackers = stmt
            .query_map([], Self::row_to_tracker)
            .map_err(Error::StorageRead)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::StorageRead)?;
        Ok(trackers)
    }

    fn get_tracker(&self, id: Uuid) -> Result<Option<Tracker>> {
        let conn = self.conn();
        conn.query_row(
            r#"
            SELECT id, name, emoji, color_hex, schedule_mask, category_title
            FROM trackers WHERE id = ?
            "#,
            [id.to_string()],
            Self::row_to_tracker,
        )
        .optional()
        .map_err(Error::StorageRead)
    }

    fn insert_tracker(&self, tracker: &Tracker) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::StorageWrite)?;

        Self::insert_category_if_missing(&tx, &tracker.category).map_err(Error::StorageWrite)?;
        tx.execute(
            r#"
            INSERT INTO trackers (id, name, emoji, color_hex, schedule_mask, category_title, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                tracker.id.to_string(),
                tracker.name,
                tracker.emoji,
                tracker.color.to_hex(),
                tracker.schedule.bits(),
                tracker.category,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(Error::StorageWrite)?;

        tx.commit().map_err(Error::StorageWrite)
    }

    fn update_tracker(&self, tracker: &Tracker) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::StorageWrite)?;

        Self::insert_category_if_missing(&tx, &tracker.category).map_err(Error::StorageWrite)?;
        let updated = tx
            .execute(
                r#"
                UPDATE trackers
                SET name = ?2, emoji = ?3, color_hex = ?4, schedule_mask = ?5, category_title = ?6
                WHERE id = ?1
                "#,
                params![
                    tracker.id.to_string(),
                    tracker.name,
                    tracker.emoji,
                    tracker.color.to_hex(),
                    tracker.schedule.bits(),
                    tracker.category,
                ],
            )
            .map_err(Error::StorageWrite)?;

        if updated == 0 {
            return Err(Error::TrackerNotFound(tracker.id));
        }
        tx.commit().map_err(Error::StorageWrite)
    }

    fn delete_tracker(&self, id: Uuid) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::StorageWrite)?;

        let removed_completions = tx
            .execute("DELETE FROM completions WHERE tracker_id = ?", [id.to_string()])
            .map_err(Error::StorageWrite)?;
        let removed = tx
            .execute("DELETE FROM trackers WHERE id = ?", [id.to_string()])
            .map_err(Error::StorageWrite)?;

        if removed == 0 {
            return Err(Error::TrackerNotFound(id));
        }
        tx.commit().map_err(Error::StorageWrite)?;
        Ok(removed_completions)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT c.title, COUNT(t.id) AS tracker_count
                FROM categories c
                LEFT JOIN trackers t ON t.category_title = c.title
                GROUP BY c.title
                ORDER BY c.title
                "#,
            )
            .map_err(Error::StorageRead)?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    title: row.get("title")?,
                    tracker_count: row.get("tracker_count")?,
                })
            })
            .map_err(Error::StorageRead)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::StorageRead)?;
        Ok(categories)
    }

    fn ensure_category(&self, title: &str) -> Result<bool> {
        let conn = self.conn();
        Self::insert_category_if_missing(&conn, title).map_err(Error::StorageWrite)
    }

    fn rename_category(&self, old_title: &str, new_title: &str) -> Result<()> {
        let conn = self.conn();
        // trackers.category_title follows via ON UPDATE CASCADE
        let updated = conn
            .execute(
                "UPDATE categories SET title = ?2 WHERE title = ?1",
                params![old_title, new_title],
            )
            .map_err(Error::StorageWrite)?;

        if updated == 0 {
            return Err(Error::CategoryNotFound(old_title.to_string()));
        }
        Ok(())
    }

    fn delete_category(&self, title: &str, fallback_title: &str) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::StorageWrite)?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE title = ?)",
                [title],
                |r| r.get(0),
            )
            .map_err(Error::StorageRead)?;
        if !exists {
            return Err(Error::CategoryNotFound(title.to_string()));
        }

        let mut reassigned = 0;
        if title != fallback_title {
            Self::insert_category_if_missing(&tx, fallback_title).map_err(Error::StorageWrite)?;
            reassigned = tx
                .execute(
                    "UPDATE trackers SET category_title = ?2 WHERE category_title = ?1",
                    params![title, fallback_title],
                )
                .map_err(Error::StorageWrite)?;
        }

        tx.execute("DELETE FROM categories WHERE title = ?", [title])
            .map_err(Error::StorageWrite)?;
        tx.commit().map_err(Error::StorageWrite)?;
        Ok(reassigned)
    }

    fn list_completions(&self) -> Result<Vec<CompletionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT tracker_id, day FROM completions ORDER BY day, tracker_id")
            .map_err(Error::StorageRead)?;
        let records = stmt
            .query_map([], Self::row_to_completion)
            .map_err(Error::StorageRead)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::StorageRead)?;
        Ok(records)
    }

    fn has_completion(&self, record: &CompletionRecord) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM completions WHERE tracker_id = ?1 AND day = ?2)",
            params![record.tracker_id.to_string(), Self::format_day(record.day)],
            |r| r.get(0),
        )
        .map_err(Error::StorageRead)
    }

    fn insert_completion(&self, record: &CompletionRecord) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO completions (tracker_id, day, created_at) VALUES (?1, ?2, ?3)",
            params![
                record.tracker_id.to_string(),
                Self::format_day(record.day),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(Error::StorageWrite)?;
        Ok(())
    }

    fn delete_completion(&self, record: &CompletionRecord) -> Result<bool> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM completions WHERE tracker_id = ?1 AND day = ?2",
                params![record.tracker_id.to_string(), Self::format_day(record.day)],
            )
            .map_err(Error::StorageWrite)?;
        Ok(removed > 0)
    }
}
