//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: categories, trackers, completions
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        title            TEXT PRIMARY KEY,
        created_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS trackers (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        emoji            TEXT NOT NULL,
        color_hex        TEXT NOT NULL,

        -- Weekday bitmask: bit (ordinal - 1), Sunday = 1 .. Saturday = 7
        schedule_mask    INTEGER NOT NULL CHECK (schedule_mask BETWEEN 0 AND 127),

        category_title   TEXT NOT NULL
                         REFERENCES categories(title) ON UPDATE CASCADE,
        created_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS completions (
        tracker_id       TEXT NOT NULL REFERENCES trackers(id) ON DELETE CASCADE,
        day              TEXT NOT NULL,
        created_at       DATETIME NOT NULL,

        PRIMARY KEY (tracker_id, day)
    );

    CREATE INDEX IF NOT EXISTS idx_trackers_category ON trackers(category_title);
    "#,
    // Version 2: day-ordered scans for statistics
    r#"
    CREATE INDEX IF NOT EXISTS idx_completions_day ON completions(day);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
