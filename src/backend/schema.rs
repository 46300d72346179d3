//! SQLite DDL for the server-resident store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Version stamped into `schema_meta` on a fresh database.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL. Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id         TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    title      TEXT NOT NULL,
    completed  INTEGER NOT NULL DEFAULT 0,
    revision   INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,   -- epoch millis
    updated_at INTEGER NOT NULL    -- epoch millis
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id, created_at);

-- Exactly one row per owner.
CREATE TABLE IF NOT EXISTS progress_records (
    owner_id              TEXT PRIMARY KEY,
    completed_tasks       INTEGER NOT NULL DEFAULT 0,
    total_tasks           INTEGER NOT NULL DEFAULT 0,
    all_time_completed    INTEGER NOT NULL DEFAULT 0,
    mood                  TEXT NOT NULL,
    daily_completed_tasks INTEGER NOT NULL DEFAULT 0,
    daily_mood_checks     INTEGER NOT NULL DEFAULT 0,
    daily_ai_splits       INTEGER NOT NULL DEFAULT 0,
    last_reset_date       INTEGER NOT NULL,   -- epoch millis
    version               INTEGER NOT NULL DEFAULT 0,
    updated_at            INTEGER NOT NULL    -- epoch millis
);
"#;

/// Apply the full schema and seed the version row if missing.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the schema version, or `None` if it was never stamped.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}
