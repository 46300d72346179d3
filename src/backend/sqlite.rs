//! Server-resident store backed by a single SQLite database file.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use super::schema::{apply_schema, read_schema_version};
use super::{Backend, BackendError, TaskWrite};
use crate::milestone::Mood;
use crate::progress::ProgressRecord;
use crate::task::{OwnerId, Task, TaskId};

const TASK_COLUMNS: &str = "id, owner_id, title, completed, revision, created_at, updated_at";

const PROGRESS_COLUMNS: &str = "owner_id, completed_tasks, total_tasks, all_time_completed, mood, \
     daily_completed_tasks, daily_mood_checks, daily_ai_splits, last_reset_date, version, updated_at";

/// SQLite-backed store.
///
/// Thread-safe via an internal `Mutex<Connection>`; every call is serialized.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    online: AtomicBool,
}

impl SqliteBackend {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn new(path: &Path) -> Result<Self, BackendError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackendError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            conn: Mutex::new(conn),
            online: AtomicBool::new(true),
        })
    }

    /// A throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            online: AtomicBool::new(true),
        })
    }

    pub fn schema_version(&self) -> Result<Option<u32>, BackendError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Simulate losing (or regaining) the connection to the server.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, BackendError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("remote store unreachable".to_owned()));
        }
        self.conn
            .lock()
            .map_err(|e| BackendError::Lock(e.to_string()))
    }
}

impl Backend for SqliteBackend {
    fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![owner.as_str()], row_to_task)?;

        let mut tasks = Vec::new();
        for r in rows {
            tasks.push(r?);
        }
        Ok(tasks)
    }

    fn get_task(&self, owner: &OwnerId, id: &TaskId) -> Result<Option<Task>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 AND id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![owner.as_str(), id.as_str()], row_to_task)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn replace_tasks(&self, owner: &OwnerId, tasks: &[Task]) -> Result<(), BackendError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tasks WHERE owner_id = ?1", params![owner.as_str()])?;
        for task in tasks {
            put_task(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_progress(&self, owner: &OwnerId) -> Result<Option<ProgressRecord>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE owner_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![owner.as_str()], row_to_progress)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn save_progress(&self, record: &ProgressRecord) -> Result<(), BackendError> {
        let conn = self.lock()?;
        upsert_progress(&conn, record)?;
        Ok(())
    }

    fn commit(&self, write: TaskWrite<'_>, record: &ProgressRecord) -> Result<(), BackendError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        match write {
            TaskWrite::Put(task) => put_task(&tx, task)?,
            TaskWrite::Remove(owner, id) => {
                tx.execute(
                    "DELETE FROM tasks WHERE owner_id = ?1 AND id = ?2",
                    params![owner.as_str(), id.as_str()],
                )?;
            }
        }
        upsert_progress(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn purge_owner(&self, owner: &OwnerId) -> Result<(), BackendError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tasks WHERE owner_id = ?1", params![owner.as_str()])?;
        tx.execute(
            "DELETE FROM progress_records WHERE owner_id = ?1",
            params![owner.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statement helpers
// ---------------------------------------------------------------------------

fn put_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT OR REPLACE INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            task.id.as_str(),
            task.owner_id.as_str(),
            task.title,
            task.completed,
            to_sql_int(task.revision),
            task.created_at.timestamp_millis(),
            task.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn upsert_progress(conn: &Connection, r: &ProgressRecord) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO progress_records ({PROGRESS_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            r.owner_id.as_str(),
            to_sql_int(r.completed_tasks),
            to_sql_int(r.total_tasks),
            to_sql_int(r.all_time_completed),
            r.mood.as_str(),
            to_sql_int(r.daily_completed_tasks),
            to_sql_int(r.daily_mood_checks),
            to_sql_int(r.daily_ai_splits),
            r.last_reset_date.timestamp_millis(),
            to_sql_int(r.version),
            r.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    Ok(Task {
        id: TaskId::new(id),
        owner_id: OwnerId::new(owner),
        title: row.get(2)?,
        completed: row.get(3)?,
        revision: from_sql_int(row.get(4)?),
        created_at: millis_at(row, 5)?,
        updated_at: millis_at(row, 6)?,
    })
}

fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let owner: String = row.get(0)?;
    let mood: String = row.get(4)?;
    let mood = Mood::parse(&mood).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ProgressRecord {
        owner_id: OwnerId::new(owner),
        completed_tasks: from_sql_int(row.get(1)?),
        total_tasks: from_sql_int(row.get(2)?),
        all_time_completed: from_sql_int(row.get(3)?),
        mood,
        daily_completed_tasks: from_sql_int(row.get(5)?),
        daily_mood_checks: from_sql_int(row.get(6)?),
        daily_ai_splits: from_sql_int(row.get(7)?),
        last_reset_date: millis_at(row, 8)?,
        version: from_sql_int(row.get(9)?),
        updated_at: millis_at(row, 10)?,
    })
}

fn millis_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn to_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn from_sql_int(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
