//! SQLite Database
//!
//! Embedded store for planning records using rusqlite with r2d2 connection
//! pooling. Records are scoped by project path: every read and delete takes
//! the project it belongs to.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::debug;

use crate::models::plan::GeneratedPlan;
use crate::models::record::{PlanningRecord, RecordStatus};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::database_path;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Save/list/read/delete over a project-scoped record store
pub trait PlanningRecordStore: Send + Sync {
    /// Insert or replace a record
    fn save(&self, record: &PlanningRecord) -> AppResult<()>;

    /// Records of a project, newest first
    fn list(&self, project_path: &str) -> AppResult<Vec<PlanningRecord>>;

    fn read(&self, project_path: &str, id: &str) -> AppResult<Option<PlanningRecord>>;

    /// Returns whether a record was removed
    fn delete(&self, project_path: &str, id: &str) -> AppResult<bool>;
}

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create an in-memory database.
    ///
    /// A single pooled connection keeps every caller on the same in-memory
    /// database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the default database file (~/.plan-pilot/records.db)
    pub fn new() -> AppResult<Self> {
        Self::open(database_path()?)
    }

    /// Open a database file, creating it and its parent directory if needed
    pub fn open(db_path: impl AsRef<std::path::Path>) -> AppResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        debug!(path = %db_path.display(), "Opened record database");
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS planning_records (
                id TEXT PRIMARY KEY,
                project_path TEXT NOT NULL,
                title TEXT NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                plan_json TEXT,
                status TEXT NOT NULL DEFAULT 'draft',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_planning_records_project
             ON planning_records(project_path, updated_at)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }
}

/// Raw record row from the database
struct RecordRow {
    id: String,
    project_path: String,
    title: String,
    prompt: String,
    response: String,
    plan_json: Option<String>,
    status: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_path: row.get(1)?,
            title: row.get(2)?,
            prompt: row.get(3)?,
            response: row.get(4)?,
            plan_json: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_record(self) -> AppResult<PlanningRecord> {
        let plan = match self.plan_json {
            Some(json) => Some(serde_json::from_str::<GeneratedPlan>(&json)?),
            None => None,
        };
        Ok(PlanningRecord {
            id: self.id,
            project_path: self.project_path,
            title: self.title,
            prompt: self.prompt,
            response: self.response,
            plan,
            status: RecordStatus::parse(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const RECORD_COLUMNS: &str =
    "id, project_path, title, prompt, response, plan_json, status, created_at, updated_at";

impl PlanningRecordStore for Database {
    fn save(&self, record: &PlanningRecord) -> AppResult<()> {
        let conn = self.get_connection()?;
        let plan_json = record
            .plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO planning_records (id, project_path, title, prompt, response, plan_json, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(id) DO UPDATE SET
                project_path = ?2, title = ?3, prompt = ?4, response = ?5,
                plan_json = ?6, status = ?7, updated_at = ?8",
            params![
                record.id,
                record.project_path,
                record.title,
                record.prompt,
                record.response,
                plan_json,
                record.status.as_str(),
                now
            ],
        )?;
        debug!(record_id = %record.id, status = %record.status, "Saved planning record");
        Ok(())
    }

    fn list(&self, project_path: &str) -> AppResult<Vec<PlanningRecord>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM planning_records WHERE project_path = ?1
             ORDER BY updated_at DESC, rowid DESC",
            RECORD_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![project_path], RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    fn read(&self, project_path: &str, id: &str) -> AppResult<Option<PlanningRecord>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM planning_records WHERE project_path = ?1 AND id = ?2",
                RECORD_COLUMNS
            ),
            params![project_path, id],
            RecordRow::from_row,
        );

        match result {
            Ok(row) => Ok(Some(row.into_record()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    fn delete(&self, project_path: &str, id: &str) -> AppResult<bool> {
        let conn = self.get_connection()?;
        let removed = conn.execute(
            "DELETE FROM planning_records WHERE project_path = ?1 AND id = ?2",
            params![project_path, id],
        )?;
        Ok(removed > 0)
    }
}
