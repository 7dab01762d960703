//! Write-through SQLite sink: one row per record, one table per crane.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crane_traits::{FailurePolicy, Record, Sink, SinkError};
use rusqlite::{Connection, params};

use crate::error::{Result, SinkFailure};

pub fn table_name(crane_id: u32) -> String {
    format!("crane{crane_id}")
}

pub struct DatabaseSink {
    conn: Option<Connection>,
    path: PathBuf,
    /// Tables already created in this session.
    tables: HashSet<u32>,
}

impl DatabaseSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::warn!(error = %err, "could not enable WAL mode");
        }
        tracing::info!(path = %path.display(), "database opened");
        Ok(Self {
            conn: Some(conn),
            path,
            tables: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(SinkFailure::Closed)
    }

    fn ensure_table(&mut self, crane_id: u32) -> Result<()> {
        if self.tables.contains(&crane_id) {
            return Ok(());
        }
        self.conn()?.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                time TEXT NOT NULL,
                raw_adc INTEGER NOT NULL,
                average_mass REAL NOT NULL,
                instant_mass REAL NOT NULL,
                x INTEGER NOT NULL,
                y INTEGER NOT NULL
            )",
            table_name(crane_id)
        ))?;
        self.tables.insert(crane_id);
        Ok(())
    }

    pub fn insert(&mut self, record: &Record) -> Result<()> {
        self.ensure_table(record.crane_id)?;
        self.conn()?.execute(
            &format!(
                "INSERT INTO {} (time, raw_adc, average_mass, instant_mass, x, y)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                table_name(record.crane_id)
            ),
            params![
                record.iso_time(),
                record.raw_adc,
                record.average_mass,
                record.instant_mass,
                record.x,
                record.y,
            ],
        )?;
        Ok(())
    }

    /// Rows stored for a crane; 0 when its table does not exist yet.
    pub fn row_count(&self, crane_id: u32) -> Result<u64> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table_name(crane_id)],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(0);
        }
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_name(crane_id)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

impl Sink for DatabaseSink {
    fn persist(&mut self, record: &Record) -> std::result::Result<(), SinkError> {
        Ok(self.insert(record)?)
    }

    fn close(&mut self) -> std::result::Result<(), SinkError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| SinkFailure::from(e))?;
            tracing::debug!(path = %self.path.display(), "database closed");
        }
        Ok(())
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::LogAndContinue
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
