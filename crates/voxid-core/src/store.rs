//! Durable speaker profile storage
//!
//! SQLite-backed. The store value is just a database path; every
//! operation opens its own connection and closes it on drop, so a store
//! can be cloned into any worker thread without shared handles.

use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use voxid_types::{SpeakerRecord, SpeakerSummary};

#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// A store at `path`. Nothing touches the filesystem until an
    /// operation runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Create the schema if it does not exist. Idempotent; existing rows
    /// are never dropped or rewritten.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS speakers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                profile_data BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        tracing::debug!("Profile store ready at {:?}", self.path);
        Ok(())
    }

    /// Insert one record and return its id. Duplicate names are allowed;
    /// the id is the only identity.
    pub fn insert(&self, name: &str, profile_data: &[u8]) -> Result<i64> {
        let conn = self.connect()?;
        let created_at = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO speakers (name, profile_data, created_at) VALUES (?1, ?2, ?3)",
            params![name, profile_data, created_at],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Stored profile for '{}' as record {}", name, id);
        Ok(id)
    }

    /// Every record with its profile bytes, in insertion order.
    pub fn list_all(&self) -> Result<Vec<SpeakerRecord>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, name, profile_data, created_at FROM speakers ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(SpeakerRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                profile_data: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Name and timestamp of every record, in insertion order.
    pub fn list_summaries(&self) -> Result<Vec<SpeakerSummary>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM speakers ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(SpeakerSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Delete every record with this name; returns how many were
    /// removed. A missing name is a no-op returning 0.
    pub fn delete_by_name(&self, name: &str) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM speakers WHERE name = ?1", params![name])?;
        tracing::info!("Deleted {} record(s) for '{}'", removed, name);
        Ok(removed)
    }
}
