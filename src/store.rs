use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::models::{ApplicationStatus, StatusEntry, StatusMap};

/// Storage key holding the whole status map as one JSON object.
pub const STATUS_KEY: &str = "job-applications";

/// Synchronous key/value persistence. Implementations may be shared with other processes,
/// so callers must not cache what they read.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub struct SqliteStorage {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open status database {}", path.display()))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn default_path() -> PathBuf {
        // XDG data directory, or the working directory when there is no home
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobboard") {
            proj_dirs.data_dir().join("jobboard.db")
        } else {
            PathBuf::from("jobboard.db")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to read from status database")
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .context("Failed to write to status database")?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .context("Failed to delete from status database")?;
        Ok(())
    }
}

/// Process-local storage for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The selection was empty; nothing was written.
    NothingSelected,
    Applied { attempted: usize, applied: usize },
}

/// Application status per job, persisted under [`STATUS_KEY`].
pub struct StatusStore<S: Storage> {
    storage: S,
}

impl<S: Storage> StatusStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Always re-reads storage. Unreadable data, or anything that is not a JSON object,
    /// reads as an empty map. Single entries that cannot be decoded are skipped.
    pub fn get_all(&self) -> StatusMap {
        let raw = match self.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "status store unreadable, treating as empty");
                return StatusMap::new();
            }
        };
        raw.into_iter()
            .filter_map(|(id, value)| match decode_entry(&value) {
                Some(entry) => Some((id, entry)),
                None => {
                    tracing::warn!(%id, "skipping unreadable status entry");
                    None
                }
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<StatusEntry> {
        self.get_all().remove(id.trim())
    }

    /// Rewrites one entry. Every other stored entry is written back as read, including
    /// ones this version cannot decode.
    pub fn set_status(&self, id: &str, status: ApplicationStatus) -> Result<()> {
        let id = id.trim();
        let mut raw = self.read_raw()?;
        let entry = StatusEntry {
            status,
            date: Utc::now(),
        };
        raw.insert(
            id.to_string(),
            serde_json::to_value(&entry).context("Failed to serialize status entry")?,
        );
        self.write(raw)?;
        tracing::debug!(id, %status, "status set");
        Ok(())
    }

    pub fn clear_status(&self, id: &str) -> Result<()> {
        let id = id.trim();
        let mut raw = self.read_raw()?;
        if raw.remove(id).is_some() {
            self.write(raw)?;
            tracing::debug!(id, "status cleared");
        }
        Ok(())
    }

    /// Applies each pair through [`Self::set_status`]. Pairs without an identifier are skipped.
    pub fn apply_batch(&self, pending: &BTreeMap<String, ApplicationStatus>) -> Result<BatchOutcome> {
        if pending.is_empty() {
            return Ok(BatchOutcome::NothingSelected);
        }

        let mut applied = 0;
        for (id, status) in pending {
            let id = id.trim();
            if id.is_empty() {
                tracing::debug!("skipping batch entry without identifier");
                continue;
            }
            self.set_status(id, *status)?;
            applied += 1;
        }

        tracing::info!(attempted = pending.len(), applied, "batch status update");
        Ok(BatchOutcome::Applied {
            attempted: pending.len(),
            applied,
        })
    }

    /// Storage errors propagate so a failed read never turns into an overwrite.
    fn read_raw(&self) -> Result<serde_json::Map<String, Value>> {
        let Some(raw) = self.storage.get(STATUS_KEY)? else {
            return Ok(serde_json::Map::new());
        };
        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                tracing::warn!("status store is not a JSON object, treating as empty");
                Ok(serde_json::Map::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "status store is malformed, treating as empty");
                Ok(serde_json::Map::new())
            }
        }
    }

    fn write(&self, raw: serde_json::Map<String, Value>) -> Result<()> {
        let raw = serde_json::to_string(&Value::Object(raw))
            .context("Failed to serialize status map")?;
        self.storage.set(STATUS_KEY, &raw)
    }
}

/// Unknown statuses make an entry unreadable. A missing or odd date does not.
fn decode_entry(value: &Value) -> Option<StatusEntry> {
    let status = ApplicationStatus::parse(value.get("status")?.as_str()?)?;
    let date = value
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_date)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Some(StatusEntry { status, date })
}

/// RFC 3339, a naive timestamp, or a bare date, all taken as UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
