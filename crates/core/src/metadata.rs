//! SQLite-backed metadata store.
//!
//! One table holds every record:
//!
//! ```sql
//! images(id TEXT PRIMARY KEY, name TEXT NOT NULL UNIQUE, path TEXT NOT NULL UNIQUE, original_name TEXT NOT NULL)
//! ```
//!
//! The `UNIQUE(name)` constraint is the only authority on name uniqueness. [`MetadataStore::name_exists`]
//! is a fast path for callers and never a guarantee. `UNIQUE(path)` covers distinct names that
//! map onto the same file, such as `cat` + `.png` and `cat.png` with no extension.
//!
//! Each operation opens its own connection, so concurrent callers do not queue behind one shared
//! handle. The database runs in WAL mode, letting readers proceed while a writer holds the
//! write lock, and every connection waits up to the configured busy timeout for that lock.
//!
//! Writes that must stay consistent with the storage directory take a closure. The closure runs
//! inside the write transaction, after the row change has been applied but before the commit,
//! so a failing side effect rolls the row change back.

use crate::record::{ImageRecord, LookupBy};
use crate::{CatalogError, CatalogResult};
use imghost_uuid::ImageId;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS images (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    path          TEXT NOT NULL UNIQUE,
    original_name TEXT NOT NULL
)";

const SELECT_BY_ID: &str = "SELECT id, name, path, original_name FROM images WHERE id = ?1";
const SELECT_BY_NAME: &str = "SELECT id, name, path, original_name FROM images WHERE name = ?1";
const SELECT_ALL: &str = "SELECT id, name, path, original_name FROM images ORDER BY rowid";

type RawRecord = (String, String, String, String);

#[derive(Debug, Clone)]
pub struct MetadataStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl MetadataStore {
    /// Opens the database, creating its parent directory, the file and the schema if absent.
    pub fn open(db_path: &Path, busy_timeout: Duration) -> CatalogResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(CatalogError::MetadataDirCreation)?;
            }
        }

        let store = Self {
            db_path: db_path.to_path_buf(),
            busy_timeout,
        };

        let conn = store.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(
                "metadata store {} is using journal_mode={} instead of wal",
                db_path.display(),
                mode
            );
        }
        conn.execute(SCHEMA, [])?;

        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> CatalogResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    pub fn name_exists(&self, name: &str) -> CatalogResult<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row("SELECT 1 FROM images WHERE name = ?1", [name], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find(&self, by: LookupBy, key: &str) -> CatalogResult<Option<ImageRecord>> {
        let sql = match by {
            LookupBy::Id => SELECT_BY_ID,
            LookupBy::Name => SELECT_BY_NAME,
        };
        let conn = self.connect()?;
        conn.query_row(sql, [key], raw_record)
            .optional()?
            .map(into_record)
            .transpose()
    }

    /// Every record in insertion order.
    pub fn list_all(&self) -> CatalogResult<Vec<ImageRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(SELECT_ALL)?;
        let rows = stmt.query_map([], raw_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(into_record(row?)?);
        }
        Ok(records)
    }

    /// Inserts `record`, runs `side_effect`, then commits.
    ///
    /// A `UNIQUE` violation on the name or the path becomes [`CatalogError::DuplicateName`] and
    /// `side_effect` is not run. If `side_effect` fails, nothing is committed and its error is returned.
    ///
    /// `side_effect` runs while the database write lock is held, so it should be a quick step
    /// such as a rename; anything slow blocks every other writer.
    pub fn insert_with<F>(&self, record: &ImageRecord, side_effect: F) -> CatalogResult<()>
    where
        F: FnOnce() -> CatalogResult<()>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO images (id, name, path, original_name) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id.to_string(),
                record.name,
                record.path.to_string_lossy().into_owned(),
                record.original_name,
            ],
        )
        .map_err(|e| insert_error(e, &record.name))?;

        side_effect()?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes the record with `id`, runs `side_effect` with the deleted record, then commits.
    ///
    /// The lookup and the delete run in one immediate transaction, so no other writer can touch
    /// the row in between. If `side_effect` fails the row is kept.
    pub fn delete_with<F>(&self, id: &str, side_effect: F) -> CatalogResult<ImageRecord>
    where
        F: FnOnce(&ImageRecord) -> CatalogResult<()>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let record = tx
            .query_row(SELECT_BY_ID, [id], raw_record)
            .optional()?
            .map(into_record)
            .transpose()?
            .ok_or_else(|| CatalogError::NotFound {
                by: LookupBy::Id,
                key: id.to_string(),
            })?;

        tx.execute("DELETE FROM images WHERE id = ?1", [id])?;
        side_effect(&record)?;
        tx.commit()?;
        Ok(record)
    }
}

fn raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record((id, name, path, original_name): RawRecord) -> CatalogResult<ImageRecord> {
    let id = ImageId::parse(&id).map_err(|_| CatalogError::CorruptRecord(id.clone()))?;
    Ok(ImageRecord {
        id,
        name,
        path: PathBuf::from(path),
        original_name,
    })
}

fn insert_error(err: rusqlite::Error, name: &str) -> CatalogError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            CatalogError::DuplicateName(name.to_string())
        }
        other => CatalogError::Metadata(other),
    }
}
