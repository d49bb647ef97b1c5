// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document metadata persistence backed by SQLite.
//
// Stores record metadata and the (small) thumbnail bytes; the page-stream
// payload lives in the blob store and is referenced by location.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use quire_core::error::{QuireError, Result};
use quire_core::{DocumentId, DocumentRecord};

/// Interface the engine sees: insert (upsert), list, delete, titles.
///
/// `insert` replaces an existing record with the same id wholesale — saves
/// are full record replacements, never field-level updates.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: &DocumentRecord) -> Result<()>;
    fn list_all(&self) -> Result<Vec<DocumentRecord>>;
    fn delete_by_id(&self, id: DocumentId) -> Result<()>;
    fn list_titles(&self) -> Result<Vec<String>>;
}

/// SQLite schema for the documents table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        extension TEXT NOT NULL,
        created_at TEXT NOT NULL,
        thumbnail BLOB NOT NULL,
        location TEXT NOT NULL
    )
"#;

/// Record store backed by a SQLite database.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively. The connection is mutex-guarded so the store can be shared
/// across worker tasks.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the document database at the given path.
    ///
    /// Applies WAL journal mode for better concurrent-read behaviour and
    /// creates the `documents` table if it does not exist.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| QuireError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| QuireError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| QuireError::Database(format!("create table: {e}")))?;

        info!("document database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QuireError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| QuireError::Database(format!("create table: {e}")))?;

        debug!("in-memory document database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QuireError::Database("connection mutex poisoned".into()))
    }
}

impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self, record), fields(id = %record.id, title = %record.title))]
    fn insert(&self, record: &DocumentRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents
             (id, title, extension, created_at, thumbnail, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.title,
                record.extension,
                record.created_at.to_rfc3339(),
                record.thumbnail,
                record.location.to_string_lossy().into_owned(),
            ],
        )
        .map_err(|e| QuireError::Database(format!("insert: {e}")))?;

        debug!("record stored");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, extension, created_at, thumbnail, location
                 FROM documents ORDER BY created_at DESC",
            )
            .map_err(|e| QuireError::Database(format!("prepare list: {e}")))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| QuireError::Database(format!("list: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| QuireError::Database(format!("row: {e}")))?);
        }
        Ok(records)
    }

    #[instrument(skip(self), fields(id = %id))]
    fn delete_by_id(&self, id: DocumentId) -> Result<()> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "DELETE FROM documents WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| QuireError::Database(format!("delete: {e}")))?;

        debug!(affected, "record deleted");
        Ok(())
    }

    fn list_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT title FROM documents")
            .map_err(|e| QuireError::Database(format!("prepare titles: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| QuireError::Database(format!("titles: {e}")))?;

        let mut titles = Vec::new();
        for row in rows {
            titles.push(row.map_err(|e| QuireError::Database(format!("title row: {e}")))?);
        }
        Ok(titles)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let id_text: String = row.get(0)?;
    let created_text: String = row.get(3)?;
    let location_text: String = row.get(5)?;

    let id = Uuid::parse_str(&id_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(DocumentRecord {
        id: DocumentId(id),
        title: row.get(1)?,
        extension: row.get(2)?,
        created_at,
        thumbnail: row.get(4)?,
        location: PathBuf::from(location_text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(),
            title: title.into(),
            extension: "pdf".into(),
            created_at: Utc::now(),
            thumbnail: vec![1, 2, 3],
            location: PathBuf::from("/tmp/doc.pdf"),
        }
    }

    #[test]
    fn insert_and_list_round_trip() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let original = record("Notes");
        store.insert(&original).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, original.id);
        assert_eq!(all[0].title, "Notes");
        assert_eq!(all[0].thumbnail, vec![1, 2, 3]);
        assert_eq!(all[0].location, PathBuf::from("/tmp/doc.pdf"));
    }

    #[test]
    fn insert_same_id_replaces_record() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let mut rec = record("Draft");
        store.insert(&rec).unwrap();

        rec.title = "Final".into();
        rec.thumbnail = vec![9];
        store.insert(&rec).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Final");
        assert_eq!(all[0].thumbnail, vec![9]);
    }

    #[test]
    fn delete_removes_only_the_target() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let keep = record("Keep");
        let drop = record("Drop");
        store.insert(&keep).unwrap();
        store.insert(&drop).unwrap();

        store.delete_by_id(drop.id).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, keep.id);
    }

    #[test]
    fn delete_missing_id_is_not_an_error() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.delete_by_id(DocumentId::new()).unwrap();
    }

    #[test]
    fn titles_are_listed() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.insert(&record("A")).unwrap();
        store.insert(&record("B")).unwrap();

        let mut titles = store.list_titles().unwrap();
        titles.sort();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("documents.db");

        {
            let store = SqliteRecordStore::open(&db_path).unwrap();
            store.insert(&record("Persistent")).unwrap();
        }

        let store = SqliteRecordStore::open(&db_path).unwrap();
        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Persistent");
    }
}
