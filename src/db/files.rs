//! Uploaded file storage
//!
//! Files are stored whole in the `documents` table, grouped by the
//! caller-supplied parent id. Each row records a SHA-256 of its bytes.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::Database;
use crate::types::StoreError;

/// File to be inserted
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// File metadata without the bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMeta {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ParentID")]
    pub parent_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "Sha256")]
    pub sha256: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "Created")]
    pub created: String,
}

/// File metadata plus its bytes
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub meta: FileMeta,
    pub data: Vec<u8>,
}

const META_COLUMNS: &str = "id, parent_id, name, content_type, sha256, size, created";

fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<FileMeta> {
    Ok(FileMeta {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        content_type: row.get(3)?,
        sha256: row.get(4)?,
        size: row.get::<_, i64>(5)? as u64,
        created: row.get(6)?,
    })
}

impl Database {
    /// Insert files under one parent in a single transaction
    pub fn insert_files(&self, parent_id: &str, files: Vec<NewFile>) -> Result<Vec<Uuid>, StoreError> {
        let created = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut ids = Vec::with_capacity(files.len());

            for file in files {
                let id = Uuid::new_v4();
                let sha256 = hex::encode(Sha256::digest(&file.data));
                tx.execute(
                    "INSERT INTO documents (id, parent_id, name, content_type, sha256, size, data, created)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        id.to_string(),
                        parent_id,
                        file.name,
                        file.content_type,
                        sha256,
                        file.data.len() as i64,
                        file.data,
                        created,
                    ],
                )?;
                ids.push(id);
            }

            tx.commit()?;
            debug!(parent_id = %parent_id, count = ids.len(), "Stored files");
            Ok(ids)
        })
    }

    pub fn find_file(&self, id: &Uuid) -> Result<Option<StoredFile>, StoreError> {
        debug!(file_id = %id, "Finding file");
        self.with_conn(|conn| {
            let file = conn
                .query_row(
                    &format!("SELECT {}, data FROM documents WHERE id = ?1", META_COLUMNS),
                    params![id.to_string()],
                    |row| {
                        Ok(StoredFile {
                            meta: meta_from_row(row)?,
                            data: row.get(7)?,
                        })
                    },
                )
                .optional()?;
            Ok(file)
        })
    }

    pub fn list_files(&self, parent_id: &str) -> Result<Vec<FileMeta>, StoreError> {
        debug!(parent_id = %parent_id, "Finding files");
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents WHERE parent_id = ?1 ORDER BY created, name",
                META_COLUMNS
            ))?;
            let files = stmt
                .query_map(params![parent_id], meta_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(files)
        })
    }

    /// Delete one file; `NotFound` if no row matched
    pub fn delete_file(&self, id: &Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let deleted =
                conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("file {}", id)));
            }
            Ok(())
        })
    }

    /// Delete every file under a parent, returning how many were removed
    pub fn delete_files(&self, parent_id: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let deleted =
                conn.execute("DELETE FROM documents WHERE parent_id = ?1", params![parent_id])?;
            Ok(deleted)
        })
    }
}
