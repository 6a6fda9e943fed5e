//! SQLite credential store

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{json, Value};

use super::{uid_of, CredentialStore, StoreOperation, StoreQuery, StoreResponse};
use crate::error::{CredentialError, Result};
use crate::operation::OperationType;

/// Persistent [`CredentialStore`] backed by a SQLite file.
///
/// Documents are stored as JSON text in a single table keyed by
/// `(database, collection, uid)`. Every call opens its own connection on a
/// blocking worker thread.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    db_path: PathBuf,
}

impl SqliteCredentialStore {
    /// Create a store in the user's data directory.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] if the data directory cannot be
    /// determined or created, or the schema cannot be initialised.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("org", "umacred", "umacred")
            .ok_or_else(|| CredentialError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("credentials.db"))
    }

    /// Create a store using the specified database file.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::store::SqliteCredentialStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteCredentialStore::new_with_path(dir.path().join("creds.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| CredentialError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| CredentialError::Storage(format!("{e:#}")))
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                database TEXT NOT NULL,
                collection TEXT NOT NULL,
                uid TEXT NOT NULL,
                data JSON NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (database, collection, uid)
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| CredentialError::Storage(format!("{e:#}")))?;

        Ok(())
    }

    fn execute_blocking(&self, op: &StoreOperation) -> Result<StoreResponse> {
        let conn = self.open()?;
        let (db, coll) = (op.database.as_str(), op.collection.as_str());

        match op.kind {
            OperationType::Create => {
                let Some(data) = op.json.get("data") else {
                    return Ok(StoreResponse::error("CREATE requires 'data'"));
                };
                let uid = uuid::Uuid::new_v4().to_string();
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO documents (database, collection, uid, data, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![db, coll, uid, data.to_string(), now, now],
                )?;
                Ok(StoreResponse::success(json!({ "uid": uid })))
            }
            OperationType::Read => {
                let Some(uid) = uid_of(&op.json) else {
                    return Ok(StoreResponse::error("READ requires 'uid'"));
                };
                let row: Option<String> = conn
                    .query_row(
                        "SELECT data FROM documents WHERE database = ? AND collection = ? AND uid = ?",
                        params![db, coll, uid],
                        |row| row.get(0),
                    )
                    .optional()?;
                match row {
                    Some(text) => {
                        let data: Value = serde_json::from_str(&text)?;
                        Ok(StoreResponse::success(json!({ "uid": uid, "data": data })))
                    }
                    None => Ok(StoreResponse::not_exist(uid)),
                }
            }
            OperationType::Replace => {
                let (Some(uid), Some(data)) = (uid_of(&op.json), op.json.get("data")) else {
                    return Ok(StoreResponse::error("REPLACE requires 'uid' and 'data'"));
                };
                let changed = conn.execute(
                    "UPDATE documents SET data = ?, updated_at = ?
                     WHERE database = ? AND collection = ? AND uid = ?",
                    params![data.to_string(), Utc::now().to_rfc3339(), db, coll, uid],
                )?;
                if changed == 0 {
                    return Ok(StoreResponse::not_exist(uid));
                }
                Ok(StoreResponse::success(json!({ "uid": uid })))
            }
            OperationType::Delete => {
                let Some(uid) = uid_of(&op.json) else {
                    return Ok(StoreResponse::error("DELETE requires 'uid'"));
                };
                let changed = conn.execute(
                    "DELETE FROM documents WHERE database = ? AND collection = ? AND uid = ?",
                    params![db, coll, uid],
                )?;
                if changed == 0 {
                    return Ok(StoreResponse::not_exist(uid));
                }
                Ok(StoreResponse::success(json!({ "uid": uid })))
            }
            OperationType::Search => {
                let query = match op
                    .json
                    .get("query")
                    .cloned()
                    .map(serde_json::from_value::<StoreQuery>)
                {
                    Some(Ok(query)) => query,
                    Some(Err(e)) => return Ok(StoreResponse::error(format!("invalid query: {e}"))),
                    None => return Ok(StoreResponse::error("SEARCH requires 'query'")),
                };
                let (predicate, query_params) = match query.to_sql() {
                    Ok(compiled) => compiled,
                    Err(e) => return Ok(StoreResponse::error(e.to_string())),
                };

                let mut bound = vec![SqlValue::Text(db.to_string()), SqlValue::Text(coll.to_string())];
                bound.extend(query_params);

                let sql = format!(
                    "SELECT uid, data FROM documents
                     WHERE database = ? AND collection = ? AND {predicate}
                     ORDER BY created_at"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(bound), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut results = Vec::new();
                for row in rows {
                    let (uid, text) = row?;
                    let data: Value = serde_json::from_str(&text)?;
                    results.push(json!({ "uid": uid, "data": data }));
                }

                Ok(StoreResponse::success(json!({
                    "quantity": results.len(),
                    "results": results,
                })))
            }
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn execute(&self, op: StoreOperation) -> Result<StoreResponse> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.execute_blocking(&op))
            .await
            .map_err(|e| CredentialError::Storage(format!("store task failed: {e}")))?
    }
}
