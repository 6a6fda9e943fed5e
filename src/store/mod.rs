//! Credential document store
//!
//! The store is a persistent JSON-document collection addressed by
//! `(database, collection, uid)`. It is driven through the [`CredentialStore`]
//! trait with a single [`StoreOperation`] shape for every operation kind.
//!
//! Module layout:
//!
//! - [`query`] -- typed search query tree shared by every backend
//! - [`collection`] -- typed boundary that (de)serialises credential documents
//! - [`sqlite::SqliteCredentialStore`] -- persistent backend on SQLite
//! - [`memory::MemoryCredentialStore`] -- in-process backend used by tests
//!
//! # Document shapes
//!
//! | Operation | Input `json`            | Output `json`                                  |
//! |-----------|-------------------------|------------------------------------------------|
//! | CREATE    | `{"data"}`              | `{"uid"}`                                      |
//! | READ      | `{"uid"}`               | `{"uid", "data"}`                              |
//! | REPLACE   | `{"uid", "data"}`       | `{"uid"}`                                      |
//! | DELETE    | `{"uid"}`               | `{"uid"}`                                      |
//! | SEARCH    | `{"query"}`             | `{"quantity", "results": [{"uid", "data"}]}`   |
//!
//! READ, REPLACE and DELETE of an unknown uid answer `NOTEXIST`. Malformed
//! input answers `ERROR` with a `message`; only failures to reach the
//! backend at all surface as `Err`.

use serde_json::{json, Value};

use crate::error::Result;
use crate::operation::{OperationType, ResultState};

pub mod collection;
pub mod memory;
pub mod query;
pub mod sqlite;

pub use collection::{Credential, CredentialCollection};
pub use memory::MemoryCredentialStore;
pub use query::StoreQuery;
pub use sqlite::SqliteCredentialStore;

/// A single operation submitted to a [`CredentialStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOperation {
    /// Operation kind
    pub kind: OperationType,
    /// Operation input, shaped per the table in the module docs
    pub json: Value,
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

/// Result of a [`StoreOperation`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    /// Outcome state
    pub state: ResultState,
    /// HTTP-like status code describing the outcome
    pub status: u16,
    /// Operation output, shaped per the table in the module docs
    pub json: Value,
}

impl StoreResponse {
    /// Successful response carrying `json`.
    pub fn success(json: Value) -> Self {
        Self {
            state: ResultState::Success,
            status: 200,
            json,
        }
    }

    /// `NOTEXIST` response for `uid`.
    pub fn not_exist(uid: &str) -> Self {
        Self {
            state: ResultState::NotExist,
            status: 404,
            json: json!({ "message": format!("document '{uid}' does not exist") }),
        }
    }

    /// `ERROR` response carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ResultState::Error,
            status: 400,
            json: json!({ "message": message.into() }),
        }
    }

    /// The `message` field of the response body, or an empty string.
    pub fn message(&self) -> &str {
        self.json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Persistent JSON-document store holding credential records.
///
/// Implementations are shared through `Arc<dyn CredentialStore>` and must be
/// safe to call from concurrent tasks.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Execute one operation against the store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CredentialError::Transport`] or
    /// [`crate::error::CredentialError::Storage`] if the backend cannot be
    /// reached. Operation-level failures are reported through
    /// [`StoreResponse::state`].
    async fn execute(&self, op: StoreOperation) -> Result<StoreResponse>;
}

/// Extract the string `uid` field from operation input.
pub(crate) fn uid_of(json: &Value) -> Option<&str> {
    json.get("uid").and_then(Value::as_str).filter(|u| !u.is_empty())
}
