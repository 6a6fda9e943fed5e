//! In-process credential store
//!
//! Holds documents in a map keyed by `(database, collection)` and uid.
//! Used by tests, including tests that need to seed states the managers
//! never produce on their own, such as duplicate records.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::{json, Value};

use super::{uid_of, CredentialStore, StoreOperation, StoreQuery, StoreResponse};
use crate::error::{CredentialError, Result};
use crate::operation::OperationType;

type Collection = BTreeMap<String, Value>;

/// In-memory [`CredentialStore`].
///
/// # Examples
///
/// ```
/// use umacred::store::MemoryCredentialStore;
/// use serde_json::json;
///
/// let store = MemoryCredentialStore::new();
/// store.insert_raw("db", "credentials", "uid-1", json!({"owner": "x"}));
/// assert_eq!(store.count("db", "credentials"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    collections: Mutex<HashMap<(String, String), Collection>>,
    operations: Mutex<Vec<OperationType>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under `uid` without going through the contract.
    pub fn insert_raw(&self, database: &str, collection: &str, uid: &str, data: Value) {
        if let Ok(mut collections) = self.collections.lock() {
            collections
                .entry((database.to_string(), collection.to_string()))
                .or_default()
                .insert(uid.to_string(), data);
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, database: &str, collection: &str) -> usize {
        self.collections
            .lock()
            .map(|c| {
                c.get(&(database.to_string(), collection.to_string()))
                    .map_or(0, BTreeMap::len)
            })
            .unwrap_or(0)
    }

    /// Snapshot of every `(uid, data)` pair in a collection.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<(String, Value)> {
        self.collections
            .lock()
            .map(|c| {
                c.get(&(database.to_string(), collection.to_string()))
                    .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Operation kinds executed so far, in order.
    pub fn operations(&self) -> Vec<OperationType> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    fn apply(collection: &mut Collection, op: &StoreOperation) -> StoreResponse {
        match op.kind {
            OperationType::Create => match op.json.get("data") {
                Some(data) => {
                    let uid = uuid::Uuid::new_v4().to_string();
                    collection.insert(uid.clone(), data.clone());
                    StoreResponse::success(json!({ "uid": uid }))
                }
                None => StoreResponse::error("CREATE requires 'data'"),
            },
            OperationType::Read => match uid_of(&op.json) {
                Some(uid) => match collection.get(uid) {
                    Some(data) => StoreResponse::success(json!({ "uid": uid, "data": data })),
                    None => StoreResponse::not_exist(uid),
                },
                None => StoreResponse::error("READ requires 'uid'"),
            },
            OperationType::Replace => match (uid_of(&op.json), op.json.get("data")) {
                (Some(uid), Some(data)) => match collection.get_mut(uid) {
                    Some(slot) => {
                        *slot = data.clone();
                        StoreResponse::success(json!({ "uid": uid }))
                    }
                    None => StoreResponse::not_exist(uid),
                },
                _ => StoreResponse::error("REPLACE requires 'uid' and 'data'"),
            },
            OperationType::Delete => match uid_of(&op.json) {
                Some(uid) => match collection.remove(uid) {
                    Some(_) => StoreResponse::success(json!({ "uid": uid })),
                    None => StoreResponse::not_exist(uid),
                },
                None => StoreResponse::error("DELETE requires 'uid'"),
            },
            OperationType::Search => {
                let query = match op
                    .json
                    .get("query")
                    .cloned()
                    .map(serde_json::from_value::<StoreQuery>)
                {
                    Some(Ok(query)) => query,
                    Some(Err(e)) => return StoreResponse::error(format!("invalid query: {e}")),
                    None => return StoreResponse::error("SEARCH requires 'query'"),
                };
                let results: Vec<Value> = collection
                    .iter()
                    .map(|(uid, data)| json!({ "uid": uid, "data": data }))
                    .filter(|doc| query.matches(doc))
                    .collect();
                StoreResponse::success(json!({
                    "quantity": results.len(),
                    "results": results,
                }))
            }
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn execute(&self, op: StoreOperation) -> Result<StoreResponse> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| CredentialError::Storage("memory store lock poisoned".to_string()))?;
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(op.kind);
        }
        let collection = collections
            .entry((op.database.clone(), op.collection.clone()))
            .or_default();
        Ok(Self::apply(collection, &op))
    }
}
