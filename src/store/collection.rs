//! Typed boundary over one credential collection
//!
//! [`CredentialCollection`] is the only place that builds store operations
//! and converts between credential documents and typed [`Credential`]
//! records. A stored document has the shape
//!
//! ```json
//! {"uid": "...", "data": {"owner": "...", "category": "...", "credential": { ... }}}
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{CredentialStore, StoreOperation, StoreQuery, StoreResponse};
use crate::error::{CredentialError, Result};
use crate::operation::{OperationType, ResultState};

/// A stored credential with a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credential<P> {
    /// Store-assigned document id
    pub uid: String,
    /// Principal the credential belongs to
    pub owner: String,
    /// Credential kind
    pub category: String,
    /// Manager-specific payload
    pub payload: P,
}

#[derive(Serialize, Deserialize)]
struct DocumentData<P> {
    owner: String,
    category: String,
    credential: P,
}

/// One hit of a search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    /// Document id
    pub uid: String,
}

/// Search output as reported by the store.
///
/// Both fields are optional on the wire; interpreting missing or
/// disagreeing values is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchPage {
    /// Reported number of matches
    #[serde(default)]
    pub quantity: Option<u64>,
    /// Matching documents
    #[serde(default)]
    pub results: Option<Vec<SearchHit>>,
}

/// Store operations scoped to a `(database, collection)` pair.
#[derive(Debug, Clone)]
pub struct CredentialCollection {
    store: Arc<dyn CredentialStore>,
    database: String,
    collection: String,
}

impl CredentialCollection {
    /// Create a collection handle.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            database: database.into(),
            collection: collection.into(),
        }
    }

    async fn execute(&self, kind: OperationType, json: Value) -> Result<StoreResponse> {
        self.store
            .execute(StoreOperation {
                kind,
                json,
                database: self.database.clone(),
                collection: self.collection.clone(),
            })
            .await
    }

    fn failure(kind: OperationType, resp: &StoreResponse) -> CredentialError {
        CredentialError::Transport(format!(
            "store {kind} failed: {} ({}): {}",
            resp.state,
            resp.status,
            resp.message()
        ))
    }

    /// Run a search.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] if the store fails the search
    /// or answers with a body that is not a search page.
    pub async fn search(&self, query: &StoreQuery) -> Result<SearchPage> {
        let resp = self
            .execute(OperationType::Search, json!({ "query": query }))
            .await?;
        if !resp.state.is_success() {
            return Err(Self::failure(OperationType::Search, &resp));
        }
        serde_json::from_value(resp.json).map_err(|e| {
            CredentialError::Transport(format!("malformed search response: {e}"))
        })
    }

    /// Read a credential by uid; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] on store failures and
    /// [`CredentialError::Serialization`] if the document does not hold a
    /// payload of type `P`.
    pub async fn read<P: DeserializeOwned>(&self, uid: &str) -> Result<Option<Credential<P>>> {
        let resp = self.execute(OperationType::Read, json!({ "uid": uid })).await?;
        match resp.state {
            ResultState::Success => {}
            ResultState::NotExist => return Ok(None),
            _ => return Err(Self::failure(OperationType::Read, &resp)),
        }

        let data = resp.json.get("data").cloned().unwrap_or(Value::Null);
        let doc: DocumentData<P> = serde_json::from_value(data)?;
        Ok(Some(Credential {
            uid: uid.to_string(),
            owner: doc.owner,
            category: doc.category,
            payload: doc.credential,
        }))
    }

    /// Create a credential and return its uid.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] if the store rejects the
    /// document or does not report a uid.
    pub async fn create<P: Serialize>(
        &self,
        owner: &str,
        category: &str,
        payload: &P,
    ) -> Result<String> {
        let data = serde_json::to_value(DocumentData {
            owner: owner.to_string(),
            category: category.to_string(),
            credential: payload,
        })?;
        let resp = self
            .execute(OperationType::Create, json!({ "data": data }))
            .await?;
        if !resp.state.is_success() {
            return Err(Self::failure(OperationType::Create, &resp));
        }
        resp.json
            .get("uid")
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CredentialError::Transport("store CREATE returned no uid".to_string()))
    }

    /// Replace an existing credential in place.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] if the store does not replace
    /// the document, including when it no longer exists.
    pub async fn replace<P: Serialize>(&self, credential: &Credential<P>) -> Result<()> {
        let data = serde_json::to_value(DocumentData {
            owner: credential.owner.clone(),
            category: credential.category.clone(),
            credential: &credential.payload,
        })?;
        let resp = self
            .execute(
                OperationType::Replace,
                json!({ "uid": credential.uid, "data": data }),
            )
            .await?;
        if !resp.state.is_success() {
            return Err(Self::failure(OperationType::Replace, &resp));
        }
        Ok(())
    }

    /// Delete a credential. Returns `false` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] if the store fails the delete.
    pub async fn delete(&self, uid: &str) -> Result<bool> {
        let resp = self
            .execute(OperationType::Delete, json!({ "uid": uid }))
            .await?;
        match resp.state {
            ResultState::Success => Ok(true),
            ResultState::NotExist => Ok(false),
            _ => Err(Self::failure(OperationType::Delete, &resp)),
        }
    }
}
