//! Credential lookup by `(owner, category)`
//!
//! Resolves a key to at most one stored credential and removes duplicate
//! records left behind by concurrent writers.

use crate::error::{CredentialError, Result};
use crate::store::collection::SearchHit;
use crate::store::{CredentialCollection, StoreQuery};

use super::metrics;

/// Resolves `(owner, category)` to at most one stored credential id.
///
/// The store is treated as a cache that may hold more than one record per
/// key after a cross-process race. When that happens every matching record
/// is deleted and the key is reported as absent, so the caller recreates a
/// single fresh credential.
///
/// # Indeterminate search results
///
/// - `quantity` missing or null: the count is taken from `results`.
/// - `results` missing: a `quantity` of 0 means no match; anything else is a
///   malformed response and fails with [`CredentialError::Transport`].
/// - `quantity` disagreeing with the number of `results`: handled like
///   duplicates.
#[derive(Debug, Clone)]
pub struct CredentialLookup {
    collection: CredentialCollection,
}

impl CredentialLookup {
    pub fn new(collection: CredentialCollection) -> Self {
        Self { collection }
    }

    /// The collection this lookup searches.
    pub fn collection(&self) -> &CredentialCollection {
        &self.collection
    }

    /// Find the id of the single credential stored for `(owner, category)`.
    ///
    /// # Returns
    ///
    /// `Some(uid)` for exactly one match, `None` for no match or after
    /// duplicates were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Validation`] for an empty owner or
    /// category and [`CredentialError::Transport`] if the search fails or
    /// its response is malformed.
    pub async fn find_credential_id(&self, owner: &str, category: &str) -> Result<Option<String>> {
        if owner.is_empty() {
            return Err(CredentialError::Validation("owner is empty".to_string()));
        }
        if category.is_empty() {
            return Err(CredentialError::Validation("category is empty".to_string()));
        }

        let page = self
            .collection
            .search(&StoreQuery::owner_and_category(owner, category))
            .await?;

        let hits = match (page.quantity, page.results) {
            (Some(0), None) => return Ok(None),
            (None, None) => {
                return Err(CredentialError::Transport(format!(
                    "search for owner '{owner}' category '{category}' returned neither quantity nor results"
                )))
            }
            (Some(quantity), None) => {
                return Err(CredentialError::Transport(format!(
                    "search reported {quantity} matches without results"
                )))
            }
            (quantity, Some(hits)) => {
                let reported = quantity.unwrap_or(hits.len() as u64);
                if reported != hits.len() as u64 {
                    tracing::error!(
                        owner,
                        category,
                        reported,
                        listed = hits.len(),
                        "Search quantity disagrees with results, removing listed credentials"
                    );
                    self.remove_duplicates(category, &hits).await;
                    return Ok(None);
                }
                hits
            }
        };

        match hits.as_slice() {
            [] => {
                tracing::debug!(owner, category, "No stored credential");
                Ok(None)
            }
            [single] => Ok(Some(single.uid.clone())),
            many => {
                let err = CredentialError::StateInconsistency(format!(
                    "{} credentials stored for owner '{owner}' category '{category}'",
                    many.len()
                ));
                tracing::error!(error = %err, "Removing duplicate credentials");
                self.remove_duplicates(category, many).await;
                Ok(None)
            }
        }
    }

    /// Delete every listed record. Failures are logged and skipped; any
    /// survivor is picked up again by the next lookup.
    async fn remove_duplicates(&self, category: &str, hits: &[SearchHit]) {
        let mut removed = 0u64;
        for hit in hits {
            match self.collection.delete(&hit.uid).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(uid = %hit.uid, error = %e, "Failed to delete duplicate credential");
                }
            }
        }
        metrics::record_duplicates_removed(category, removed);
    }
}
