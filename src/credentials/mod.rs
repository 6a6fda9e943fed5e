//! Credential lifecycle management
//!
//! This module acquires, caches, validates, refreshes and evicts the two
//! kinds of credentials the resource server holds against the
//! authorization server:
//!
//! - administrative SSO sessions ([`session::SessionCredentialManager`])
//! - protection API tokens ([`token::TokenCredentialManager`])
//!
//! Both share one credential collection and a [`lookup::CredentialLookup`]
//! that keeps at most one record per `(owner, category)`, and both
//! serialize work per key through [`guard::KeyedLocks`].
//!
//! [`CredentialServices`] wires everything from a [`Config`].

use std::sync::Arc;

use crate::authz::{AuthorizationServerClient, HttpAuthorizationServer};
use crate::config::Config;
use crate::error::Result;
use crate::store::{CredentialCollection, CredentialStore, SqliteCredentialStore};

pub mod flow;
pub mod guard;
pub mod lookup;
mod metrics;
pub mod session;
pub mod token;
pub mod types;

pub use flow::AuthorizationCodeFlow;
pub use guard::KeyedLocks;
pub use lookup::CredentialLookup;
pub use session::{SessionApi, SessionCredentialManager, SessionValidation};
pub use token::TokenCredentialManager;
pub use types::{PatSubject, SessionPayload, TokenPayload};

/// Lookup and both managers, sharing one store, client and lock map.
#[derive(Debug, Clone)]
pub struct CredentialServices {
    /// Duplicate-healing lookup over the credential collection
    pub lookup: CredentialLookup,
    /// Admin SSO session manager
    pub sessions: SessionCredentialManager,
    /// PAT manager
    pub tokens: TokenCredentialManager,
}

impl CredentialServices {
    /// Build services over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CredentialError::Config`] if the settings a
    /// manager depends on are missing.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        authz: Arc<dyn AuthorizationServerClient>,
        config: &Config,
    ) -> Result<Self> {
        let collection =
            CredentialCollection::new(store, &config.store.database, &config.store.collection);
        let lookup = CredentialLookup::new(collection);
        let locks = Arc::new(KeyedLocks::new());

        let sessions =
            SessionCredentialManager::new(lookup.clone(), authz.clone(), config, locks.clone())?;
        let tokens = TokenCredentialManager::new(lookup.clone(), authz, config, locks)?;

        Ok(Self {
            lookup,
            sessions,
            tokens,
        })
    }

    /// Validate `config`, open the SQLite store and the HTTP client, and
    /// build services over them.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or either collaborator cannot
    /// be constructed.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let store = match &config.store.path {
            Some(path) => SqliteCredentialStore::new_with_path(path)?,
            None => SqliteCredentialStore::new()?,
        };
        tracing::debug!(path = %store.path().display(), "Opened credential store");

        let authz = HttpAuthorizationServer::new(&config.authorization_server)?;

        Self::new(Arc::new(store), Arc::new(authz), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_connect_rejects_invalid_config() {
        assert!(CredentialServices::connect(&Config::default()).is_err());
    }

    #[test]
    fn test_connect_with_store_path() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.authorization_server.admin.password = "secret".to_string();
        config.store.path = Some(dir.path().join("creds.db"));

        assert!(CredentialServices::connect(&config).is_ok());
        assert!(dir.path().join("creds.db").exists());
    }
}
