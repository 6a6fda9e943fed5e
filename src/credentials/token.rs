//! Protection API token (PAT) credentials
//!
//! Every cache hit is reconfirmed against the authorization server before
//! it is returned; stored expiry fields are never consulted.
//!
//! ```text
//! resolve owner -> lock (owner, category) -> lookup
//!   found:     introspect
//!                SUCCESS       -> return stored
//!                NOTAUTHORIZED -> refresh -> ok: replace in place, return
//!                                         -> failed: evict
//!                ERROR         -> evict
//!   evicted or not found:
//!     SSO token given -> authorize -> exchange -> create -> re-read
//!     otherwise       -> error
//! ```

use std::sync::Arc;

use crate::authz::AuthorizationServerClient;
use crate::config::Config;
use crate::error::{CredentialError, Result};
use crate::operation::ResultState;
use crate::store::Credential;

use super::flow::AuthorizationCodeFlow;
use super::guard::KeyedLocks;
use super::lookup::CredentialLookup;
use super::metrics;
use super::session::SessionApi;
use super::types::{PatSubject, TokenPayload};

/// What became of a stored credential after it was checked.
enum Cached {
    Valid(Credential<TokenPayload>),
    Evicted(&'static str),
}

/// Manages PAT credentials: read, introspect, refresh or evict, recreate.
#[derive(Debug, Clone)]
pub struct TokenCredentialManager {
    lookup: CredentialLookup,
    sessions: SessionApi,
    flow: AuthorizationCodeFlow,
    locks: Arc<KeyedLocks>,
    category: String,
}

impl TokenCredentialManager {
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] if the PAT category or the OAuth2
    /// client is not configured.
    pub fn new(
        lookup: CredentialLookup,
        authz: Arc<dyn AuthorizationServerClient>,
        config: &Config,
        locks: Arc<KeyedLocks>,
    ) -> Result<Self> {
        if config.credentials.pat_category.is_empty() {
            return Err(CredentialError::Config(
                "credentials.pat_category cannot be empty".to_string(),
            ));
        }

        let flow = AuthorizationCodeFlow::new(
            authz.clone(),
            config.authorization_server.clone(),
            config.client.clone(),
        )?;

        Ok(Self {
            lookup,
            sessions: SessionApi::new(authz, config.authorization_server.clone()),
            flow,
            locks,
            category: config.credentials.pat_category.clone(),
        })
    }

    /// Return a valid PAT for `subject`.
    ///
    /// A stored token is introspected and, if expired, refreshed in place.
    /// A token that cannot be refreshed is deleted. A new token is acquired
    /// only when the subject is an SSO token.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Validation`] for an empty subject, an SSO
    ///   session without an owner, or when no credential exists and none can
    ///   be created
    /// - [`CredentialError::Protocol`] if the authorization server answers
    ///   out of protocol
    /// - transport errors from the store or the server, unchanged
    pub async fn read(&self, subject: &PatSubject) -> Result<Credential<TokenPayload>> {
        let owner = match subject {
            PatSubject::Owner(owner) if !owner.is_empty() => owner.clone(),
            PatSubject::SsoToken(token) if !token.is_empty() => {
                self.sessions.resolve_owner(token).await?
            }
            _ => {
                return Err(CredentialError::Validation(
                    "either an owner or an SSO token is required".to_string(),
                ))
            }
        };

        let _guard = self.locks.acquire(&owner, &self.category).await;

        let evicted = match self.lookup.find_credential_id(&owner, &self.category).await? {
            Some(uid) => match self.check_cached(&uid).await? {
                Cached::Valid(credential) => return Ok(credential),
                Cached::Evicted(reason) => Some(reason),
            },
            None => None,
        };

        match subject.sso_token() {
            Some(sso_token) => self.create(&owner, sso_token).await,
            None => {
                let mut message = format!("no means to create a credential for owner '{owner}'");
                if let Some(reason) = evicted {
                    message.push_str(&format!(", stored credential was evicted: {reason}"));
                }
                Err(CredentialError::Validation(message))
            }
        }
    }

    async fn check_cached(&self, uid: &str) -> Result<Cached> {
        let collection = self.lookup.collection();

        let stored = match collection.read::<TokenPayload>(uid).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(Cached::Evicted("record vanished")),
            Err(CredentialError::Serialization(e)) => {
                tracing::warn!(uid, error = %e, "Stored token payload is malformed");
                return self.evict(uid, "malformed payload").await;
            }
            Err(e) => return Err(e),
        };

        if stored.payload.access_token.is_empty() {
            return self.evict(uid, "empty access token").await;
        }

        let state = match self.flow.introspect(&stored.payload.access_token).await {
            Ok(state) => state,
            Err(e) if e.is_transport() => {
                tracing::warn!(uid, error = %e, "Token introspection failed");
                ResultState::Error
            }
            Err(e) => return Err(e),
        };

        match state {
            ResultState::Success => {
                tracing::debug!(uid, "Stored token is valid");
                metrics::record_cache_hit(&self.category);
                Ok(Cached::Valid(stored))
            }
            ResultState::NotAuthorized => self.refresh_in_place(stored).await,
            ResultState::Error => self.evict(uid, "introspection failed").await,
            ResultState::NotExist | ResultState::Warning => Err(CredentialError::Protocol(
                format!("unexpected token introspection state {state}"),
            )),
        }
    }

    async fn refresh_in_place(&self, mut stored: Credential<TokenPayload>) -> Result<Cached> {
        let Some(refresh_token) = stored
            .payload
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
        else {
            metrics::record_refresh(false);
            return self.evict(&stored.uid, "no refresh token").await;
        };

        let refreshed = match self.flow.refresh(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(uid = %stored.uid, error = %e, "Token refresh failed");
                metrics::record_refresh(false);
                return self.evict(&stored.uid, "refresh failed").await;
            }
        };

        stored.payload.apply_refresh(refreshed);
        if let Err(e) = self.lookup.collection().replace(&stored).await {
            tracing::warn!(uid = %stored.uid, error = %e, "Failed to store refreshed token");
            metrics::record_refresh(false);
            return self.evict(&stored.uid, "replace failed").await;
        }

        tracing::info!(uid = %stored.uid, owner = %stored.owner, "Refreshed protection API token");
        metrics::record_refresh(true);
        Ok(Cached::Valid(stored))
    }

    async fn evict(&self, uid: &str, reason: &'static str) -> Result<Cached> {
        self.lookup.collection().delete(uid).await?;
        tracing::warn!(uid, reason, "Evicted protection API token");
        metrics::record_eviction(&self.category, reason);
        Ok(Cached::Evicted(reason))
    }

    async fn create(&self, owner: &str, sso_token: &str) -> Result<Credential<TokenPayload>> {
        let code = self.flow.authorize(sso_token).await?;
        let payload = self.flow.exchange_code(&code).await?;

        let collection = self.lookup.collection();
        let uid = collection.create(owner, &self.category, &payload).await?;
        tracing::info!(uid = %uid, owner, "Created protection API token");
        metrics::record_created(&self.category);

        collection.read(&uid).await?.ok_or_else(|| {
            CredentialError::StateInconsistency(format!(
                "credential '{uid}' is missing right after creation"
            ))
        })
    }
}
