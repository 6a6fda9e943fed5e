//! Administrative SSO session credentials
//!
//! [`SessionApi`] wraps the authorization server's authenticate and session
//! endpoints. [`SessionCredentialManager`] keeps one validated admin session
//! in the credential store:
//!
//! ```text
//! LOOKUP -> FOUND     -> VALIDATE -> VALID   -> DONE
//!                                 -> INVALID -> RECREATE (replace)
//!        -> NOT_FOUND -> RECREATE (create)
//! ```

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::authz::{AuthorizationServerClient, AuthzOperation, AuthzRequest};
use crate::config::{AuthorizationServerConfig, Config};
use crate::error::{CredentialError, Result};
use crate::operation::ResultState;
use crate::store::Credential;

use super::guard::KeyedLocks;
use super::lookup::CredentialLookup;
use super::metrics;
use super::types::SessionPayload;

// ---------------------------------------------------------------------------
// SessionApi
// ---------------------------------------------------------------------------

/// Outcome of a session validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionValidation {
    /// Whether the server still accepts the session
    pub valid: bool,
    /// Principal owning the session
    pub uid: Option<String>,
    /// Realm of the session
    pub realm: Option<String>,
    /// Server-side session handle
    pub session_uid: Option<String>,
}

#[derive(Deserialize)]
struct ValidateResponse {
    valid: Option<bool>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    realm: Option<String>,
    #[serde(default, rename = "sessionUid")]
    session_uid: Option<String>,
}

/// Client for the authorization server's session endpoints.
#[derive(Debug, Clone)]
pub struct SessionApi {
    authz: Arc<dyn AuthorizationServerClient>,
    config: AuthorizationServerConfig,
}

impl SessionApi {
    pub fn new(authz: Arc<dyn AuthorizationServerClient>, config: AuthorizationServerConfig) -> Self {
        Self { authz, config }
    }

    /// Authenticate `user` and return the new session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Protocol`] if the server rejects the
    /// login or answers without a `tokenId`, and transport errors from the
    /// client unchanged.
    pub async fn authenticate(&self, user: &str, password: &str) -> Result<SessionPayload> {
        let endpoint = &self.config.authenticate;
        let request = AuthzRequest::new(&endpoint.path)
            .header("Accept-API-Version", &endpoint.accept_api_version)
            .header(&endpoint.user_header, user)
            .header(&endpoint.password_header, password)
            .json(json!({}));

        let resp = self.authz.execute(AuthzOperation::create(request)).await?;
        if !resp.state.is_success() {
            return Err(CredentialError::Protocol(format!(
                "authentication of '{user}' failed: {}",
                resp.describe()
            )));
        }

        let payload: SessionPayload = serde_json::from_value(resp.body).map_err(|e| {
            CredentialError::Protocol(format!("malformed authenticate response: {e}"))
        })?;
        if payload.token_id.is_empty() {
            return Err(CredentialError::Protocol(
                "authenticate response has an empty 'tokenId'".to_string(),
            ));
        }

        tracing::debug!(user, realm = %payload.realm, "Authenticated");
        Ok(payload)
    }

    /// Ask the server whether `token_id` is still a live session.
    ///
    /// A `NOTAUTHORIZED` answer is reported as an invalid session rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Protocol`] for answers without a `valid`
    /// flag or with an unexpected state.
    pub async fn validate(&self, token_id: &str) -> Result<SessionValidation> {
        let endpoint = &self.config.sessions;
        let request = AuthzRequest::new(&endpoint.path)
            .query("_action", "validate")
            .header("Accept-API-Version", &endpoint.accept_api_version)
            .header(&self.config.cookie_name, token_id)
            .json(json!({ "tokenId": token_id }));

        let resp = self.authz.execute(AuthzOperation::create(request)).await?;
        match resp.state {
            ResultState::Success => {
                let parsed: ValidateResponse = serde_json::from_value(resp.body).map_err(|e| {
                    CredentialError::Protocol(format!("malformed session validation response: {e}"))
                })?;
                let valid = parsed.valid.ok_or_else(|| {
                    CredentialError::Protocol(
                        "session validation response has no 'valid' flag".to_string(),
                    )
                })?;
                Ok(SessionValidation {
                    valid,
                    uid: parsed.uid,
                    realm: parsed.realm,
                    session_uid: parsed.session_uid,
                })
            }
            ResultState::NotAuthorized => Ok(SessionValidation::default()),
            _ => Err(CredentialError::Protocol(format!(
                "session validation failed: {}",
                resp.describe()
            ))),
        }
    }

    /// Resolve the principal owning an SSO session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Validation`] for an empty token, an
    /// invalid session, or a session without an owner.
    pub async fn resolve_owner(&self, sso_token: &str) -> Result<String> {
        if sso_token.is_empty() {
            return Err(CredentialError::Validation("SSO token is empty".to_string()));
        }

        let validation = self.validate(sso_token).await?;
        if !validation.valid {
            return Err(CredentialError::Validation(
                "SSO session is not valid".to_string(),
            ));
        }

        validation
            .uid
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| {
                CredentialError::Validation("owner is empty for the SSO session".to_string())
            })
    }
}

// ---------------------------------------------------------------------------
// SessionCredentialManager
// ---------------------------------------------------------------------------

/// Keeps a validated administrative SSO session in the credential store.
#[derive(Debug, Clone)]
pub struct SessionCredentialManager {
    lookup: CredentialLookup,
    api: SessionApi,
    locks: Arc<KeyedLocks>,
    admin_user: String,
    admin_password: String,
    category: String,
}

impl SessionCredentialManager {
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] if the admin account or the
    /// session category is not configured.
    pub fn new(
        lookup: CredentialLookup,
        authz: Arc<dyn AuthorizationServerClient>,
        config: &Config,
        locks: Arc<KeyedLocks>,
    ) -> Result<Self> {
        let admin = &config.authorization_server.admin;
        if admin.user.is_empty() || admin.password.is_empty() {
            return Err(CredentialError::Config(
                "admin user and password are required for SSO sessions".to_string(),
            ));
        }
        if config.credentials.sso_category.is_empty() {
            return Err(CredentialError::Config(
                "credentials.sso_category cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            lookup,
            api: SessionApi::new(authz, config.authorization_server.clone()),
            locks,
            admin_user: admin.user.clone(),
            admin_password: admin.password.clone(),
            category: config.credentials.sso_category.clone(),
        })
    }

    /// Return a valid admin session, validating the stored one or creating a
    /// new one.
    ///
    /// # Errors
    ///
    /// Store and authorization server failures end the attempt and are
    /// returned unchanged; nothing is retried.
    pub async fn admin_session(&self) -> Result<Credential<SessionPayload>> {
        let owner = self.admin_user.as_str();
        let _guard = self.locks.acquire(owner, &self.category).await;

        let Some(uid) = self.lookup.find_credential_id(owner, &self.category).await? else {
            return self.recreate(None).await;
        };

        let stored = match self.lookup.collection().read::<SessionPayload>(&uid).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::debug!(uid = %uid, "Session credential vanished before read");
                return self.recreate(None).await;
            }
            Err(CredentialError::Serialization(e)) => {
                tracing::warn!(uid = %uid, error = %e, "Stored session payload is malformed");
                return self.recreate(Some(uid)).await;
            }
            Err(e) => return Err(e),
        };

        if stored.payload.token_id.is_empty() {
            tracing::warn!(uid = %uid, "Stored session has no token id");
            return self.recreate(Some(uid)).await;
        }

        let validation = self.api.validate(&stored.payload.token_id).await?;
        if validation.valid {
            tracing::debug!(uid = %uid, "Stored admin session is valid");
            metrics::record_cache_hit(&self.category);
            return Ok(stored);
        }

        tracing::info!(uid = %uid, "Stored admin session is no longer valid");
        self.recreate(Some(uid)).await
    }

    async fn recreate(&self, existing: Option<String>) -> Result<Credential<SessionPayload>> {
        let payload = self
            .api
            .authenticate(&self.admin_user, &self.admin_password)
            .await?;
        let collection = self.lookup.collection();

        let credential = match existing {
            Some(uid) => {
                let credential = Credential {
                    uid,
                    owner: self.admin_user.clone(),
                    category: self.category.clone(),
                    payload,
                };
                collection.replace(&credential).await?;
                tracing::info!(uid = %credential.uid, "Replaced admin session credential");
                credential
            }
            None => {
                let uid = collection
                    .create(&self.admin_user, &self.category, &payload)
                    .await?;
                tracing::info!(uid = %uid, "Created admin session credential");
                Credential {
                    uid,
                    owner: self.admin_user.clone(),
                    category: self.category.clone(),
                    payload,
                }
            }
        };

        metrics::record_created(&self.category);
        Ok(credential)
    }
}
