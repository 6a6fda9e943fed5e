//! Credential payloads and request subjects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of an administrative SSO session credential.
///
/// Field names follow the authorization server's authenticate response so
/// the response body deserialises directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// SSO session identifier
    #[serde(rename = "tokenId")]
    pub token_id: String,

    /// Post-login URL reported by the server
    #[serde(rename = "successUrl", default)]
    pub success_url: String,

    /// Realm the session belongs to
    #[serde(default)]
    pub realm: String,
}

/// Payload of a protection API token (PAT) credential.
///
/// Any additional fields the token endpoint returns, such as `id_token`,
/// are kept in [`extra`](Self::extra) and persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Bearer access token
    #[serde(default)]
    pub access_token: String,

    /// Refresh token, when the server issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Token type, normally `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime in seconds as reported at issue time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenPayload {
    /// Merge a refresh grant response into this payload.
    ///
    /// The access token is always replaced. Optional fields are replaced
    /// only when the refresh response carries them, so a server that does
    /// not rotate refresh tokens leaves the stored one in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::credentials::TokenPayload;
    /// use serde_json::json;
    ///
    /// let mut stored: TokenPayload = serde_json::from_value(json!({
    ///     "access_token": "old", "refresh_token": "r1", "scope": "uma_protection"
    /// })).unwrap();
    /// let refreshed: TokenPayload = serde_json::from_value(json!({
    ///     "access_token": "new", "expires_in": 3599
    /// })).unwrap();
    ///
    /// stored.apply_refresh(refreshed);
    /// assert_eq!(stored.access_token, "new");
    /// assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
    /// assert_eq!(stored.expires_in, Some(3599));
    /// ```
    pub fn apply_refresh(&mut self, refreshed: TokenPayload) {
        self.access_token = refreshed.access_token;
        if refreshed.refresh_token.is_some() {
            self.refresh_token = refreshed.refresh_token;
        }
        if refreshed.scope.is_some() {
            self.scope = refreshed.scope;
        }
        if refreshed.token_type.is_some() {
            self.token_type = refreshed.token_type;
        }
        if refreshed.expires_in.is_some() {
            self.expires_in = refreshed.expires_in;
        }
        self.extra.extend(refreshed.extra);
    }
}

/// Who a PAT is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatSubject {
    /// A known owner. An existing credential can be reused or refreshed but
    /// a new one cannot be created.
    Owner(String),
    /// An SSO session token. The owner is resolved from the session, and a
    /// new credential can be created through the authorization code grant.
    SsoToken(String),
}

impl PatSubject {
    /// The SSO token, if this subject carries one.
    pub fn sso_token(&self) -> Option<&str> {
        match self {
            Self::SsoToken(token) => Some(token),
            Self::Owner(_) => None,
        }
    }
}
