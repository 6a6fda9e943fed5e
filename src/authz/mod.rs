//! Authorization server client abstraction
//!
//! The credential managers talk to the authorization server through the
//! [`AuthorizationServerClient`] trait. Requests name a path relative to the
//! server base URL plus headers, query parameters and an optional JSON or
//! urlencoded body. Responses carry a [`ResultState`] derived from the HTTP
//! status:
//!
//! | Status | State           |
//! |--------|-----------------|
//! | 2xx    | `SUCCESS`       |
//! | 3xx    | `WARNING`       |
//! | 401    | `NOTAUTHORIZED` |
//! | 404    | `NOTEXIST`      |
//! | other  | `ERROR`         |
//!
//! Implementations:
//!
//! - [`http::HttpAuthorizationServer`] -- reqwest client with redirects
//!   disabled so 3xx answers reach the caller
//! - `fake::ScriptedAuthorizationServer` -- in-process fake (cfg(test) only)

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::operation::{OperationType, ResultState};

#[cfg(test)]
pub mod fake;
pub mod http;

pub use http::HttpAuthorizationServer;

/// Request body sent to the authorization server.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// JSON body
    Json(Value),
    /// `application/x-www-form-urlencoded` body
    Form(BTreeMap<String, String>),
}

/// A request addressed to a path on the authorization server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthzRequest {
    /// Path relative to the server base URL
    pub path: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: RequestBody,
    /// Query string parameters
    pub query_params: BTreeMap<String, String>,
}

impl AuthzRequest {
    /// Create a request for `path` with no headers, parameters or body.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query string parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Set a urlencoded form body.
    pub fn form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

/// An operation submitted to the authorization server.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthzOperation {
    /// CREATE (POST), READ (GET), REPLACE (PUT) or DELETE (DELETE)
    pub kind: OperationType,
    /// The request to send
    pub request: AuthzRequest,
}

impl AuthzOperation {
    /// POST `request`.
    pub fn create(request: AuthzRequest) -> Self {
        Self {
            kind: OperationType::Create,
            request,
        }
    }

    /// GET `request`.
    pub fn read(request: AuthzRequest) -> Self {
        Self {
            kind: OperationType::Read,
            request,
        }
    }
}

/// Response from the authorization server.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthzResponse {
    /// State derived from the status code
    pub state: ResultState,
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: BTreeMap<String, String>,
    /// Response body; JSON when parseable, otherwise a string, `Null` when empty
    pub body: Value,
}

impl AuthzResponse {
    /// Build a response, lowercasing header names.
    pub fn new(
        status: u16,
        headers: impl IntoIterator<Item = (String, String)>,
        body: Value,
    ) -> Self {
        Self {
            state: state_for_status(status),
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            body,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// One-line description used in error messages.
    pub fn describe(&self) -> String {
        match &self.body {
            Value::Null => format!("{} ({})", self.state, self.status),
            Value::String(s) => format!("{} ({}): {}", self.state, self.status, s),
            other => format!("{} ({}): {}", self.state, self.status, other),
        }
    }
}

/// Map an HTTP status code to a [`ResultState`].
///
/// # Examples
///
/// ```
/// use umacred::authz::state_for_status;
/// use umacred::operation::ResultState;
///
/// assert_eq!(state_for_status(204), ResultState::Success);
/// assert_eq!(state_for_status(302), ResultState::Warning);
/// assert_eq!(state_for_status(401), ResultState::NotAuthorized);
/// assert_eq!(state_for_status(404), ResultState::NotExist);
/// assert_eq!(state_for_status(500), ResultState::Error);
/// ```
pub fn state_for_status(status: u16) -> ResultState {
    match status {
        200..=299 => ResultState::Success,
        300..=399 => ResultState::Warning,
        401 => ResultState::NotAuthorized,
        404 => ResultState::NotExist,
        _ => ResultState::Error,
    }
}

/// REST client for the authorization server.
///
/// Shared through `Arc<dyn AuthorizationServerClient>`.
#[async_trait::async_trait]
pub trait AuthorizationServerClient: Send + Sync + std::fmt::Debug {
    /// Execute one operation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CredentialError::Transport`] if the server
    /// cannot be reached and [`crate::error::CredentialError::Validation`]
    /// for operation kinds with no HTTP method. Any HTTP answer, including
    /// error statuses, is returned as an [`AuthzResponse`].
    async fn execute(&self, op: AuthzOperation) -> Result<AuthzResponse>;
}
