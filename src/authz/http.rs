//! HTTP client for the authorization server
//!
//! Maps operation kinds to HTTP methods and status codes to result states.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use super::{AuthorizationServerClient, AuthzOperation, AuthzResponse, RequestBody};
use crate::config::AuthorizationServerConfig;
use crate::error::{CredentialError, Result};
use crate::operation::OperationType;

/// reqwest-backed [`AuthorizationServerClient`].
///
/// Redirects are never followed: the authorization endpoint answers with a
/// redirect whose `Location` carries the authorization code, and that
/// answer must reach the caller as a `WARNING` response.
#[derive(Debug, Clone)]
pub struct HttpAuthorizationServer {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpAuthorizationServer {
    /// Build a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] for an invalid base URL and
    /// [`CredentialError::Http`] if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::authz::HttpAuthorizationServer;
    /// use umacred::config::AuthorizationServerConfig;
    ///
    /// let config = AuthorizationServerConfig::default();
    /// let client = HttpAuthorizationServer::new(&config).unwrap();
    /// assert_eq!(client.base_url().as_str(), "http://localhost:8080/openam");
    /// ```
    pub fn new(config: &AuthorizationServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CredentialError::Config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Base URL every request path is joined to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| CredentialError::Validation(format!("invalid request path '{path}': {e}")))
    }
}

fn method_for(kind: OperationType) -> Result<Method> {
    match kind {
        OperationType::Create => Ok(Method::POST),
        OperationType::Read => Ok(Method::GET),
        OperationType::Replace => Ok(Method::PUT),
        OperationType::Delete => Ok(Method::DELETE),
        OperationType::Search => Err(CredentialError::Validation(
            "SEARCH is not supported by the authorization server".to_string(),
        )),
    }
}

#[async_trait::async_trait]
impl AuthorizationServerClient for HttpAuthorizationServer {
    async fn execute(&self, op: AuthzOperation) -> Result<AuthzResponse> {
        let method = method_for(op.kind)?;
        let request = op.request;
        let url = self.endpoint(&request.path)?;

        tracing::debug!(method = %method, path = %request.path, "Authorization server request");

        let mut builder = self.http.request(method.clone(), url);
        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let resp = builder.send().await.map_err(|e| {
            CredentialError::Transport(format!("{method} {} failed: {e}", request.path))
        })?;

        let status = resp.status().as_u16();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = resp.text().await.map_err(|e| {
            CredentialError::Transport(format!(
                "failed to read response from {}: {e}",
                request.path
            ))
        })?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(path = %request.path, status, "Authorization server response");

        Ok(AuthzResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{AuthzOperation, AuthzRequest};

    fn client(base: &str) -> HttpAuthorizationServer {
        let config = AuthorizationServerConfig {
            base_url: base.to_string(),
            ..AuthorizationServerConfig::default()
        };
        HttpAuthorizationServer::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let c = client("https://as.example.com/openam/");
        let url = c.endpoint("/json/realms/root/authenticate").unwrap();
        assert_eq!(
            url.as_str(),
            "https://as.example.com/openam/json/realms/root/authenticate"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let config = AuthorizationServerConfig {
            base_url: "::not-a-url".to_string(),
            ..AuthorizationServerConfig::default()
        };
        assert!(matches!(
            HttpAuthorizationServer::new(&config),
            Err(CredentialError::Config(_))
        ));
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(method_for(OperationType::Create).unwrap(), Method::POST);
        assert_eq!(method_for(OperationType::Read).unwrap(), Method::GET);
        assert_eq!(method_for(OperationType::Replace).unwrap(), Method::PUT);
        assert_eq!(method_for(OperationType::Delete).unwrap(), Method::DELETE);
    }

    #[tokio::test]
    async fn test_search_is_rejected_before_sending() {
        let c = client("http://127.0.0.1:9");
        let op = AuthzOperation {
            kind: OperationType::Search,
            request: AuthzRequest::new("anything"),
        };
        assert!(matches!(
            c.execute(op).await,
            Err(CredentialError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let c = client("http://127.0.0.1:9");
        let err = c
            .execute(AuthzOperation::read(AuthzRequest::new("tokeninfo")))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
