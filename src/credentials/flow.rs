//! OAuth2 authorization code grant for protection API tokens
//!
//! The resource server obtains a PAT on behalf of a user who holds an SSO
//! session, without a browser:
//!
//! 1. POST the authorize endpoint with the SSO token as session cookie and
//!    CSRF value and `decision=allow`. The server answers with a redirect.
//! 2. Extract `code` from the redirect `Location`.
//! 3. Exchange the code at the token endpoint for a [`TokenPayload`].
//!
//! The same endpoints serve the refresh grant and token introspection.

use std::sync::Arc;

use url::Url;

use crate::authz::{AuthorizationServerClient, AuthzOperation, AuthzRequest, AuthzResponse};
use crate::config::{AuthorizationServerConfig, ClientConfig};
use crate::error::{CredentialError, Result};
use crate::operation::ResultState;

use super::types::TokenPayload;

/// Scope requested for protection API tokens.
pub const PAT_SCOPE: &str = "uma_protection";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Extract the authorization code from a redirect `Location`.
///
/// A relative `location` is resolved against `base` first. When there is no
/// `code` parameter the error carries the `error` and `error_description`
/// parameters, if present.
///
/// # Errors
///
/// Returns [`CredentialError::Protocol`] if the location cannot be parsed
/// or carries no non-empty `code`.
///
/// # Examples
///
/// ```
/// use umacred::credentials::flow::extract_authorization_code;
/// use url::Url;
///
/// let base = Url::parse("https://as.example.com/openam").unwrap();
/// let code = extract_authorization_code("https://host/path?foo=1&code=ABC123&bar=2", &base).unwrap();
/// assert_eq!(code, "ABC123");
///
/// let err = extract_authorization_code("https://host/cb?error=access_denied", &base).unwrap_err();
/// assert!(err.to_string().contains("access_denied"));
/// ```
pub fn extract_authorization_code(location: &str, base: &Url) -> Result<String> {
    let url = base.join(location).map_err(|e| {
        CredentialError::Protocol(format!("invalid redirect location '{location}': {e}"))
    })?;

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    match code {
        Some(code) if !code.is_empty() => Ok(code),
        Some(_) => Err(CredentialError::Protocol(
            "redirect carries an empty authorization code".to_string(),
        )),
        None => {
            let mut message = "redirect has no authorization code".to_string();
            if let Some(error) = error {
                message.push_str(&format!(", error: {error}"));
            }
            if let Some(description) = description {
                message.push_str(&format!(", description: {description}"));
            }
            Err(CredentialError::Protocol(message))
        }
    }
}

/// Drives the authorization code, refresh and introspection requests.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeFlow {
    authz: Arc<dyn AuthorizationServerClient>,
    server: AuthorizationServerConfig,
    client: ClientConfig,
    base_url: Url,
}

impl AuthorizationCodeFlow {
    /// Create a flow for the configured server and client.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] if the server base URL is invalid
    /// or the client id or redirect URI is empty.
    pub fn new(
        authz: Arc<dyn AuthorizationServerClient>,
        server: AuthorizationServerConfig,
        client: ClientConfig,
    ) -> Result<Self> {
        let base_url = Url::parse(&server.base_url).map_err(|e| {
            CredentialError::Config(format!("invalid base_url '{}': {e}", server.base_url))
        })?;
        if client.client_id.is_empty() || client.redirect_uri.is_empty() {
            return Err(CredentialError::Config(
                "client_id and redirect_uri are required for the authorization code grant"
                    .to_string(),
            ));
        }

        Ok(Self {
            authz,
            server,
            client,
            base_url,
        })
    }

    /// Request an authorization code on behalf of the SSO session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Protocol`] unless the server redirects
    /// with a usable code.
    pub async fn authorize(&self, sso_token: &str) -> Result<String> {
        let oauth2 = &self.server.oauth2;
        let cookie = &self.server.cookie_name;
        let request = AuthzRequest::new(&oauth2.authorize_path)
            .header("Accept-API-Version", &oauth2.authorize_accept_api_version)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .header("Accept", "*/*")
            .header(cookie, sso_token)
            .header("Cookie", format!("{cookie}={sso_token}"))
            .form([
                ("response_type", "code"),
                ("save_consent", "off"),
                ("decision", "allow"),
                ("client_id", self.client.client_id.as_str()),
                ("redirect_uri", self.client.redirect_uri.as_str()),
                ("scope", PAT_SCOPE),
                ("csrf", sso_token),
            ]);

        let resp = self.authz.execute(AuthzOperation::create(request)).await?;
        if resp.state != ResultState::Warning {
            return Err(CredentialError::Protocol(format!(
                "authorize did not redirect: {}",
                resp.describe()
            )));
        }

        let location = resp.header("location").ok_or_else(|| {
            CredentialError::Protocol("authorize redirect has no Location header".to_string())
        })?;
        let code = extract_authorization_code(location, &self.base_url)?;
        tracing::debug!("Obtained authorization code");
        Ok(code)
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Protocol`] if the exchange is refused or
    /// the response carries no access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPayload> {
        let request = self
            .token_request(&self.server.oauth2.authorize_accept_api_version)
            .form([
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.client.redirect_uri.as_str()),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
            ]);

        let resp = self.authz.execute(AuthzOperation::create(request)).await?;
        Self::token_payload("code exchange", resp)
    }

    /// Run the refresh grant.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Protocol`] if the refresh is refused or
    /// the response carries no access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPayload> {
        let request = self
            .token_request(&self.server.oauth2.access_token_accept_api_version)
            .form([
                ("grant_type", "refresh_token"),
                ("redirect_uri", self.client.redirect_uri.as_str()),
                ("refresh_token", refresh_token),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("scope", PAT_SCOPE),
            ]);

        let resp = self.authz.execute(AuthzOperation::create(request)).await?;
        Self::token_payload("refresh", resp)
    }

    /// Introspect an access token and return the server's verdict.
    pub async fn introspect(&self, access_token: &str) -> Result<ResultState> {
        let request = AuthzRequest::new(&self.server.oauth2.tokeninfo_path)
            .header("Authorization", format!("Bearer {access_token}"));
        let resp = self.authz.execute(AuthzOperation::read(request)).await?;
        tracing::debug!(state = %resp.state, "Token introspection");
        Ok(resp.state)
    }

    fn token_request(&self, accept_api_version: &str) -> AuthzRequest {
        AuthzRequest::new(&self.server.oauth2.access_token_path)
            .header("Accept-API-Version", accept_api_version)
            .header("Content-Type", FORM_CONTENT_TYPE)
    }

    fn token_payload(step: &str, resp: AuthzResponse) -> Result<TokenPayload> {
        if !resp.state.is_success() {
            return Err(CredentialError::Protocol(format!(
                "{step} failed: {}",
                resp.describe()
            )));
        }
        let payload: TokenPayload = serde_json::from_value(resp.body).map_err(|e| {
            CredentialError::Protocol(format!("malformed {step} response: {e}"))
        })?;
        if payload.access_token.is_empty() {
            return Err(CredentialError::Protocol(format!(
                "{step} response has no 'access_token'"
            )));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::fake::ScriptedAuthorizationServer;
    use crate::authz::RequestBody;
    use serde_json::json;

    const AUTHORIZE: &str = "oauth2/realms/root/authorize";
    const TOKEN: &str = "oauth2/realms/root/access_token";

    fn base() -> Url {
        Url::parse("https://as.example.com/openam").unwrap()
    }

    fn flow(authz: Arc<ScriptedAuthorizationServer>) -> AuthorizationCodeFlow {
        AuthorizationCodeFlow::new(
            authz,
            AuthorizationServerConfig::default(),
            ClientConfig {
                client_secret: "s3cret".to_string(),
                ..ClientConfig::default()
            },
        )
        .unwrap()
    }

    fn form_of(body: &RequestBody) -> &std::collections::BTreeMap<String, String> {
        match body {
            RequestBody::Form(fields) => fields,
            other => panic!("expected form body, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_code_among_other_params() {
        let code =
            extract_authorization_code("https://host/path?foo=1&code=ABC123&bar=2", &base())
                .unwrap();
        assert_eq!(code, "ABC123");
    }

    #[test]
    fn test_extract_code_is_url_decoded() {
        let code = extract_authorization_code("https://host/cb?code=a%2Bb%3D", &base()).unwrap();
        assert_eq!(code, "a+b=");
    }

    #[test]
    fn test_extract_code_from_relative_location() {
        let code = extract_authorization_code("/redirect?code=XYZ", &base()).unwrap();
        assert_eq!(code, "XYZ");
    }

    #[test]
    fn test_missing_code_reports_error_and_description() {
        let err = extract_authorization_code(
            "https://host/cb?error=invalid_scope&error_description=Unknown%20scope",
            &base(),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, CredentialError::Protocol(_)));
        assert!(message.contains("error: invalid_scope"));
        assert!(message.contains("description: Unknown scope"));
    }

    #[test]
    fn test_missing_code_without_query() {
        let err = extract_authorization_code("https://host/cb", &base()).unwrap_err();
        assert!(err.to_string().contains("no authorization code"));
    }

    #[test]
    fn test_empty_code_is_protocol_error() {
        let err = extract_authorization_code("https://host/cb?code=", &base()).unwrap_err();
        assert!(err.to_string().contains("empty authorization code"));
    }

    #[test]
    fn test_new_requires_client_id() {
        let result = AuthorizationCodeFlow::new(
            Arc::new(ScriptedAuthorizationServer::new()),
            AuthorizationServerConfig::default(),
            ClientConfig {
                client_id: String::new(),
                ..ClientConfig::default()
            },
        );
        assert!(matches!(result, Err(CredentialError::Config(_))));
    }

    #[tokio::test]
    async fn test_authorize_sends_sso_token_as_cookie_and_csrf() {
        let authz = Arc::new(ScriptedAuthorizationServer::new());
        authz.push_with_headers(
            AUTHORIZE,
            302,
            vec![("Location", "https://rs/redirect?code=C1")],
            serde_json::Value::Null,
        );

        let code = flow(authz.clone()).authorize("SSO1").await.unwrap();
        assert_eq!(code, "C1");

        let sent = authz.requests_to(AUTHORIZE).remove(0).request;
        assert_eq!(sent.headers["iPlanetDirectoryPro"], "SSO1");
        assert_eq!(sent.headers["Cookie"], "iPlanetDirectoryPro=SSO1");
        let form = form_of(&sent.body);
        assert_eq!(form["csrf"], "SSO1");
        assert_eq!(form["decision"], "allow");
        assert_eq!(form["scope"], "uma_protection");
        assert_eq!(form["response_type"], "code");
        assert_eq!(form["save_consent"], "off");
    }

    #[tokio::test]
    async fn test_authorize_without_redirect_is_protocol_error() {
        let authz = Arc::new(ScriptedAuthorizationServer::new());
        authz.push(AUTHORIZE, 200, json!({"message": "consent page"}));
        let err = flow(authz).authorize("SSO1").await.unwrap_err();
        assert!(matches!(err, CredentialError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_refresh_form_fields() {
        let authz = Arc::new(ScriptedAuthorizationServer::new());
        authz.push(TOKEN, 200, json!({"access_token": "A2"}));

        let payload = flow(authz.clone()).refresh("R1").await.unwrap();
        assert_eq!(payload.access_token, "A2");

        let form = form_of(&authz.requests_to(TOKEN)[0].request.body).clone();
        assert_eq!(form["grant_type"], "refresh_token");
        assert_eq!(form["refresh_token"], "R1");
        assert_eq!(form["client_secret"], "s3cret");
        assert_eq!(form["scope"], "uma_protection");
    }

    #[tokio::test]
    async fn test_exchange_rejects_missing_access_token() {
        let authz = Arc::new(ScriptedAuthorizationServer::new());
        authz.push(TOKEN, 200, json!({"token_type": "Bearer"}));
        let err = flow(authz).exchange_code("C1").await.unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }
}
