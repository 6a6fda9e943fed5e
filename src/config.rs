//! Configuration management for umacred
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! The configuration covers the authorization server connection and paths,
//! the administrative account, the OAuth2 client registered for the resource
//! server, the credential category identifiers, the document store location
//! and logging.

use crate::error::{CredentialError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for umacred
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Authorization server connection, endpoints and administrative account
    #[serde(default)]
    pub authorization_server: AuthorizationServerConfig,

    /// OAuth2 client registered for this resource server
    #[serde(default)]
    pub client: ClientConfig,

    /// Credential category identifiers
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Credential document store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Authorization server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerConfig {
    /// Base URL every configured path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the SSO session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Request timeout for authorization server calls (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Administrative account used for the proxy admin SSO session
    #[serde(default)]
    pub admin: AdminConfig,

    /// Authentication endpoint
    #[serde(default)]
    pub authenticate: AuthenticateConfig,

    /// Session endpoint
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// OAuth2 endpoints
    #[serde(default)]
    pub oauth2: OAuth2EndpointsConfig,
}

fn default_base_url() -> String {
    "http://localhost:8080/openam".to_string()
}

fn default_cookie_name() -> String {
    "iPlanetDirectoryPro".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for AuthorizationServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_name: default_cookie_name(),
            timeout_seconds: default_timeout_seconds(),
            admin: AdminConfig::default(),
            authenticate: AuthenticateConfig::default(),
            sessions: SessionsConfig::default(),
            oauth2: OAuth2EndpointsConfig::default(),
        }
    }
}

/// Administrative account credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Administrative user id
    #[serde(default = "default_admin_user")]
    pub user: String,

    /// Administrative password
    #[serde(default)]
    pub password: String,
}

fn default_admin_user() -> String {
    "amadmin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            user: default_admin_user(),
            password: String::new(),
        }
    }
}

/// Authentication endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateConfig {
    /// Path of the authenticate endpoint
    #[serde(default = "default_authenticate_path")]
    pub path: String,

    /// `Accept-API-Version` header value
    #[serde(default = "default_authenticate_accept")]
    pub accept_api_version: String,

    /// Header carrying the user id
    #[serde(default = "default_user_header")]
    pub user_header: String,

    /// Header carrying the password
    #[serde(default = "default_password_header")]
    pub password_header: String,
}

fn default_authenticate_path() -> String {
    "json/realms/root/authenticate".to_string()
}

fn default_authenticate_accept() -> String {
    "resource=2.0, protocol=1.0".to_string()
}

fn default_user_header() -> String {
    "X-OpenAM-Username".to_string()
}

fn default_password_header() -> String {
    "X-OpenAM-Password".to_string()
}

impl Default for AuthenticateConfig {
    fn default() -> Self {
        Self {
            path: default_authenticate_path(),
            accept_api_version: default_authenticate_accept(),
            user_header: default_user_header(),
            password_header: default_password_header(),
        }
    }
}

/// Session endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Path of the sessions endpoint
    #[serde(default = "default_sessions_path")]
    pub path: String,

    /// `Accept-API-Version` header value
    #[serde(default = "default_sessions_accept")]
    pub accept_api_version: String,
}

fn default_sessions_path() -> String {
    "json/realms/root/sessions".to_string()
}

fn default_sessions_accept() -> String {
    "resource=2.1, protocol=1.0".to_string()
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            path: default_sessions_path(),
            accept_api_version: default_sessions_accept(),
        }
    }
}

/// OAuth2 endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2EndpointsConfig {
    /// Path of the authorize endpoint
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,

    /// `Accept-API-Version` header value for authorize and code exchange
    #[serde(default = "default_oauth2_accept")]
    pub authorize_accept_api_version: String,

    /// Path of the token endpoint
    #[serde(default = "default_access_token_path")]
    pub access_token_path: String,

    /// `Accept-API-Version` header value for refresh
    #[serde(default = "default_oauth2_accept")]
    pub access_token_accept_api_version: String,

    /// Path of the token introspection endpoint
    #[serde(default = "default_tokeninfo_path")]
    pub tokeninfo_path: String,
}

fn default_authorize_path() -> String {
    "oauth2/realms/root/authorize".to_string()
}

fn default_access_token_path() -> String {
    "oauth2/realms/root/access_token".to_string()
}

fn default_tokeninfo_path() -> String {
    "oauth2/realms/root/tokeninfo".to_string()
}

fn default_oauth2_accept() -> String {
    "resource=2.0, protocol=1.0".to_string()
}

impl Default for OAuth2EndpointsConfig {
    fn default() -> Self {
        Self {
            authorize_path: default_authorize_path(),
            authorize_accept_api_version: default_oauth2_accept(),
            access_token_path: default_access_token_path(),
            access_token_accept_api_version: default_oauth2_accept(),
            tokeninfo_path: default_tokeninfo_path(),
        }
    }
}

/// OAuth2 client registered for the resource server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// OAuth2 `client_id`
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// OAuth2 `client_secret`
    #[serde(default)]
    pub client_secret: String,

    /// OAuth2 `redirect_uri` registered for the client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

fn default_client_id() -> String {
    "UMA-Resource-Server".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:8090/resource-server/redirect".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

/// Credential category identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Category of administrative SSO session credentials
    #[serde(default = "default_sso_category")]
    pub sso_category: String,

    /// Category of protection API token credentials
    #[serde(default = "default_pat_category")]
    pub pat_category: String,
}

fn default_sso_category() -> String {
    "sso_session".to_string()
}

fn default_pat_category() -> String {
    "uma_pat".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            sso_category: default_sso_category(),
            pat_category: default_pat_category(),
        }
    }
}

/// Credential document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection holding credential documents
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Optional SQLite file path; the platform data directory is used when
    /// unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_database() -> String {
    "resource-server".to_string()
}

fn default_collection() -> String {
    "credentials".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            collection: default_collection(),
            path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON formatted log lines
    #[serde(default)]
    pub json_format: bool,

    /// Optional file receiving a copy of every log line
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "umacred=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used and a warning is
    /// logged.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CredentialError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CredentialError::Config(format!("Failed to parse config: {}", e)))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("UMACRED_AS_BASE_URL") {
            self.authorization_server.base_url = base_url;
        }

        if let Ok(user) = std::env::var("UMACRED_ADMIN_USER") {
            self.authorization_server.admin.user = user;
        }

        if let Ok(password) = std::env::var("UMACRED_ADMIN_PASSWORD") {
            self.authorization_server.admin.password = password;
        }

        if let Ok(client_id) = std::env::var("UMACRED_CLIENT_ID") {
            self.client.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("UMACRED_CLIENT_SECRET") {
            self.client.client_secret = client_secret;
        }

        if let Ok(redirect_uri) = std::env::var("UMACRED_REDIRECT_URI") {
            self.client.redirect_uri = redirect_uri;
        }

        if let Ok(store_path) = std::env::var("UMACRED_STORE_PATH") {
            tracing::debug!(store_path = %store_path, "Env override: UMACRED_STORE_PATH");
            self.store.path = Some(PathBuf::from(store_path));
        }

        if let Ok(level) = std::env::var("UMACRED_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("UMACRED_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => {
                    tracing::warn!("Invalid value for UMACRED_JSON_LOGS: {}", json_logs);
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "umacred=debug".to_string();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let server = &self.authorization_server;

        if server.base_url.trim().is_empty() {
            return Err(CredentialError::Config(
                "authorization_server.base_url cannot be empty".to_string(),
            ));
        }

        if url::Url::parse(&server.base_url).is_err() {
            return Err(CredentialError::Config(format!(
                "authorization_server.base_url is not a valid URL: {}",
                server.base_url
            )));
        }

        if server.timeout_seconds == 0 {
            return Err(CredentialError::Config(
                "authorization_server.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if server.cookie_name.is_empty() {
            return Err(CredentialError::Config(
                "authorization_server.cookie_name cannot be empty".to_string(),
            ));
        }

        if server.admin.user.is_empty() || server.admin.password.is_empty() {
            return Err(CredentialError::Config(
                "authorization_server.admin user and password are required".to_string(),
            ));
        }

        if self.client.client_id.is_empty() {
            return Err(CredentialError::Config(
                "client.client_id cannot be empty".to_string(),
            ));
        }

        if self.client.redirect_uri.is_empty() {
            return Err(CredentialError::Config(
                "client.redirect_uri cannot be empty".to_string(),
            ));
        }

        let categories = &self.credentials;
        if categories.sso_category.is_empty() || categories.pat_category.is_empty() {
            return Err(CredentialError::Config(
                "credential categories cannot be empty".to_string(),
            ));
        }

        if categories.sso_category == categories.pat_category {
            return Err(CredentialError::Config(format!(
                "credential categories must differ, both are '{}'",
                categories.sso_category
            )));
        }

        if self.store.database.is_empty() || self.store.collection.is_empty() {
            return Err(CredentialError::Config(
                "store.database and store.collection cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
