//! Error types for umacred
//!
//! This module defines the error type threaded through every step of the
//! credential state machines, using `thiserror` for ergonomic error handling.
//!
//! The first four variants form the credential taxonomy: validation of
//! caller input, transport failures talking to the store or the
//! authorization server, protocol failures when the authorization server
//! answers with an unexpected shape, and state inconsistencies found in the
//! credential collection.

use thiserror::Error;

/// Main error type for umacred operations
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Missing or malformed required input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store or authorization server unreachable, or a malformed response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The authorization server answered with an unexpected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The credential collection holds records that violate its invariants
    #[error("State inconsistency: {0}")]
    StateInconsistency(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential store backend errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CredentialError {
    /// Returns `true` for failures reaching the store or the authorization
    /// server, including credential store backend failures.
    ///
    /// These are the failures a caller may reasonably retry; nothing inside
    /// the crate retries them.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::error::CredentialError;
    ///
    /// assert!(CredentialError::Transport("connection refused".into()).is_transport());
    /// assert!(!CredentialError::Protocol("no code".into()).is_transport());
    /// ```
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Storage(_) | Self::Http(_) | Self::Io(_)
        )
    }
}

impl From<rusqlite::Error> for CredentialError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for umacred operations
pub type Result<T> = std::result::Result<T, CredentialError>;
