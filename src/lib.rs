//! umacred - credential lifecycle manager for an UMA resource server
//!
//! This library acquires, caches, validates, refreshes and evicts the
//! administrative SSO sessions and OAuth2 protection API tokens a resource
//! server holds against an external authorization server, keeping at most
//! one stored credential per `(owner, category)`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `credentials`: lookup, session and token managers, per-key locking
//! - `store`: credential document store contract and backends
//! - `authz`: authorization server client contract and HTTP client
//! - `operation`: operation and result-state vocabulary
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `logging`: tracing subscriber setup
//! - `cli`, `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use umacred::{Config, CredentialServices, PatSubject};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.authorization_server.admin.password = "password".to_string();
//!
//!     let services = CredentialServices::connect(&config)?;
//!     let pat = services
//!         .tokens
//!         .read(&PatSubject::SsoToken("AQIC5w...".to_string()))
//!         .await?;
//!     println!("{}", pat.payload.access_token);
//!     Ok(())
//! }
//! ```

pub mod authz;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod operation;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{
    CredentialLookup, CredentialServices, PatSubject, SessionCredentialManager, SessionPayload,
    TokenCredentialManager, TokenPayload,
};
pub use error::{CredentialError, Result};
pub use operation::{OperationType, ResultState};
pub use store::Credential;
