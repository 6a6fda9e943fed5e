/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `session` -- Obtain an administrative SSO session
- `pat`     -- Obtain a protection API token
- `lookup`  -- Resolve a stored credential id

Each handler prints its result to stdout as pretty JSON.
*/

use crate::credentials::CredentialServices;
use crate::error::Result;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// Admin session command handler
pub mod session {
    //! Administrative SSO session handler.

    use super::*;

    /// Print a valid admin session, creating one if needed
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be validated or created
    pub async fn run_admin_session(services: &CredentialServices) -> Result<()> {
        let credential = services.sessions.admin_session().await?;
        tracing::info!(uid = %credential.uid, "Admin session ready");
        print_json(&credential)
    }
}

// Protection API token command handler
pub mod pat {
    //! Protection API token handler.

    use super::*;
    use crate::credentials::PatSubject;

    /// Print a valid PAT for an owner or an SSO session
    ///
    /// # Arguments
    ///
    /// * `services` - Credential services
    /// * `owner` - Owner of an existing token
    /// * `sso_token` - SSO token of the owner; takes precedence over `owner`
    ///
    /// # Errors
    ///
    /// Returns error if no valid token exists and none can be created
    pub async fn run_pat(
        services: &CredentialServices,
        owner: Option<String>,
        sso_token: Option<String>,
    ) -> Result<()> {
        let subject = match (sso_token, owner) {
            (Some(token), _) => PatSubject::SsoToken(token),
            (None, Some(owner)) => PatSubject::Owner(owner),
            (None, None) => PatSubject::Owner(String::new()),
        };
        let credential = services.tokens.read(&subject).await?;
        tracing::info!(uid = %credential.uid, owner = %credential.owner, "Protection API token ready");
        print_json(&credential)
    }
}

// Credential lookup command handler
pub mod lookup {
    //! Credential lookup handler.

    use super::*;
    use serde_json::json;

    /// Print the id of the credential stored for `(owner, category)`
    ///
    /// Duplicate records found along the way are removed.
    pub async fn run_lookup(services: &CredentialServices, owner: &str, category: &str) -> Result<()> {
        let uid = services.lookup.find_credential_id(owner, category).await?;
        print_json(&json!({
            "owner": owner,
            "category": category,
            "uid": uid,
        }))
    }
}
