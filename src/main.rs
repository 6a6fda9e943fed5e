//! umacred - credential lifecycle manager for an UMA resource server
//!
#![doc = "Main entry point for the umacred command line tool."]

use anyhow::Result;

use umacred::cli::{Cli, Commands};
use umacred::commands;
use umacred::config::Config;
use umacred::credentials::CredentialServices;
use umacred::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    init_logging(&config.logging)?;

    // Validates the configuration before opening the store and client
    let services = CredentialServices::connect(&config)?;

    match cli.command {
        Commands::AdminSession => {
            tracing::debug!("Obtaining admin session");
            commands::session::run_admin_session(&services).await?;
        }
        Commands::Pat { owner, sso_token } => {
            tracing::debug!(by_sso = sso_token.is_some(), "Obtaining protection API token");
            commands::pat::run_pat(&services, owner, sso_token).await?;
        }
        Commands::Lookup { owner, category } => {
            tracing::debug!(owner = %owner, category = %category, "Looking up credential");
            commands::lookup::run_lookup(&services, &owner, &category).await?;
        }
    }

    Ok(())
}
