//! Command-line interface definition for umacred
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to obtain admin sessions and protection API tokens
//! and to inspect the credential store.

use clap::{ArgGroup, Parser, Subcommand};

/// umacred - credential lifecycle manager for an UMA resource server
///
/// Acquires, validates, refreshes and caches the SSO sessions and
/// protection API tokens a resource server holds against its
/// authorization server.
#[derive(Parser, Debug, Clone)]
#[command(name = "umacred")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for umacred
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Obtain a valid administrative SSO session
    AdminSession,

    /// Obtain a valid protection API token
    #[command(group(ArgGroup::new("subject").required(true).args(["owner", "sso_token"])))]
    Pat {
        /// Owner of an existing token (cannot create a new one)
        #[arg(long)]
        owner: Option<String>,

        /// SSO token of the owner (creates a token when none is stored)
        #[arg(long, env = "UMACRED_SSO_TOKEN", hide_env_values = true)]
        sso_token: Option<String>,
    },

    /// Look up the stored credential id for an owner and category
    Lookup {
        /// Credential owner
        #[arg(long)]
        owner: String,

        /// Credential category
        #[arg(long)]
        category: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
