//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::config::RawOptions;
use crate::domain::{AdminToken, TokenField};

/// Admin CLI for a remote access-token service: create, update, inspect and revoke tokens
#[derive(Parser, Debug)]
#[command(name = "tokenadm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Request timeout in seconds
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors and requested data
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Endpoint selection flags; each falls back to a `TOKENADM_*` env var.
#[derive(Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// Base URL of the token service
    #[arg(
        long,
        visible_alias = "url",
        global = true,
        env = "TOKENADM_ENDPOINT",
        value_hint = ValueHint::Url
    )]
    pub endpoint: Option<String>,

    /// Bearer credential for admin operations
    #[arg(long, global = true, env = "TOKENADM_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Path of the auth endpoint (default: /auth)
    #[arg(long, global = true, env = "TOKENADM_AUTH_PATH")]
    pub auth_path: Option<String>,

    /// Path of the token admin collection (default: /admin/tokens)
    #[arg(long, global = true, env = "TOKENADM_ADMIN_PATH")]
    pub admin_path: Option<String>,

    /// Directory holding config.toml or config.json
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    /// Named profile from the config file
    #[arg(long, global = true)]
    pub profile: Option<String>,
}

impl EndpointArgs {
    pub fn to_raw_options(&self) -> RawOptions {
        RawOptions {
            endpoint: self.endpoint.clone(),
            admin_token: self.admin_token.as_deref().map(AdminToken::new),
            auth_path: self.auth_path.clone(),
            admin_path: self.admin_path.clone(),
            config_dir: self.config_dir.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Check the admin credential
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Issue a new token
    Create {
        /// Token id (generated when omitted)
        #[arg(long)]
        token_id: Option<String>,
        /// Owner of the token
        #[arg(long)]
        owner: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
        /// PHC-format hash of the token secret
        #[arg(long)]
        secret_phc: String,
        /// Expiry: RFC 3339, YYYY-MM-DD or epoch seconds
        #[arg(long)]
        expires_at: Option<String>,
    },

    /// Change fields of an existing token
    Update {
        /// Token to update
        #[arg(long)]
        token_id: String,
        /// New owner
        #[arg(long)]
        owner: Option<String>,
        /// Grant admin rights
        #[arg(long, action = ArgAction::SetTrue, overrides_with = "no_admin")]
        admin: bool,
        /// Remove admin rights
        #[arg(long, action = ArgAction::SetTrue, overrides_with = "admin")]
        no_admin: bool,
        /// New PHC-format secret hash
        #[arg(long)]
        secret_phc: Option<String>,
        /// New expiry, or `never` to clear it
        #[arg(long)]
        expires_at: Option<String>,
    },

    /// Show one token
    Get {
        #[arg(long)]
        token_id: String,
        /// Print only this field
        #[arg(long)]
        field: Option<TokenField>,
    },

    /// List tokens
    List,

    /// Revoke a token
    Revoke {
        #[arg(long)]
        token_id: String,
    },
}

/// Fold a `--flag`/`--no-flag` pair: the last one given wins, neither means unchanged.
pub fn flag_pair(set: bool, unset: bool) -> Option<bool> {
    match (set, unset) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Verify the admin token against the auth endpoint
    Check,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective endpoint config (token redacted)
    Show,
    /// Show the config file location
    Path,
    /// Write a template config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
