//! CLI argument definitions using clap

use clap::{Parser, Subcommand};

use crate::config::SecretString;

/// Default UID substituted for `{{UID}}` placeholders in request URLs
pub const DEFAULT_UID: &str = "M-AL9A-7EY3-075D";

#[derive(Parser, Debug)]
#[command(
    name = "lpa-fixtures",
    version,
    about = "Test fixtures client for the LPA store API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send an authenticated request to the store and check the response status
    Request {
        /// HTTP method (GET, POST, PUT, ...)
        method: String,

        /// Target URL; any `{{UID}}` placeholder is substituted
        url: String,

        /// Request body
        body: Option<String>,

        /// Expected response status code
        #[arg(long, default_value_t = 200)]
        expected_status: u16,

        /// UID substituted into the URL
        #[arg(long, default_value = DEFAULT_UID)]
        uid: String,
    },

    /// Mint a bearer token and print it
    Token {
        /// Token subject; defaults to the fixed service identity
        #[arg(long)]
        sub: Option<String>,

        /// Validity in seconds, forward from now
        #[arg(long, default_value_t = 300)]
        ttl: u64,

        /// Seconds to backdate the issued-at claim
        #[arg(long, default_value_t = 0)]
        backdate: u64,

        /// Signing secret
        #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
        secret: SecretString,
    },
}
