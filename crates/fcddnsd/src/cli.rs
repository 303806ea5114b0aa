//! CLI argument definitions using clap
//!
//! Commands:
//! - fcddnsd [serve]
//! - fcddnsd token sign --domain <D> --host <H> [--slot <N>] [--ip <IP>]
//! - fcddnsd token verify <TOKEN|->

use clap::{Parser, Subcommand};

/// fcddnsd - signed-credential dynamic DNS service
#[derive(Parser, Debug)]
#[command(name = "fcddnsd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service (default). Configured through FCDDNS_* variables
    Serve,

    /// Sign or verify client credentials
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Issue a credential for one hostname slot
    Sign {
        /// Signing secret
        #[arg(long, short = 's', env = "FCDDNS_JWT_SECRET", hide_env_values = true)]
        secret: String,

        /// Zone domain, e.g. example.com
        #[arg(long)]
        domain: String,

        /// Host label within the domain, e.g. home
        #[arg(long)]
        host: String,

        /// Slot index; distinct clients sharing a hostname use distinct slots
        #[arg(long, default_value_t = 0)]
        slot: u32,

        /// Fixed target address (0.0.0.0 turns every use into a delete)
        #[arg(long)]
        ip: Option<String>,

        /// Add an expiry claim, honoured only by services enforcing expiry
        #[arg(long)]
        expires_in_days: Option<i64>,
    },

    /// Decode a credential and check its signature
    Verify {
        /// Signing secret
        #[arg(long, short = 's', env = "FCDDNS_JWT_SECRET", hide_env_values = true)]
        secret: String,

        /// Also reject expired credentials
        #[arg(long)]
        enforce_expiry: bool,

        /// The credential, or `-` to read it from stdin
        token: String,
    },
}
