//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Threads incoming email into helpdesk cases.
#[derive(Debug, Parser)]
#[command(name = "threadline", version, about)]
pub struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the default settings file if none exists.
    Init,
    /// Pull, sweep and dispatch on their intervals until interrupted.
    Run,
    /// Pull every incoming mailbox once.
    Pull {
        /// Pull all accounts concurrently.
        #[arg(long)]
        parallel: bool,
    },
    /// Queue alerts for threads nobody answered.
    Notify,
    /// Send one batch of queued mail.
    Dispatch,
    /// Manage accounts.
    #[command(subcommand)]
    Accounts(AccountsCommand),
    /// List the registered case kinds.
    Kinds,
}

/// Account management.
#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List stored accounts.
    List,
    /// Create or update accounts from a JSON file (one object or an array).
    Import {
        /// JSON file to read.
        file: PathBuf,
        /// Save without logging in to the servers.
        #[arg(long)]
        skip_check: bool,
    },
    /// Log in to an account's servers without touching mail.
    Check {
        /// Account id.
        id: i64,
    },
    /// Delete an account; its conversations are kept.
    Delete {
        /// Account id.
        id: i64,
    },
}
