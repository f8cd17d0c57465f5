//! CLI command definitions for the `palaver` binary.
//!
//! Uses clap derive macros for argument parsing. Commands follow a noun-verb
//! pattern (e.g., `palaver sessions list`, `palaver tools score`).

pub mod config;
pub mod send;
pub mod sessions;
pub mod tools;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Inspect and maintain per-channel chat sessions.
#[derive(Parser)]
#[command(name = "palaver", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Channel session logs.
    #[command(alias = "session")]
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Tool relevance scoring.
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Send one message through the dispatcher using the offline echo agent.
    Send {
        /// Channel id.
        channel: String,

        /// Message text.
        text: String,

        /// Sender user id.
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List channels that have a session log.
    #[command(alias = "ls")]
    List,

    /// Print a channel's history.
    Show {
        /// Channel id.
        channel: String,

        /// Show every stored record instead of the shaped agent context.
        #[arg(long)]
        raw: bool,
    },

    /// Compact a channel's log if it is over the threshold.
    Compact {
        /// Channel id.
        channel: String,
    },

    /// Delete a channel's log.
    #[command(alias = "rm")]
    Clear {
        /// Channel id.
        channel: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ToolsAction {
    /// Show which tools would be offered for a message.
    Score {
        /// Message text to score against.
        text: String,
    },

    /// List the built-in keyword table.
    Keywords,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
}
