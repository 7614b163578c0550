//! CLI module - Command-line interface for courtcase
//!
//! This module provides a structured CLI using clap for argument parsing.

pub mod commands;

use clap::{Parser, Subcommand};

/// Courtcase - case status lookups against the eCourts search page
#[derive(Parser)]
#[command(name = "courtcase")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API (default)
    #[command(alias = "daemon")]
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Look up one case from the terminal
    #[command(alias = "f")]
    Fetch {
        /// Case type name, e.g. "Writ Petition"
        #[arg(long, default_value = "Criminal Appeal")]
        case_type: String,
        /// Case number
        case_number: String,
        /// Filing year
        filing_year: String,
    },

    /// Show recently recorded lookups
    #[command(alias = "h")]
    History {
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: u64,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
