//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::measure::Month;

#[derive(Parser, Debug)]
#[command(name = "gardu-monitor", version, about = "Substation load monitoring service")]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the REST API server
    #[cfg(feature = "api")]
    Serve {
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Import a monitoring workbook (.xlsx)
    Import {
        file: PathBuf,
        /// Target month, YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Export a month to .xlsx or .csv, chosen by file extension
    Export {
        file: PathBuf,
        /// Month to export, YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Create missing placeholder rows for every substation
    Normalize {
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Recompute derived metrics of every stored row
    Recompute,
    /// Print the monthly dashboard
    Dashboard {
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Browse the dashboard in the terminal
    #[cfg(feature = "tui")]
    Tui {
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Print the SHA-256 digest of a token for the `[[auth.tokens]]` config
    HashToken { token: String },
}

/// Parses `--month`, falling back to the current month.
///
/// # Errors
///
/// Returns a validation error when the value is not `YYYY-MM`.
pub fn resolve_month(raw: Option<&str>) -> Result<Month> {
    raw.map_or_else(|| Ok(Month::current()), Month::parse)
}
