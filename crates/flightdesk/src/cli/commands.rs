//! CLI command definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::flights::FlightQuery;

/// Interactive console arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Start with an empty schedule instead of the configured flights
    #[arg(long)]
    pub no_seed: bool,

    /// Keep registered users in memory only; the users file is not read or written
    #[arg(long)]
    pub in_memory: bool,
}

/// Flight schedule commands.
#[derive(Debug, Subcommand)]
pub enum FlightsCommand {
    /// List every scheduled flight in departure order
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Search flights by route and date
    Search(SearchCommand),
}

/// Flight search arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Departure city
    #[arg(short, long)]
    pub origin: Option<String>,

    /// Arrival city
    #[arg(short = 't', long)]
    pub destination: Option<String>,

    /// Departure date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl SearchCommand {
    /// Build the index query from the arguments.
    #[must_use]
    pub fn query(&self) -> FlightQuery {
        FlightQuery {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            date: self.date,
        }
    }
}

/// User table commands.
#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List registered users (passwords are never shown)
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per flight
    Plain,
    /// Aligned columns
    #[default]
    Table,
    /// JSON output
    Json,
}
