//! Command-line interface for flightdesk.
//!
//! This module provides the CLI structure for the `fdesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FlightsCommand, OutputFormat, RunCommand, SearchCommand, UsersCommand,
};

use crate::logging::Verbosity;

/// fdesk - Airline booking desk
///
/// Search and book flights, maintain the schedule, and manage users from an
/// interactive console.
#[derive(Debug, Parser)]
#[command(name = "fdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the interactive booking console
    Run(RunCommand),

    /// Inspect the flight schedule
    #[command(subcommand)]
    Flights(FlightsCommand),

    /// Inspect registered users
    #[command(subcommand)]
    Users(UsersCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from_count(self.verbose)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "fdesk");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["fdesk", "run"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fdesk", "-v", "run"]).verbosity(), Verbosity::Info);
        assert_eq!(parse(&["fdesk", "-vv", "run"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["fdesk", "-vvv", "run"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["fdesk", "-q", "-v", "run"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_run() {
        let cli = parse(&["fdesk", "run", "--no-seed", "--in-memory"]);
        match cli.command {
            Command::Run(run) => {
                assert!(run.no_seed);
                assert!(run.in_memory);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_flights_list_format() {
        let cli = parse(&["fdesk", "flights", "list", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Flights(FlightsCommand::List {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_parse_flights_search() {
        let cli = parse(&[
            "fdesk",
            "flights",
            "search",
            "--origin",
            "Lahore",
            "--date",
            "2024-12-15",
        ]);
        match cli.command {
            Command::Flights(FlightsCommand::Search(search)) => {
                assert_eq!(search.origin.as_deref(), Some("Lahore"));
                assert_eq!(
                    search.date,
                    chrono::NaiveDate::from_ymd_opt(2024, 12, 15)
                );
                assert_eq!(search.format, OutputFormat::Table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_flights_search_rejects_bad_date() {
        let result = Cli::try_parse_from(["fdesk", "flights", "search", "--date", "15/12/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_users_list() {
        let cli = parse(&["fdesk", "users", "list", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Users(UsersCommand::List { json: true })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fdesk", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["fdesk"]).is_err());
    }
}
