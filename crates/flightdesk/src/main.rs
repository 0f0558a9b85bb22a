//! `fdesk` - CLI for flightdesk
//!
//! This binary runs the interactive booking console and a few
//! non-interactive commands for inspecting the schedule, users and
//! configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use flightdesk::cli::{
    Cli, Command, ConfigCommand, FlightsCommand, OutputFormat, RunCommand, UsersCommand,
};
use flightdesk::console::{write_flight_table, Console, Session};
use flightdesk::flights::Flight;
use flightdesk::users::UserStore;
use flightdesk::{init_logging, Config, Desk};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Run(run_cmd) => handle_run(config, &run_cmd),
        Command::Flights(flights_cmd) => handle_flights(&config, &flights_cmd),
        Command::Users(users_cmd) => handle_users(&config, &users_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_run(mut config: Config, cmd: &RunCommand) -> Result<()> {
    if cmd.no_seed {
        config.schedule.seed_flights = false;
    }

    let mut desk = if cmd.in_memory {
        Desk::in_memory(&config)?
    } else {
        Desk::from_config(&config).with_context(|| {
            format!(
                "failed to open users file {}",
                config.users_file().display()
            )
        })?
    };

    let console = Console::new(io::stdin().lock(), io::stdout().lock());
    Session::new(&mut desk, console)
        .run()
        .context("console session failed")?;
    Ok(())
}

fn handle_flights(config: &Config, cmd: &FlightsCommand) -> Result<()> {
    let desk = Desk::in_memory(config)?;
    let (flights, format) = match cmd {
        FlightsCommand::List { format } => (desk.flights().iter().collect::<Vec<_>>(), *format),
        FlightsCommand::Search(search) => (desk.search(&search.query()), search.format),
    };
    print_flights(&flights, format, desk.currency())
}

fn print_flights(flights: &[&Flight], format: OutputFormat, currency: &str) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(flights)?),
        OutputFormat::Table => {
            if flights.is_empty() {
                println!("No flights found.");
            } else {
                write_flight_table(&mut io::stdout().lock(), flights, currency)?;
            }
        }
        OutputFormat::Plain => {
            for flight in flights {
                println!("{flight}");
            }
        }
    }
    Ok(())
}

fn handle_users(config: &Config, cmd: &UsersCommand) -> Result<()> {
    let path = config.users_file();
    let store = UserStore::open(&path, config.password_policy())
        .with_context(|| format!("failed to read users file {}", path.display()))?;

    match cmd {
        UsersCommand::List { json } => {
            let users = store.users();
            if *json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No users registered in {}", path.display());
            } else {
                for user in users {
                    println!("{:<30} {:<24} {}", user.email, user.name, user.role);
                }
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut value = serde_json::to_value(config)?;
                value["access"]["staff_key"] = "[REDACTED]".into();
                value["access"]["admin_key"] = "[REDACTED]".into();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Users file:         {}", config.users_file().display());
                println!();
                println!("[Airline]");
                println!("  Name:               {}", config.airline.name);
                println!("  Currency:           {}", config.airline.currency);
                println!();
                println!("[Schedule]");
                println!("  Seed flights:       {}", config.schedule.seed_flights);
                println!("  Flights:            {}", config.schedule.flights.len());
                println!();
                println!("[Policy]");
                println!(
                    "  Min password len:   {}",
                    config.policy.min_password_length
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(loaded) => println!(
                    "Configuration is valid ({} seed flights).",
                    loaded.schedule.flights.len()
                ),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
