// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telefetch - multi-account chat file auto-download scheduler.
//!
//! This is the command-line entry point for checking configuration and
//! inspecting stored subscriptions.

mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

use telefetch_config::{ConfigError, TelefetchConfig};

/// Telefetch - multi-account chat file auto-download scheduler.
#[derive(Parser, Debug)]
#[command(name = "telefetch", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage Telefetch configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show the subscriptions in a stored autoDownload blob.
    Subscriptions {
        /// File holding the JSON blob.
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate the configuration and report every problem.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

fn load(path: Option<&PathBuf>) -> Result<TelefetchConfig, Vec<ConfigError>> {
    match path {
        Some(path) => telefetch_config::load_and_validate_path(path),
        None => telefetch_config::load_and_validate(),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("telefetch={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            telefetch_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.level);
    debug!(command = ?cli.command, "telefetch starting");

    match cli.command {
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!("configuration ok");
            ExitCode::SUCCESS
        }
        Some(Commands::Config {
            action: ConfigAction::Show,
        }) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("telefetch: cannot render configuration: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::Subscriptions { path }) => match inspect::read_blob(&path) {
            Ok(stored) => {
                print!("{}", inspect::render(&stored));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("telefetch: {e}");
                ExitCode::FAILURE
            }
        },
        None => {
            println!("telefetch: use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}
