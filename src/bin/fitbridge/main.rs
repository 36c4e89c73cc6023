// ABOUTME: fitbridge CLI - repairs MyWhoosh activities and uploads them to Garmin Connect
// ABOUTME: Subcommands for batch sync, single-file repair, inspection, version lookup, and login
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Repair and upload everything from the last 30 days that has no marker
//! fitbridge sync --dir ~/Documents/MyWhoosh/Content/Data
//!
//! # Repair one file without uploading
//! fitbridge fix MyNewActivity-3.8.5.fit --output fixed.fit
//!
//! # Show identity, devices, and session averages
//! fitbridge inspect fixed.fit
//!
//! # Print the newest MyNewActivity-*.fit
//! fitbridge latest --dir ~/Documents/MyWhoosh/Content/Data
//!
//! # Log in once and cache credentials
//! fitbridge login --email me@example.com
//! ```

mod commands;
mod helpers;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fitbridge::config::SyncConfig;
use fitbridge::logging::LoggingConfig;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "fitbridge",
    version,
    about = "Repair MyWhoosh FIT activities and upload them to Garmin Connect",
    long_about = "Fills in missing session averages, clears bogus temperatures, rewrites the \
                  device identity, and uploads the result to Garmin Connect."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Repair and upload every unsynced activity in the data directory
    Sync {
        /// Activity directory (overrides `FITBRIDGE_DATA_DIR`)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Credential cache directory (overrides `FITBRIDGE_TOKEN_DIR`)
        #[arg(long)]
        token_dir: Option<PathBuf>,

        /// Login email, used when no cached session exists
        #[arg(long)]
        email: Option<String>,

        /// Login password, used when no cached session exists
        #[arg(long)]
        password: Option<String>,
    },

    /// Repair one file locally
    Fix {
        /// Source FIT file
        input: PathBuf,

        /// Destination (defaults to `<stem>_<timestamp>.fit` next to the source)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print identity, devices, and sessions of a FIT file
    Inspect {
        /// FIT file
        file: PathBuf,
    },

    /// Print the highest-version `MyNewActivity-*.fit`
    Latest {
        /// Activity directory (overrides `FITBRIDGE_DATA_DIR`)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Log in and cache fresh credentials
    Login {
        /// Login email (overrides `FITBRIDGE_EMAIL`)
        #[arg(long)]
        email: Option<String>,

        /// Login password (overrides `FITBRIDGE_PASSWORD`)
        #[arg(long)]
        password: Option<String>,

        /// Credential cache directory (overrides `FITBRIDGE_TOKEN_DIR`)
        #[arg(long)]
        token_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    logging.init()?;

    match cli.command {
        Command::Sync {
            dir,
            token_dir,
            email,
            password,
        } => {
            let mut config = SyncConfig::from_env()?;
            apply_overrides(&mut config, dir, token_dir, email, password);
            commands::connect::sync(&config)
        }
        Command::Fix { input, output } => commands::activity::fix(&input, output),
        Command::Inspect { file } => commands::activity::inspect(&file),
        Command::Latest { dir } => {
            let mut config = SyncConfig::from_env()?;
            apply_overrides(&mut config, dir, None, None, None);
            commands::activity::latest(&config)
        }
        Command::Login {
            email,
            password,
            token_dir,
        } => {
            let mut config = SyncConfig::from_env()?;
            apply_overrides(&mut config, None, token_dir, email, password);
            commands::connect::login(&config)
        }
    }
}

fn apply_overrides(
    config: &mut SyncConfig,
    dir: Option<PathBuf>,
    token_dir: Option<PathBuf>,
    email: Option<String>,
    password: Option<String>,
) {
    if dir.is_some() {
        config.data_dir = dir;
    }
    if let Some(token_dir) = token_dir {
        config.token_dir = token_dir;
    }
    if email.is_some() {
        config.email = email;
    }
    if password.is_some() {
        config.password = password;
    }
    debug!(config = ?config, "Effective configuration");
}
