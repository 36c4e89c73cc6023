// ABOUTME: Local activity commands for the fitbridge CLI
// ABOUTME: Handles fix, inspect, and latest without touching the network
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use fitbridge::config::SyncConfig;
use fitbridge::corrector::{ActivityCorrector, TracingSink};
use fitbridge::fit::ActivityFile;
use fitbridge::sync::{find_latest_version, output_file_name};
use tracing::info;

use crate::helpers::display;

/// Repair one file, writing next to the source unless an output is given
pub fn fix(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let output =
        output.unwrap_or_else(|| input.with_file_name(output_file_name(input, Local::now())));
    info!(input = %input.display(), output = %output.display(), "Fixing activity");

    let report = ActivityCorrector::default()
        .fix_file(input, &output, &mut TracingSink)
        .with_context(|| format!("Failed to fix {}", input.display()))?;

    display::print_report(&output, &report);
    Ok(())
}

/// Print what the corrector sees in a file
pub fn inspect(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let activity = ActivityFile::decode(&bytes)
        .with_context(|| format!("Failed to decode {}", file.display()))?;

    display::print_activity(file, &activity);
    Ok(())
}

/// Print the newest `MyNewActivity-*.fit` in the data directory
pub fn latest(config: &SyncConfig) -> Result<()> {
    let dir = config.require_data_dir()?;
    let latest = find_latest_version(dir)?;
    println!("{}", latest.display());
    Ok(())
}
