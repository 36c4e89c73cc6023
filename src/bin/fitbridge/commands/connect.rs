// ABOUTME: Garmin Connect commands for the fitbridge CLI
// ABOUTME: Handles batch sync and explicit login against the credential cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use fitbridge::config::environment::vars;
use fitbridge::config::SyncConfig;
use fitbridge::connect::{FileCredentialCache, HttpTransport, ReqwestTransport, UploadClient};
use fitbridge::sync::{find_unsynced, SyncRunner};
use tracing::info;

use crate::helpers::display;

const WORK_DIR_NAME: &str = "fitbridge";

/// Repair and upload every unsynced activity
pub fn sync(config: &SyncConfig) -> Result<()> {
    let dir = config.require_data_dir()?;
    let files = find_unsynced(dir, config.lookback(), Utc::now())?;
    if files.is_empty() {
        println!(
            "No unsynced activities from the last {} days in {}",
            config.lookback_days,
            dir.display()
        );
        return Ok(());
    }
    info!(count = files.len(), dir = %dir.display(), "Found unsynced activities");

    let mut client = build_client(config)?;
    establish_session(&mut client, config)?;

    let work_dir = env::temp_dir().join(WORK_DIR_NAME);
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    let mut sink = display::print_sync_event;
    let summary = SyncRunner::new(work_dir).run(&files, &mut client, &mut sink);
    display::print_summary(&summary);

    if summary.aborted {
        bail!("Sync stopped: no usable Garmin Connect session");
    }
    Ok(())
}

/// Log in with the configured credentials and cache the tokens
pub fn login(config: &SyncConfig) -> Result<()> {
    let Some((email, password)) = config.login_credentials() else {
        bail!(
            "Email and password required: pass --email/--password or set {}/{}",
            vars::EMAIL,
            vars::PASSWORD
        );
    };

    let mut client = build_client(config)?;
    client.login(email, password)?;
    println!(
        "Logged in to {}; credentials cached in {}",
        client.domain(),
        config.token_dir.display()
    );
    Ok(())
}

fn build_client(config: &SyncConfig) -> Result<UploadClient> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let cache = Box::new(FileCredentialCache::new(&config.token_dir));
    Ok(UploadClient::new(transport, cache, config.domain.clone()))
}

fn establish_session(client: &mut UploadClient, config: &SyncConfig) -> Result<()> {
    let resume_error = match client.resume() {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    let Some((email, password)) = config.login_credentials() else {
        return Err(anyhow!(resume_error).context(format!(
            "No usable cached session and no credentials: set {}/{} or run `fitbridge login`",
            vars::EMAIL,
            vars::PASSWORD
        )));
    };

    info!(reason = %resume_error, "Cached session unavailable, logging in");
    client.login(email, password)?;
    Ok(())
}
