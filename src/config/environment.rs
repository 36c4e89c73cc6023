// ABOUTME: Environment-based configuration for the sync tool
// ABOUTME: Resolves data and token directories, Connect domain, lookback window, and login credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fmt;
use std::path::PathBuf;

use chrono::TimeDelta;
use fitbridge_core::constants::{files, garmin};
use fitbridge_core::errors::{AppError, AppResult};
use tracing::debug;

/// Environment variable names
pub mod vars {
    /// Directory scanned for activity files
    pub const DATA_DIR: &str = "FITBRIDGE_DATA_DIR";
    /// Directory holding cached credentials
    pub const TOKEN_DIR: &str = "FITBRIDGE_TOKEN_DIR";
    /// Connect domain
    pub const DOMAIN: &str = "FITBRIDGE_DOMAIN";
    /// Days of history scanned for unsynced files
    pub const LOOKBACK_DAYS: &str = "FITBRIDGE_LOOKBACK_DAYS";
    /// Login email
    pub const EMAIL: &str = "FITBRIDGE_EMAIL";
    /// Login password
    pub const PASSWORD: &str = "FITBRIDGE_PASSWORD";
}

/// Sync tool configuration
#[derive(Clone)]
pub struct SyncConfig {
    /// Directory scanned for `.fit` files
    pub data_dir: Option<PathBuf>,
    /// Directory holding `oauth1_token.json` / `oauth2_token.json`
    pub token_dir: PathBuf,
    /// Connect domain (`garmin.com` or `garmin.cn`)
    pub domain: String,
    /// Days of history scanned for unsynced files
    pub lookback_days: u32,
    /// Login email, only needed without a cached session
    pub email: Option<String>,
    /// Login password, only needed without a cached session
    pub password: Option<String>,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("data_dir", &self.data_dir)
            .field("token_dir", &self.token_dir)
            .field("domain", &self.domain)
            .field("lookback_days", &self.lookback_days)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a value cannot be parsed or no
    /// token directory can be determined.
    pub fn from_env() -> AppResult<Self> {
        let token_dir = match non_empty_var(vars::TOKEN_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_token_dir()?,
        };

        let lookback_days = match non_empty_var(vars::LOOKBACK_DAYS) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid {} value {raw:?}", vars::LOOKBACK_DAYS))
                    .with_source(e)
            })?,
            None => files::DEFAULT_LOOKBACK_DAYS,
        };

        let config = Self {
            data_dir: non_empty_var(vars::DATA_DIR).map(PathBuf::from),
            token_dir,
            domain: non_empty_var(vars::DOMAIN).unwrap_or_else(|| garmin::DEFAULT_DOMAIN.to_owned()),
            lookback_days,
            email: non_empty_var(vars::EMAIL),
            password: non_empty_var(vars::PASSWORD),
        };
        config.validate()?;
        debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero lookback window or an empty domain.
    pub fn validate(&self) -> AppResult<()> {
        if self.lookback_days == 0 {
            return Err(AppError::config(format!(
                "{} must be at least 1",
                vars::LOOKBACK_DAYS
            )));
        }
        if self.domain.trim().is_empty() {
            return Err(AppError::config("Connect domain cannot be empty"));
        }
        Ok(())
    }

    /// Lookback window as a duration
    #[must_use]
    pub fn lookback(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.lookback_days))
    }

    /// Data directory, or an error naming the variable to set
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no data directory was given.
    pub fn require_data_dir(&self) -> AppResult<&PathBuf> {
        self.data_dir.as_ref().ok_or_else(|| {
            AppError::config(format!(
                "No activity directory: pass --dir or set {}",
                vars::DATA_DIR
            ))
        })
    }

    /// Email and password, when both are present
    #[must_use]
    pub fn login_credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn default_token_dir() -> AppResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(files::DEFAULT_TOKEN_DIR_NAME))
        .ok_or_else(|| {
            AppError::config(format!(
                "Cannot determine home directory: set {}",
                vars::TOKEN_DIR
            ))
        })
}
