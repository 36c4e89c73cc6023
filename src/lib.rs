// ABOUTME: Main library entry point for fitbridge
// ABOUTME: Repairs MyWhoosh FIT activities and uploads them to Garmin Connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # fitbridge
//!
//! Indoor cycling activities exported by MyWhoosh are valid FIT files, but
//! their session averages for power, heart rate, and cadence are missing, the
//! record temperature is bogus, and the device identity keeps Garmin Connect
//! from crediting training load. This crate repairs such files and uploads
//! them.
//!
//! ## Architecture
//!
//! - **fit**: binary FIT codec and a typed activity view over decoded messages
//! - **corrector**: sample aggregation, temperature reset, device spoofing
//! - **connect**: SSO handshake, `OAuth1` / `OAuth2` exchange, credential cache, upload
//! - **sync**: unsynced file discovery, version selection, the batch runner
//! - **config**: environment-driven settings
//! - **logging**: tracing subscriber setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use fitbridge::corrector::{ActivityCorrector, NullSink};
//! use fitbridge::errors::fit::FitResult;
//!
//! fn main() -> FitResult<()> {
//!     let report = ActivityCorrector::default().fix_file(
//!         Path::new("MyNewActivity-3.8.5.fit"),
//!         Path::new("fixed.fit"),
//!         &mut NullSink,
//!     )?;
//!     println!("{} records, {} averages derived", report.records, report.derived.len());
//!     Ok(())
//! }
//! ```

/// Environment-based configuration
pub mod config;

/// Garmin Connect authentication and upload
pub mod connect;

/// Activity repair
pub mod corrector;

/// FIT binary format
pub mod fit;

/// Logging configuration and subscriber setup
pub mod logging;

/// Discovery and batch upload of activity files
pub mod sync;

pub use fitbridge_core::{constants, errors, models};
