// ABOUTME: Core types and constants for the fitbridge activity sync tool
// ABOUTME: Foundation crate with error handling, protocol constants, and credential models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # fitbridge Core
//!
//! Foundation crate providing shared types and constants for fitbridge.
//! This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and domain-specific errors
//! - **constants**: FIT sentinels, spoof identity, Garmin endpoints and client headers
//! - **models**: `OAuth1` / `OAuth2` credential documents

/// Unified error handling system with standard error codes
pub mod errors;

/// Protocol constants organized by domain
pub mod constants;

/// Credential models persisted between runs
pub mod models;
