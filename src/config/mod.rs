// ABOUTME: Configuration management module for the sync tool
// ABOUTME: Environment variables provide defaults; command-line flags override them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment-based configuration
pub mod environment;

pub use environment::SyncConfig;
