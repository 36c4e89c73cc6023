// ABOUTME: Re-exports command modules for the fitbridge CLI
// ABOUTME: Local file commands live in activity, Garmin Connect commands in connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod activity;
pub mod connect;
