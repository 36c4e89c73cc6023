// ABOUTME: Re-exports helper modules for the fitbridge CLI
// ABOUTME: Provides terminal formatting for reports, activities, and sync progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod display;
