// ABOUTME: Sync pipeline: discovery of unsynced activity files and the per-file batch runner
// ABOUTME: Composes the corrector and the upload client; markers record what is done
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// File discovery, version selection, naming, and markers
pub mod discovery;
/// Batch runner
pub mod runner;

pub use discovery::{
    find_latest_version, find_unsynced, is_synced, mark_synced, marker_path, output_file_name,
};
pub use runner::{ActivityUploader, SyncEvent, SyncRunner, SyncSink, SyncSummary};
