// ABOUTME: Finds activity files to sync, picks the newest producer version, and manages sync markers
// ABOUTME: A source file is synced once a `<file>.synced` sidecar exists next to it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, TimeDelta, Utc};
use fitbridge_core::constants::files;
use fitbridge_core::errors::{AppError, AppResult};
use tracing::debug;

fn is_fit_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(files::FIT_EXTENSION))
}

fn read_dir_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::storage(format!("cannot read {}", dir.display())).with_source(e))?;
    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect())
}

/// `.fit` files in `dir` modified within `lookback` of `now` that have no
/// marker, oldest first.
///
/// # Errors
///
/// Returns a storage error when `dir` cannot be listed.
pub fn find_unsynced(dir: &Path, lookback: TimeDelta, now: DateTime<Utc>) -> AppResult<Vec<PathBuf>> {
    let cutoff = now - lookback;
    let mut candidates: Vec<(DateTime<Utc>, PathBuf)> = read_dir_files(dir)?
        .into_iter()
        .filter(|path| is_fit_file(path))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
            Some((DateTime::<Utc>::from(modified), path))
        })
        .filter(|(modified, _)| *modified >= cutoff)
        .filter(|(_, path)| !is_synced(path))
        .collect();

    candidates.sort();
    debug!(dir = %dir.display(), count = candidates.len(), "Found unsynced activity files");
    Ok(candidates.into_iter().map(|(_, path)| path).collect())
}

/// Numeric runs in a file name, e.g. `[3, 8, 5]` for `MyNewActivity-3.8.5.fit`
#[must_use]
pub fn version_components(name: &str) -> Vec<u64> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse().unwrap_or(u64::MAX))
        .collect()
}

/// Component-wise comparison; when one is a prefix of the other the longer wins
#[must_use]
pub fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    a.cmp(b)
}

/// Path with the greatest version among `paths`
#[must_use]
pub fn select_latest_version(paths: &[PathBuf]) -> Option<&PathBuf> {
    paths.iter().max_by(|a, b| {
        compare_versions(&file_version(a), &file_version(b))
    })
}

fn file_version(path: &Path) -> Vec<u64> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(version_components)
        .unwrap_or_default()
}

/// Highest-version `MyNewActivity-*.fit` in `dir`
///
/// # Errors
///
/// Returns a not-found error when no such file exists and a storage error
/// when `dir` cannot be listed.
pub fn find_latest_version(dir: &Path) -> AppResult<PathBuf> {
    let candidates: Vec<PathBuf> = read_dir_files(dir)?
        .into_iter()
        .filter(|path| is_fit_file(path))
        .filter(|path| {
            path.file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|name| name.starts_with(files::ACTIVITY_PREFIX))
        })
        .collect();

    select_latest_version(&candidates).cloned().ok_or_else(|| {
        AppError::not_found(format!(
            "no {}*.{} files in {}",
            files::ACTIVITY_PREFIX,
            files::FIT_EXTENSION,
            dir.display()
        ))
    })
}

/// `<stem>_<YYYY-MM-DD_HHMMSS>.fit` for a corrected copy of `input`
#[must_use]
pub fn output_file_name(input: &Path, now: DateTime<Local>) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{stem}_{}.{}",
        now.format("%Y-%m-%d_%H%M%S"),
        files::FIT_EXTENSION
    )
}

/// Sidecar marker path for `source`
#[must_use]
pub fn marker_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(files::SYNCED_SUFFIX);
    PathBuf::from(name)
}

/// Whether `source` has a marker
#[must_use]
pub fn is_synced(source: &Path) -> bool {
    marker_path(source).exists()
}

/// Write the marker for `source`, containing the current time
///
/// # Errors
///
/// Returns a storage error when the marker cannot be written.
pub fn mark_synced(source: &Path) -> AppResult<()> {
    let marker = marker_path(source);
    let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    fs::write(&marker, stamp)
        .map_err(|e| AppError::storage(format!("cannot write {}", marker.display())).with_source(e))
}
