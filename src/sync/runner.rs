// ABOUTME: Batch runner: corrects each source file into a temp copy, uploads it, and marks it synced
// ABOUTME: A per-file failure never stops the batch; only an authentication failure does
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::errors::AppError;
use tracing::{info, warn};

use super::discovery::{mark_synced, output_file_name};
use crate::connect::{UploadClient, UploadOutcome};
use crate::corrector::{ActivityCorrector, TracingSink};

/// Something that can upload a corrected file
pub trait ActivityUploader {
    /// Upload one file
    ///
    /// # Errors
    ///
    /// Returns the classified upload failure.
    fn upload(&mut self, path: &Path) -> ConnectResult<UploadOutcome>;
}

impl ActivityUploader for UploadClient {
    fn upload(&mut self, path: &Path) -> ConnectResult<UploadOutcome> {
        Self::upload(self, path)
    }
}

/// Progress of a sync batch
#[derive(Debug)]
pub enum SyncEvent {
    /// Processing of a file started
    FileStarted {
        /// 1-based position
        index: usize,
        /// Batch size
        total: usize,
        /// Source file
        path: PathBuf,
    },
    /// File uploaded and marked
    Uploaded {
        /// Source file
        path: PathBuf,
        /// Identifiers reported upstream
        outcome: UploadOutcome,
    },
    /// File already existed upstream and was marked
    Duplicate {
        /// Source file
        path: PathBuf,
    },
    /// File skipped after an error
    Failed {
        /// Source file
        path: PathBuf,
        /// What went wrong
        error: AppError,
    },
    /// Batch stopped because no session is available
    Aborted {
        /// Why
        error: AppError,
    },
}

/// Receiver for sync progress
pub trait SyncSink {
    /// Handle one event
    fn emit(&mut self, event: &SyncEvent);
}

impl<F> SyncSink for F
where
    F: FnMut(&SyncEvent),
{
    fn emit(&mut self, event: &SyncEvent) {
        self(event);
    }
}

/// Batch totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Files uploaded
    pub uploaded: usize,
    /// Files already present upstream
    pub duplicates: usize,
    /// Files skipped after an error
    pub failed: usize,
    /// Whether the batch stopped early
    pub aborted: bool,
}

enum FileResult {
    Uploaded(UploadOutcome),
    Duplicate,
    Failed(AppError),
    Abort(AppError),
}

/// Runs the correct-upload-mark pipeline over a list of files
#[derive(Debug, Clone)]
pub struct SyncRunner {
    work_dir: PathBuf,
    corrector: ActivityCorrector,
}

impl SyncRunner {
    /// Runner writing corrected copies into `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            corrector: ActivityCorrector::default(),
        }
    }

    /// Use a specific corrector
    #[must_use]
    pub fn with_corrector(mut self, corrector: ActivityCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Process `files` in order
    pub fn run(
        &self,
        files: &[PathBuf],
        uploader: &mut dyn ActivityUploader,
        sink: &mut dyn SyncSink,
    ) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let total = files.len();
        info!(total, "Starting sync batch");

        for (index, source) in files.iter().enumerate() {
            sink.emit(&SyncEvent::FileStarted {
                index: index + 1,
                total,
                path: source.clone(),
            });

            match self.process(source, uploader) {
                FileResult::Uploaded(outcome) => {
                    summary.uploaded += 1;
                    sink.emit(&SyncEvent::Uploaded {
                        path: source.clone(),
                        outcome,
                    });
                }
                FileResult::Duplicate => {
                    summary.duplicates += 1;
                    sink.emit(&SyncEvent::Duplicate {
                        path: source.clone(),
                    });
                }
                FileResult::Failed(error) => {
                    warn!(file = %source.display(), error = %error, "Skipping file");
                    summary.failed += 1;
                    sink.emit(&SyncEvent::Failed {
                        path: source.clone(),
                        error,
                    });
                }
                FileResult::Abort(error) => {
                    warn!(file = %source.display(), error = %error, "Aborting sync batch");
                    summary.aborted = true;
                    sink.emit(&SyncEvent::Aborted { error });
                    break;
                }
            }
        }

        info!(
            uploaded = summary.uploaded,
            duplicates = summary.duplicates,
            failed = summary.failed,
            aborted = summary.aborted,
            "Sync batch finished"
        );
        summary
    }

    fn process(&self, source: &Path, uploader: &mut dyn ActivityUploader) -> FileResult {
        let staged = self
            .work_dir
            .join(output_file_name(source, Local::now()));

        let result = self.correct_and_upload(source, &staged, uploader);
        remove_staged(&staged);
        result
    }

    fn correct_and_upload(
        &self,
        source: &Path,
        staged: &Path,
        uploader: &mut dyn ActivityUploader,
    ) -> FileResult {
        if let Err(e) = self.corrector.fix_file(source, staged, &mut TracingSink) {
            return FileResult::Failed(e.into());
        }

        match uploader.upload(staged) {
            Ok(outcome) => {
                mark_or_warn(source);
                FileResult::Uploaded(outcome)
            }
            Err(ConnectError::Duplicate) => {
                mark_or_warn(source);
                FileResult::Duplicate
            }
            Err(e) if e.is_auth_failure() => FileResult::Abort(e.into()),
            Err(e) => FileResult::Failed(e.into()),
        }
    }
}

fn mark_or_warn(source: &Path) {
    if let Err(e) = mark_synced(source) {
        warn!(file = %source.display(), error = %e, "Could not write sync marker");
    }
}

fn remove_staged(staged: &Path) {
    match fs::remove_file(staged) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(file = %staged.display(), error = %e, "Could not remove staged file"),
    }
}
