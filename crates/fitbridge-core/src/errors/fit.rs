// ABOUTME: Error types for FIT activity decoding, correction, and encoding
// ABOUTME: Distinguishes malformed input, wrong file type, and write failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io;

use super::ErrorCode;

/// Errors raised while reading or writing a FIT activity file
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    /// Byte stream is not a well-formed FIT file
    #[error("decode failed at byte {offset}: {reason}")]
    Decode {
        /// Offset into the input where decoding stopped
        offset: usize,
        /// What was wrong with the input
        reason: String,
    },

    /// Decoded file is a FIT file of some other kind
    #[error("not an activity file (file type {file_type})")]
    NotActivity {
        /// Raw `file_id.type` value, 255 when absent
        file_type: u8,
    },

    /// Message could not be written back out
    #[error("encode failed: {reason}")]
    Encode {
        /// Why encoding failed
        reason: String,
    },

    /// Reading the input or writing the output failed
    #[error("{context}: {source}")]
    Io {
        /// Operation that failed
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FitError {
    /// Build a decode error
    pub fn decode(offset: usize, reason: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            reason: reason.into(),
        }
    }

    /// Build an encode error
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }

    /// Build an I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Error code used for reporting
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode { .. } | Self::NotActivity { .. } => ErrorCode::DecodeFailed,
            Self::Encode { .. } => ErrorCode::EncodeFailed,
            Self::Io { .. } => ErrorCode::StorageError,
        }
    }
}

/// Result alias for FIT operations
pub type FitResult<T> = Result<T, FitError>;
