// ABOUTME: Error types for the Garmin Connect SSO handshake, token exchange, and upload
// ABOUTME: Separates batch-aborting authentication failures from per-file upload outcomes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde_json::Value;
use std::io;

use super::ErrorCode;

/// Errors raised while talking to the identity provider or the Connect API
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Network failure, invalid request, or deadline exceeded
    #[error("{context}: transport failure: {reason}")]
    Transport {
        /// Step that was running
        context: String,
        /// Transport-level message
        reason: String,
        /// Whether the per-call deadline was exceeded
        timed_out: bool,
    },

    /// Non-success status from the identity provider during the handshake
    #[error("{context}: HTTP {status}: {body}")]
    HttpStatus {
        /// Step that was running
        context: String,
        /// Response status
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Expected page structure was not found (upstream UI changed)
    #[error("{context}: {reason}")]
    Protocol {
        /// Step that was running
        context: String,
        /// What was missing
        reason: String,
    },

    /// Identity provider rejected the username/password
    #[error("login failed: {title:?} (check credentials)")]
    InvalidCredentials {
        /// Page title returned instead of "Success"
        title: String,
    },

    /// Account requires multi-factor authentication
    #[error("multi-factor authentication is required but not supported")]
    MfaRequired,

    /// Token endpoint returned a non-200 status
    #[error("{context}: HTTP {status}: {body}")]
    Exchange {
        /// Which exchange failed
        context: String,
        /// Response status
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response body was not in the expected format
    #[error("{context}: {reason}")]
    Parse {
        /// What was being parsed
        context: String,
        /// Parser message
        reason: String,
    },

    /// Upload returned 409: the activity already exists
    #[error("duplicate activity (already uploaded)")]
    Duplicate,

    /// Upload returned an error status
    #[error("upload failed (HTTP {status}): {body}")]
    UploadRejected {
        /// Response status
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Upload returned 2xx but the body lists failures
    #[error("upload reported failures: {}", summarize_failures(.failures))]
    LogicalUploadFailure {
        /// Failure entries as reported upstream
        failures: Vec<Value>,
    },

    /// No usable session is loaded
    #[error("not authenticated: {reason}")]
    NotAuthenticated {
        /// Why no session is available
        reason: String,
    },

    /// Credential cache could not be read or written
    #[error("credential cache: {reason}")]
    Cache {
        /// What went wrong
        reason: String,
    },

    /// Local file access failed
    #[error("{context}: {source}")]
    Io {
        /// Operation that failed
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    /// Build a transport error
    pub fn transport(context: impl Into<String>, reason: impl Into<String>, timed_out: bool) -> Self {
        Self::Transport {
            context: context.into(),
            reason: reason.into(),
            timed_out,
        }
    }

    /// Build a protocol error
    pub fn protocol(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Build a parse error
    pub fn parse(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Build a cache error
    pub fn cache(reason: impl Into<String>) -> Self {
        Self::Cache {
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

    /// Whether this error means no session can be established.
    ///
    /// Such errors abort a whole sync batch; everything else is scoped to one file.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::InvalidCredentials { .. }
                | Self::MfaRequired
                | Self::HttpStatus { .. }
                | Self::NotAuthenticated { .. }
        )
    }

    /// Whether the upload was a confirmed duplicate
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }

    /// Error code used for reporting
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport { .. } => ErrorCode::TransportError,
            Self::HttpStatus { .. } | Self::Protocol { .. } => ErrorCode::AuthProtocol,
            Self::InvalidCredentials { .. } => ErrorCode::AuthInvalid,
            Self::MfaRequired => ErrorCode::AuthUnsupported,
            Self::Exchange { .. } => ErrorCode::TokenExchangeFailed,
            Self::Parse { .. } => ErrorCode::SerializationError,
            Self::Duplicate => ErrorCode::DuplicateActivity,
            Self::UploadRejected { .. } => ErrorCode::UploadRejected,
            Self::LogicalUploadFailure { .. } => ErrorCode::UploadFailed,
            Self::NotAuthenticated { .. } => ErrorCode::AuthRequired,
            Self::Cache { .. } | Self::Io { .. } => ErrorCode::StorageError,
        }
    }
}

fn summarize_failures(failures: &[Value]) -> String {
    failures
        .iter()
        .map(|failure| {
            failure
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|messages| messages.first())
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
                .map_or_else(|| failure.to_string(), str::to_owned)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for Connect operations
pub type ConnectResult<T> = Result<T, ConnectError>;
