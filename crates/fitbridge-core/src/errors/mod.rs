// ABOUTME: Unified error handling with error codes and domain error conversions
// ABOUTME: AppError wraps FitError and ConnectError for binaries and batch reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Domain modules return their own `thiserror` enums ([`FitError`],
//! [`ConnectError`]). Binaries and the batch runner fold them into
//! [`AppError`], which carries a stable [`ErrorCode`] for reporting.

/// Activity file codec errors
pub mod fit;

/// Authentication, token exchange and upload errors
pub mod connect;

pub use connect::ConnectError;
pub use fit::FitError;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io;

/// Standard error codes used throughout the application
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Activity files (1000-1999)
    /// Input bytes are not a well-formed FIT activity
    #[serde(rename = "DECODE_FAILED")]
    DecodeFailed = 1000,
    /// Corrected activity could not be written back out
    #[serde(rename = "ENCODE_FAILED")]
    EncodeFailed = 1001,

    // Authentication (2000-2999)
    /// Identity provider page no longer has the expected structure
    #[serde(rename = "AUTH_PROTOCOL")]
    AuthProtocol = 2000,
    /// Username or password rejected
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 2001,
    /// Account requires a second factor
    #[serde(rename = "AUTH_UNSUPPORTED")]
    AuthUnsupported = 2002,
    /// Token exchange returned a non-success status
    #[serde(rename = "TOKEN_EXCHANGE_FAILED")]
    TokenExchangeFailed = 2003,
    /// No usable session
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 2004,

    // Upload (3000-3999)
    /// Activity already exists upstream
    #[serde(rename = "DUPLICATE_ACTIVITY")]
    DuplicateActivity = 3000,
    /// Upload rejected by HTTP status
    #[serde(rename = "UPLOAD_REJECTED")]
    UploadRejected = 3001,
    /// Upload accepted by transport but reported failures
    #[serde(rename = "UPLOAD_FAILED")]
    UploadFailed = 3002,

    // Infrastructure (9000-9999)
    /// Network failure or deadline exceeded
    #[serde(rename = "TRANSPORT_ERROR")]
    TransportError = 9000,
    /// Response body could not be parsed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9001,
    /// Local file system failure
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
    /// Invalid configuration value
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 9003,
    /// Requested file or directory does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 9004,
    /// Anything else
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9999,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DecodeFailed => "Activity file could not be decoded",
            Self::EncodeFailed => "Activity file could not be encoded",
            Self::AuthProtocol => "Sign-in page did not have the expected structure",
            Self::AuthInvalid => "Sign-in credentials were rejected",
            Self::AuthUnsupported => "Sign-in requires an unsupported authentication step",
            Self::TokenExchangeFailed => "Token exchange failed",
            Self::AuthRequired => "Authentication is required",
            Self::DuplicateActivity => "Activity was already uploaded",
            Self::UploadRejected => "Upload was rejected",
            Self::UploadFailed => "Upload reported processing failures",
            Self::TransportError => "Network request failed",
            Self::SerializationError => "Data serialization/deserialization failed",
            Self::StorageError => "Storage operation failed",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::ResourceNotFound => "Requested resource was not found",
            Self::InternalError => "An internal error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<FitError> for AppError {
    fn from(error: FitError) -> Self {
        let code = error.code();
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<ConnectError> for AppError {
    fn from(error: ConnectError) -> Self {
        let code = error.code();
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::storage(error.to_string()).with_source(error)
    }
}

/// Cut a response body down to a bounded diagnostic preview.
///
/// Truncation never splits a UTF-8 character; non-UTF-8 bytes are replaced.
#[must_use]
pub fn truncate_preview(body: &[u8], max_len: usize) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= max_len {
        return text.into_owned();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}
