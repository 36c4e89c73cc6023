// ABOUTME: Garmin Connect client stack: transport, SSO handshake, OAuth tokens, cache, upload
// ABOUTME: All network calls are blocking and go through the HttpTransport seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Garmin Connect
//!
//! [`UploadClient`] owns a session and composes the lower layers:
//! [`AuthSession`] runs the SSO handshake and yields a ticket,
//! [`TokenExchanger`] turns it into `OAuth1` and then `OAuth2` credentials,
//! and a [`CredentialCache`] persists both between runs.

/// Credential persistence
pub mod cache;
/// Upload client and result classification
pub mod client;
/// SSO cookie store
pub mod cookies;
/// OAuth 1.0a request signing
pub mod oauth1;
/// SSO handshake
pub mod sso;
/// Consumer fetch and token exchange
pub mod tokens;
/// HTTP transport seam
pub mod transport;

pub use cache::{CredentialCache, FileCredentialCache};
pub use client::{classify_upload, SessionState, UploadClient, UploadOutcome};
pub use sso::{AuthSession, SsoState, SsoTicket};
pub use tokens::{ConsumerSource, TokenExchanger};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, ReqwestTransport};
