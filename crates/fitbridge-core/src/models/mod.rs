// ABOUTME: Credential models shared by the token exchanger, credential cache, and upload client
// ABOUTME: OAuth1 is long-lived; OAuth2 is short-lived and replaced on every refresh
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// `OAuth1` / `OAuth2` credential documents
pub mod credentials;

pub use credentials::{OAuth1Credential, OAuth2Credential, OAuth2TokenResponse, OAuthConsumer};
