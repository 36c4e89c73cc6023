// ABOUTME: OAuth1 and OAuth2 credential documents with absolute expiry stamping
// ABOUTME: Field names match the cached JSON documents so existing caches stay readable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::garmin::DEFAULT_DOMAIN;

/// Shared consumer key/secret published for the mobile app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConsumer {
    /// Consumer key
    pub consumer_key: String,
    /// Consumer secret
    pub consumer_secret: String,
}

/// Long-lived `OAuth1` token minted from an SSO ticket (lasts about a year)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Credential {
    /// Token
    pub oauth_token: String,
    /// Token secret
    pub oauth_token_secret: String,
    /// MFA token, forwarded on every `OAuth2` exchange when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    /// MFA token expiration as reported upstream
    #[serde(
        default,
        rename = "mfa_expiration_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub mfa_expiration: Option<String>,
    /// Connect domain the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl OAuth1Credential {
    /// Domain to refresh against, falling back to the global domain
    #[must_use]
    pub fn domain_or_default(&self) -> &str {
        self.domain
            .as_deref()
            .filter(|domain| !domain.is_empty())
            .unwrap_or(DEFAULT_DOMAIN)
    }
}

/// `OAuth2` exchange response as returned upstream (relative lifetimes)
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2TokenResponse {
    /// Granted scopes
    #[serde(default)]
    pub scope: String,
    /// Token id
    #[serde(default)]
    pub jti: String,
    /// Token type, normally "Bearer"
    #[serde(default)]
    pub token_type: String,
    /// Bearer token
    pub access_token: String,
    /// Refresh token
    #[serde(default)]
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    #[serde(default)]
    pub refresh_token_expires_in: i64,
}

/// Short-lived bearer credential with absolute expiry timestamps (unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Credential {
    /// Granted scopes
    #[serde(default)]
    pub scope: String,
    /// Token id
    #[serde(default)]
    pub jti: String,
    /// Token type
    #[serde(default)]
    pub token_type: String,
    /// Bearer token
    pub access_token: String,
    /// Refresh token
    #[serde(default)]
    pub refresh_token: String,
    /// Access token lifetime in seconds, as received
    #[serde(default)]
    pub expires_in: i64,
    /// Access token expiry (unix seconds)
    pub expires_at: i64,
    /// Refresh token lifetime in seconds, as received
    #[serde(default)]
    pub refresh_token_expires_in: i64,
    /// Refresh token expiry (unix seconds)
    #[serde(default)]
    pub refresh_token_expires_at: i64,
}

impl OAuth2Credential {
    /// Stamp absolute expiries as `received_at + lifetime`.
    ///
    /// The stamped values are canonical; they are never recomputed from
    /// the relative lifetimes later.
    #[must_use]
    pub fn from_response(response: OAuth2TokenResponse, received_at: DateTime<Utc>) -> Self {
        let now = received_at.timestamp();
        Self {
            scope: response.scope,
            jti: response.jti,
            token_type: response.token_type,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            expires_at: now.saturating_add(response.expires_in),
            refresh_token_expires_in: response.refresh_token_expires_in,
            refresh_token_expires_at: now.saturating_add(response.refresh_token_expires_in),
        }
    }

    /// Whether the access token is expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }

    /// Whether the access token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `Authorization` header value
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(expires_in: i64) -> OAuth2TokenResponse {
        OAuth2TokenResponse {
            scope: "CONNECT_WRITE".to_owned(),
            jti: "jti-1".to_owned(),
            token_type: "Bearer".to_owned(),
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
            expires_in,
            refresh_token_expires_in: 7200,
        }
    }

    #[test]
    fn test_expiry_is_receipt_time_plus_lifetime() {
        let received = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
        let credential = OAuth2Credential::from_response(response(3600), received);

        assert_eq!(credential.expires_at, 1_700_003_600);
        assert_eq!(credential.refresh_token_expires_at, 1_700_007_200);

        let just_before = Utc.timestamp_opt(1_700_003_599, 0).single().unwrap_or_default();
        let exactly = Utc.timestamp_opt(1_700_003_600, 0).single().unwrap_or_default();
        let after = Utc.timestamp_opt(1_700_003_601, 0).single().unwrap_or_default();
        assert!(!credential.is_expired_at(just_before));
        assert!(credential.is_expired_at(exactly));
        assert!(credential.is_expired_at(after));
    }

    #[test]
    fn test_oauth1_domain_fallback() {
        let mut credential = OAuth1Credential {
            oauth_token: "t".to_owned(),
            oauth_token_secret: "s".to_owned(),
            mfa_token: None,
            mfa_expiration: None,
            domain: None,
        };
        assert_eq!(credential.domain_or_default(), "garmin.com");
        credential.domain = Some("garmin.cn".to_owned());
        assert_eq!(credential.domain_or_default(), "garmin.cn");
    }

    #[test]
    fn test_oauth1_omits_absent_optional_fields() {
        let credential = OAuth1Credential {
            oauth_token: "t".to_owned(),
            oauth_token_secret: "s".to_owned(),
            mfa_token: None,
            mfa_expiration: None,
            domain: Some("garmin.com".to_owned()),
        };
        let json = serde_json::to_string(&credential).unwrap_or_default();
        assert!(!json.contains("mfa_token"));
        assert!(json.contains("\"domain\":\"garmin.com\""));
    }
}
