// ABOUTME: OAuth 1.0a HMAC-SHA1 request signing (RFC 5849) for the Connect token endpoints
// ABOUTME: Query and form parameters join the signature base string; token is optional
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::models::OAuthConsumer;
use rand::distributions::Alphanumeric;
use rand::Rng;
use ring::hmac;
use url::Url;

use super::transport::Method;

const NONCE_LENGTH: usize = 32;

/// Signs requests with a consumer and an optional token
#[derive(Debug, Clone, Copy)]
pub struct OAuth1Signer<'a> {
    consumer: &'a OAuthConsumer,
    token: Option<(&'a str, &'a str)>,
}

impl<'a> OAuth1Signer<'a> {
    /// Consumer-only signer (no `oauth_token`, empty token secret)
    #[must_use]
    pub const fn consumer_only(consumer: &'a OAuthConsumer) -> Self {
        Self {
            consumer,
            token: None,
        }
    }

    /// Signer with token credentials
    #[must_use]
    pub const fn with_token(consumer: &'a OAuthConsumer, token: &'a str, token_secret: &'a str) -> Self {
        Self {
            consumer,
            token: Some((token, token_secret)),
        }
    }

    /// `Authorization` header value with a fresh nonce and timestamp
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Protocol`] if `url` is not absolute.
    pub fn authorization(
        &self,
        method: Method,
        url: &str,
        form: &[(String, String)],
    ) -> ConnectResult<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();
        let timestamp = Utc::now().timestamp().to_string();
        self.authorization_with(method, url, form, &nonce, &timestamp)
    }

    /// `Authorization` header value for a given nonce and timestamp
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Protocol`] if `url` is not absolute.
    pub fn authorization_with(
        &self,
        method: Method,
        url: &str,
        form: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> ConnectResult<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_owned(), self.consumer.consumer_key.clone()),
            ("oauth_nonce".to_owned(), nonce.to_owned()),
            ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
            ("oauth_timestamp".to_owned(), timestamp.to_owned()),
            ("oauth_version".to_owned(), "1.0".to_owned()),
        ];
        if let Some((token, _)) = self.token {
            oauth_params.push(("oauth_token".to_owned(), token.to_owned()));
        }

        let mut signed_params = oauth_params.clone();
        signed_params.extend_from_slice(form);
        let base = signature_base_string(method, url, &signed_params)?;
        let token_secret = self.token.map_or("", |(_, secret)| secret);
        let signature = sign(&base, &self.consumer.consumer_secret, token_secret);
        oauth_params.push(("oauth_signature".to_owned(), signature));

        let rendered = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {rendered}"))
    }
}

/// RFC 3986 unreserved-set percent encoding
#[must_use]
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Signature base string over `params` plus the URL's own query parameters
///
/// # Errors
///
/// Returns [`ConnectError::Protocol`] if `url` is not absolute.
pub fn signature_base_string(
    method: Method,
    url: &str,
    params: &[(String, String)],
) -> ConnectResult<String> {
    let parsed = Url::parse(url)
        .map_err(|e| ConnectError::protocol("signing request", format!("invalid URL: {e}")))?;

    let mut base_url = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default().to_ascii_lowercase()
    );
    if let Some(port) = parsed.port() {
        base_url.push_str(&format!(":{port}"));
    }
    base_url.push_str(parsed.path());

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| (percent_encode(&key), percent_encode(&value)))
        .chain(
            params
                .iter()
                .map(|(key, value)| (percent_encode(key), percent_encode(value))),
        )
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode(&base_url),
        percent_encode(&normalized)
    ))
}

/// HMAC-SHA1 signature of a base string, base64 encoded
#[must_use]
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
    STANDARD.encode(hmac::sign(&key, base_string.as_bytes()).as_ref())
}
