// ABOUTME: Consumer key fetch, ticket to OAuth1 minting, and OAuth1 to OAuth2 exchange/refresh
// ABOUTME: The exchanger stamps absolute expiries at receipt; those are the persisted values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use fitbridge_core::constants::{client_headers, garmin, network};
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::errors::truncate_preview;
use fitbridge_core::models::{OAuth1Credential, OAuth2Credential, OAuth2TokenResponse, OAuthConsumer};
use tracing::{debug, info};
use url::{form_urlencoded, Url};

use super::oauth1::OAuth1Signer;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Shared consumer key/secret, fetched once and reused
pub struct ConsumerSource {
    transport: Arc<dyn HttpTransport>,
    url: String,
    cached: OnceLock<OAuthConsumer>,
}

impl ConsumerSource {
    /// Source reading the public consumer document
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_url(transport, garmin::OAUTH_CONSUMER_URL)
    }

    /// Source reading a consumer document from `url`
    pub fn with_url(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            cached: OnceLock::new(),
        }
    }

    /// Consumer, fetching it on first use
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Exchange`] on a non-200 response and
    /// [`ConnectError::Parse`] when the document is malformed.
    pub fn get(&self) -> ConnectResult<OAuthConsumer> {
        if let Some(consumer) = self.cached.get() {
            return Ok(consumer.clone());
        }
        let fetched = self.fetch()?;
        Ok(self.cached.get_or_init(|| fetched).clone())
    }

    fn fetch(&self) -> ConnectResult<OAuthConsumer> {
        debug!(url = %self.url, "Fetching OAuth consumer");
        let response = self
            .transport
            .send(HttpRequest::get(&self.url).timeout(network::AUTH_TIMEOUT))?;
        let body = expect_ok(response, "fetching OAuth consumer")?;
        serde_json::from_slice(&body)
            .map_err(|e| ConnectError::parse("parsing OAuth consumer", e.to_string()))
    }
}

/// Mints `OAuth1` credentials and exchanges them for `OAuth2`
pub struct TokenExchanger {
    transport: Arc<dyn HttpTransport>,
    consumers: Arc<ConsumerSource>,
}

impl TokenExchanger {
    /// Create an exchanger sharing `consumers` with the SSO session
    pub fn new(transport: Arc<dyn HttpTransport>, consumers: Arc<ConsumerSource>) -> Self {
        Self {
            transport,
            consumers,
        }
    }

    /// Trade a service ticket for a long-lived `OAuth1` credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Exchange`] on a non-200 response and
    /// [`ConnectError::Parse`] when the token or secret is missing.
    pub fn mint_oauth1(
        &self,
        consumer: &OAuthConsumer,
        ticket: &str,
        domain: &str,
    ) -> ConnectResult<OAuth1Credential> {
        let login_url = format!("{}/sso/embed", garmin::sso_base(domain));
        let url = Url::parse_with_params(
            &format!("{}{}", garmin::api_base(domain), garmin::PREAUTHORIZED_PATH),
            &[
                ("ticket", ticket),
                ("login-url", login_url.as_str()),
                ("accepts-mfa-tokens", "true"),
            ],
        )
        .map_err(|e| ConnectError::protocol("building preauthorized URL", e.to_string()))?;

        let authorization =
            OAuth1Signer::consumer_only(consumer).authorization(Method::Get, url.as_str(), &[])?;
        let request = HttpRequest::get(url.as_str())
            .header("User-Agent", client_headers::SSO_USER_AGENT)
            .header("Authorization", authorization)
            .timeout(network::AUTH_TIMEOUT);

        let body = expect_ok(self.transport.send(request)?, "preauthorized")?;
        let credential = parse_preauthorized(&body, domain)?;
        info!(domain, mfa = credential.mfa_token.is_some(), "Minted OAuth1 token");
        Ok(credential)
    }

    /// Exchange an `OAuth1` credential for a fresh `OAuth2` credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Exchange`] on a non-200 response and
    /// [`ConnectError::Parse`] when the body is not a token document.
    pub fn exchange_oauth2(
        &self,
        consumer: &OAuthConsumer,
        oauth1: &OAuth1Credential,
        domain: &str,
    ) -> ConnectResult<OAuth2Credential> {
        let url = format!("{}{}", garmin::api_base(domain), garmin::EXCHANGE_PATH);
        let form: Vec<(String, String)> = oauth1
            .mfa_token
            .iter()
            .filter(|token| !token.is_empty())
            .map(|token| ("mfa_token".to_owned(), token.clone()))
            .collect();

        let authorization = OAuth1Signer::with_token(
            consumer,
            &oauth1.oauth_token,
            &oauth1.oauth_token_secret,
        )
        .authorization(Method::Post, &url, &form)?;
        let request = HttpRequest::post(url)
            .header("User-Agent", client_headers::SSO_USER_AGENT)
            .header("Authorization", authorization)
            .form(form)
            .timeout(network::AUTH_TIMEOUT);

        let body = expect_ok(self.transport.send(request)?, "oauth2 exchange")?;
        let received_at = Utc::now();
        let response: OAuth2TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ConnectError::parse("parsing OAuth2 token", e.to_string()))?;
        let credential = OAuth2Credential::from_response(response, received_at);
        info!(domain, expires_at = credential.expires_at, "Exchanged OAuth2 token");
        Ok(credential)
    }

    /// Obtain a new `OAuth2` credential from a still-valid `OAuth1` credential
    ///
    /// # Errors
    ///
    /// Propagates consumer fetch and exchange failures.
    pub fn refresh(&self, oauth1: &OAuth1Credential) -> ConnectResult<OAuth2Credential> {
        let consumer = self.consumers.get()?;
        self.exchange_oauth2(&consumer, oauth1, oauth1.domain_or_default())
    }
}

fn expect_ok(response: HttpResponse, context: &str) -> ConnectResult<Vec<u8>> {
    if response.status != 200 {
        return Err(ConnectError::Exchange {
            context: context.to_owned(),
            status: response.status,
            body: truncate_preview(&response.body, network::BODY_PREVIEW_LEN),
        });
    }
    Ok(response.body)
}

fn parse_preauthorized(body: &[u8], domain: &str) -> ConnectResult<OAuth1Credential> {
    let mut token = None;
    let mut secret = None;
    let mut mfa_token = None;
    let mut mfa_expiration = None;
    for (key, value) in form_urlencoded::parse(body) {
        let slot = match key.as_ref() {
            "oauth_token" => &mut token,
            "oauth_token_secret" => &mut secret,
            "mfa_token" => &mut mfa_token,
            "mfa_expiration_timestamp" => &mut mfa_expiration,
            _ => continue,
        };
        if !value.is_empty() {
            *slot = Some(value.into_owned());
        }
    }

    let missing = |field: &str| ConnectError::parse("parsing OAuth1 token", format!("{field} missing"));
    Ok(OAuth1Credential {
        oauth_token: token.ok_or_else(|| missing("oauth_token"))?,
        oauth_token_secret: secret.ok_or_else(|| missing("oauth_token_secret"))?,
        mfa_token,
        mfa_expiration,
        domain: Some(domain.to_owned()),
    })
}
