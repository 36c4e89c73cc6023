// ABOUTME: Garmin SSO handshake reproducing the mobile app: embed, CSRF, credentials, ticket
// ABOUTME: Cookie jar and last resolved URL are an explicit state value threaded through each step
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::{Arc, OnceLock};

use fitbridge_core::constants::{client_headers, garmin, network};
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::errors::truncate_preview;
use fitbridge_core::models::OAuthConsumer;
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use super::cookies::CookieJar;
use super::tokens::ConsumerSource;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};

const CSRF_PATTERN: &str = r#"name="_csrf"\s+value="(.+?)""#;
const TITLE_PATTERN: &str = r"<title>(.+?)</title>";
const TICKET_PATTERN: &str = r#"embed\?ticket=([^"]+)""#;

static CSRF_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static TITLE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static TICKET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// State carried between handshake steps
#[derive(Debug, Clone, Default)]
pub struct SsoState {
    /// Cookies set so far
    pub cookies: CookieJar,
    /// URL of the last response, sent as `Referer` on the next step
    pub last_url: Option<String>,
}

/// Successful handshake result
#[derive(Debug, Clone)]
pub struct SsoTicket {
    /// Consumer fetched in the first step
    pub consumer: OAuthConsumer,
    /// One-time service ticket
    pub ticket: String,
}

/// Drives the SSO handshake for one Connect domain
pub struct AuthSession {
    transport: Arc<dyn HttpTransport>,
    consumers: Arc<ConsumerSource>,
    domain: String,
}

impl AuthSession {
    /// Create a session for `domain`
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        consumers: Arc<ConsumerSource>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            consumers,
            domain: domain.into(),
        }
    }

    /// Connect domain this session logs into
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Run the whole handshake and return a service ticket.
    ///
    /// No step is retried.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::Transport`] / [`ConnectError::HttpStatus`] when a step fails on the wire
    /// - [`ConnectError::Protocol`] when the CSRF token, title, or ticket is missing
    /// - [`ConnectError::MfaRequired`] when the account requires a second factor
    /// - [`ConnectError::InvalidCredentials`] for any other login outcome
    pub fn handshake(&self, email: &str, password: &str) -> ConnectResult<SsoTicket> {
        info!(domain = %self.domain, "Starting SSO handshake");
        let consumer = self.consumers.get()?;

        let state = self.establish_cookies(SsoState::default())?;
        let (state, csrf) = self.fetch_csrf(state)?;
        let (state, page) = self.submit_credentials(state, email, password, &csrf)?;
        debug!(cookies = state.cookies.len(), "Credentials accepted by SSO");

        check_title(&page)?;
        let ticket = capture(&TICKET_REGEX, TICKET_PATTERN, &page, "reading ticket")?
            .ok_or_else(|| ConnectError::protocol("reading ticket", "ticket not found in response"))?;

        info!(domain = %self.domain, "SSO handshake complete");
        Ok(SsoTicket { consumer, ticket })
    }

    fn embed_url(&self) -> String {
        format!("{}/sso/embed", garmin::sso_base(&self.domain))
    }

    fn signin_url(&self) -> ConnectResult<String> {
        let embed = self.embed_url();
        let url = Url::parse_with_params(
            &format!("{}/sso/signin", garmin::sso_base(&self.domain)),
            &[
                ("id", garmin::SSO_WIDGET_ID),
                ("embedWidget", "true"),
                ("gauthHost", embed.as_str()),
                ("service", embed.as_str()),
                ("source", embed.as_str()),
                ("redirectAfterAccountLoginUrl", embed.as_str()),
                ("redirectAfterAccountCreationUrl", embed.as_str()),
            ],
        )
        .map_err(|e| ConnectError::protocol("building signin URL", e.to_string()))?;
        Ok(url.into())
    }

    fn establish_cookies(&self, state: SsoState) -> ConnectResult<SsoState> {
        let gauth_host = format!("{}/sso", garmin::sso_base(&self.domain));
        let url = Url::parse_with_params(
            &self.embed_url(),
            &[
                ("id", garmin::SSO_WIDGET_ID),
                ("embedWidget", "true"),
                ("gauthHost", gauth_host.as_str()),
            ],
        )
        .map_err(|e| ConnectError::protocol("building embed URL", e.to_string()))?;

        let (state, _) = self.exchange(state, HttpRequest::get(url.as_str()), false, "sso embed")?;
        Ok(state)
    }

    fn fetch_csrf(&self, state: SsoState) -> ConnectResult<(SsoState, String)> {
        let request = HttpRequest::get(self.signin_url()?);
        let (state, response) = self.exchange(state, request, true, "sso signin page")?;
        let csrf = capture(
            &CSRF_REGEX,
            CSRF_PATTERN,
            &response.text(),
            "sso signin page",
        )?
        .ok_or_else(|| {
            ConnectError::protocol("sso signin page", "CSRF token not found in signin page")
        })?;
        Ok((state, csrf))
    }

    fn submit_credentials(
        &self,
        state: SsoState,
        email: &str,
        password: &str,
        csrf: &str,
    ) -> ConnectResult<(SsoState, String)> {
        let request = HttpRequest::post(self.signin_url()?).form(vec![
            ("username".to_owned(), email.to_owned()),
            ("password".to_owned(), password.to_owned()),
            ("embed".to_owned(), "true".to_owned()),
            ("_csrf".to_owned(), csrf.to_owned()),
        ]);
        let (state, response) = self.exchange(state, request, true, "sso login")?;
        Ok((state, response.text()))
    }

    /// Send a request and follow redirects, absorbing cookies on every hop
    fn exchange(
        &self,
        mut state: SsoState,
        mut request: HttpRequest,
        with_referer: bool,
        context: &str,
    ) -> ConnectResult<(SsoState, HttpResponse)> {
        request = request
            .header("User-Agent", client_headers::SSO_USER_AGENT)
            .timeout(network::AUTH_TIMEOUT);
        if with_referer {
            if let Some(referer) = &state.last_url {
                request = request.header("Referer", referer.clone());
            }
        }

        for _ in 0..=network::MAX_REDIRECTS {
            let mut outgoing = request.clone();
            if let Some(cookie) = state.cookies.header_value() {
                outgoing = outgoing.header("Cookie", cookie);
            }

            let response = self.transport.send(outgoing)?;
            state.cookies.absorb(&response);

            let location = response
                .header("location")
                .filter(|_| matches!(response.status, 301 | 302 | 303 | 307 | 308));
            let Some(location) = location else {
                state.last_url = Some(request.url.clone());
                if !response.is_success() {
                    warn!(context, status = response.status, "SSO step failed");
                    return Err(ConnectError::HttpStatus {
                        context: context.to_owned(),
                        status: response.status,
                        body: truncate_preview(&response.body, network::BODY_PREVIEW_LEN),
                    });
                }
                return Ok((state, response));
            };

            let next = Url::parse(&request.url)
                .and_then(|base| base.join(location))
                .map_err(|e| ConnectError::protocol(context, format!("bad redirect target: {e}")))?;
            debug!(context, status = response.status, "Following SSO redirect");

            let keep_method = matches!(response.status, 307 | 308)
                || (request.method == Method::Get && response.status != 303);
            request.url = next.into();
            if !keep_method {
                request.method = Method::Get;
                request.body = RequestBody::Empty;
            }
        }

        Err(ConnectError::protocol(
            context,
            format!("more than {} redirects", network::MAX_REDIRECTS),
        ))
    }
}

/// Classify the login result page by its title
fn check_title(page: &str) -> ConnectResult<()> {
    let title = capture(&TITLE_REGEX, TITLE_PATTERN, page, "reading login result")?
        .ok_or_else(|| ConnectError::protocol("reading login result", "no title in response"))?;
    if title.contains("MFA") {
        return Err(ConnectError::MfaRequired);
    }
    if title != "Success" {
        return Err(ConnectError::InvalidCredentials { title });
    }
    Ok(())
}

/// Compiled pattern, cached for the life of the process
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn capture(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
    haystack: &str,
    context: &str,
) -> ConnectResult<Option<String>> {
    let regex = compiled(cell, pattern)
        .ok_or_else(|| ConnectError::protocol(context, "extraction pattern failed to compile"))?;
    Ok(regex
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|matched| matched.as_str().to_owned()))
}
