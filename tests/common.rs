// ABOUTME: Shared test utilities and fixtures for integration tests
// ABOUTME: Provides FIT fixture builders, a scripted HTTP transport, and an in-memory credential cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `fitbridge`

use std::collections::VecDeque;
use std::env;
use std::sync::{Arc, Mutex, Once};

use chrono::Utc;
use fitbridge::connect::{CredentialCache, HttpRequest, HttpResponse, HttpTransport};
use fitbridge::errors::connect::{ConnectError, ConnectResult};
use fitbridge::fit::profile::{device_info, file_id, mesg_num, record, session, TIMESTAMP};
use fitbridge::fit::{encode, BaseType, FitFile, FitHeader, Message};
use fitbridge::models::{OAuth1Credential, OAuth2Credential};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// FIT fixtures
// ============================================================================

/// First record timestamp used by fixtures
pub const START_TIME: u32 = 1_100_000_000;

/// One record sample; `None` means the field holds its sentinel
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub power: Option<u16>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,
}

impl Sample {
    pub const fn new(power: u16, heart_rate: u8, cadence: u8) -> Self {
        Self {
            power: Some(power),
            heart_rate: Some(heart_rate),
            cadence: Some(cadence),
        }
    }

    pub const fn empty() -> Self {
        Self {
            power: None,
            heart_rate: None,
            cadence: None,
        }
    }
}

/// Session aggregates written by the fixture; `None` means sentinel
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAverages {
    pub power: Option<u16>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,
}

/// A producer-style activity: `file_id`, two `device_info`, records, one session
pub fn producer_activity(samples: &[Sample], averages: SessionAverages) -> FitFile {
    let mut fit = FitFile::new(FitHeader::default());

    fit.messages.push(
        Message::new(mesg_num::FILE_ID)
            .with(file_id::TYPE, BaseType::ENUM, 4)
            .with(file_id::MANUFACTURER, BaseType::UINT16, 331)
            .with(file_id::PRODUCT, BaseType::UINT16, 0)
            .with(file_id::SERIAL_NUMBER, BaseType::UINT32Z, 12345)
            .with(file_id::TIME_CREATED, BaseType::UINT32, u64::from(START_TIME)),
    );

    for index in 0..2_u64 {
        fit.messages.push(
            Message::new(mesg_num::DEVICE_INFO)
                .with(TIMESTAMP, BaseType::UINT32, u64::from(START_TIME))
                .with(device_info::DEVICE_INDEX, BaseType::UINT8, index)
                .with(device_info::MANUFACTURER, BaseType::UINT16, 331)
                .with(device_info::SERIAL_NUMBER, BaseType::UINT32Z, 777 + index)
                .with(device_info::PRODUCT, BaseType::UINT16, 0),
        );
    }

    for (offset, sample) in (0_u64..).zip(samples) {
        fit.messages.push(
            Message::new(mesg_num::RECORD)
                .with(TIMESTAMP, BaseType::UINT32, u64::from(START_TIME) + offset)
                .with(
                    record::HEART_RATE,
                    BaseType::UINT8,
                    sample.heart_rate.map_or(0xFF, u64::from),
                )
                .with(
                    record::CADENCE,
                    BaseType::UINT8,
                    sample.cadence.map_or(0xFF, u64::from),
                )
                .with(
                    record::POWER,
                    BaseType::UINT16,
                    sample.power.map_or(0xFFFF, u64::from),
                )
                .with(record::TEMPERATURE, BaseType::SINT8, 25),
        );
    }

    let end = u64::from(START_TIME) + samples.len() as u64;
    fit.messages.push(
        Message::new(mesg_num::SESSION)
            .with(TIMESTAMP, BaseType::UINT32, end)
            .with(session::START_TIME, BaseType::UINT32, u64::from(START_TIME))
            .with(session::SPORT, BaseType::ENUM, 2)
            .with(
                session::AVG_HEART_RATE,
                BaseType::UINT8,
                averages.heart_rate.map_or(0xFF, u64::from),
            )
            .with(
                session::AVG_CADENCE,
                BaseType::UINT8,
                averages.cadence.map_or(0xFF, u64::from),
            )
            .with(
                session::AVG_POWER,
                BaseType::UINT16,
                averages.power.map_or(0xFFFF, u64::from),
            ),
    );

    fit
}

/// Encoded producer activity
pub fn producer_activity_bytes(samples: &[Sample], averages: SessionAverages) -> Vec<u8> {
    encode(&producer_activity(samples, averages)).unwrap()
}

/// Ten identical samples: 200 W, 150 bpm, 90 rpm
pub fn steady_samples() -> Vec<Sample> {
    vec![Sample::new(200, 150, 90); 10]
}

// ============================================================================
// Scripted HTTP transport
// ============================================================================

/// Transport that replays queued responses and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ConnectResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response
    pub fn push(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: ConnectError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL contains `fragment`
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.contains(fragment))
            .collect()
    }

    /// Responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> ConnectResult<HttpResponse> {
        let description = request.describe();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ConnectError::transport(
                    description,
                    "no scripted response",
                    false,
                ))
            })
    }
}

/// Response with a status and body
pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// Redirect to `location`, optionally setting a cookie
pub fn redirect(status: u16, location: &str, cookie: Option<&str>) -> HttpResponse {
    let mut headers = vec![("Location".to_owned(), location.to_owned())];
    if let Some(cookie) = cookie {
        headers.push(("Set-Cookie".to_owned(), cookie.to_owned()));
    }
    HttpResponse {
        status,
        headers,
        body: Vec::new(),
    }
}

/// 200 response setting one cookie
pub fn with_cookie(body: &str, cookie: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: vec![("Set-Cookie".to_owned(), cookie.to_owned())],
        body: body.as_bytes().to_vec(),
    }
}

pub const CONSUMER_JSON: &str = r#"{"consumer_key":"ck","consumer_secret":"cs"}"#;
pub const SIGNIN_PAGE: &str =
    r#"<form><input type="hidden" name="_csrf" value="csrf-token-1"/></form>"#;
pub const SUCCESS_PAGE: &str = r#"<html><head><title>Success</title></head><body><script>var u = "https://sso.garmin.com/sso/embed?ticket=ST-42-abc-cas";</script></body></html>"#;
pub const PREAUTHORIZED_BODY: &str = "oauth_token=o1-token&oauth_token_secret=o1-secret";

/// OAuth2 exchange response body
pub fn oauth2_body(access_token: &str, expires_in: i64) -> String {
    format!(
        r#"{{"scope":"CONNECT_WRITE","jti":"j","token_type":"Bearer","access_token":"{access_token}","refresh_token":"r","expires_in":{expires_in},"refresh_token_expires_in":7200}}"#
    )
}

/// Queue a full successful login: consumer, embed, signin page, login, preauthorized, exchange
pub fn script_login(transport: &ScriptedTransport, access_token: &str) {
    transport.push(response(200, CONSUMER_JSON));
    transport.push(with_cookie("<html>embed</html>", "GARMIN-SSO=1; Path=/"));
    transport.push(response(200, SIGNIN_PAGE));
    transport.push(response(200, SUCCESS_PAGE));
    transport.push(response(200, PREAUTHORIZED_BODY));
    transport.push(response(200, &oauth2_body(access_token, 3600)));
}

// ============================================================================
// In-memory credential cache
// ============================================================================

#[derive(Debug, Default)]
pub struct CacheContents {
    pub oauth1: Option<OAuth1Credential>,
    pub oauth2: Option<OAuth2Credential>,
    pub oauth1_stores: usize,
    pub oauth2_stores: usize,
}

/// Credential cache whose contents stay inspectable after it is boxed
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialCache {
    contents: Arc<Mutex<CacheContents>>,
}

impl MemoryCredentialCache {
    pub fn with(oauth1: Option<OAuth1Credential>, oauth2: Option<OAuth2Credential>) -> Self {
        let cache = Self::default();
        {
            let mut contents = cache.contents.lock().unwrap();
            contents.oauth1 = oauth1;
            contents.oauth2 = oauth2;
        }
        cache
    }

    pub fn oauth2(&self) -> Option<OAuth2Credential> {
        self.contents.lock().unwrap().oauth2.clone()
    }

    pub fn oauth1(&self) -> Option<OAuth1Credential> {
        self.contents.lock().unwrap().oauth1.clone()
    }

    pub fn oauth2_stores(&self) -> usize {
        self.contents.lock().unwrap().oauth2_stores
    }
}

impl CredentialCache for MemoryCredentialCache {
    fn load_oauth1(&self) -> ConnectResult<Option<OAuth1Credential>> {
        Ok(self.contents.lock().unwrap().oauth1.clone())
    }

    fn load_oauth2(&self) -> ConnectResult<Option<OAuth2Credential>> {
        Ok(self.contents.lock().unwrap().oauth2.clone())
    }

    fn store_oauth1(&self, credential: &OAuth1Credential) -> ConnectResult<()> {
        let mut contents = self.contents.lock().unwrap();
        contents.oauth1 = Some(credential.clone());
        contents.oauth1_stores += 1;
        Ok(())
    }

    fn store_oauth2(&self, credential: &OAuth2Credential) -> ConnectResult<()> {
        let mut contents = self.contents.lock().unwrap();
        contents.oauth2 = Some(credential.clone());
        contents.oauth2_stores += 1;
        Ok(())
    }
}

pub fn oauth1_credential(domain: &str) -> OAuth1Credential {
    OAuth1Credential {
        oauth_token: "o1-token".to_owned(),
        oauth_token_secret: "o1-secret".to_owned(),
        mfa_token: None,
        mfa_expiration: None,
        domain: Some(domain.to_owned()),
    }
}

/// OAuth2 credential expiring `seconds_from_now` seconds from now (negative = expired)
pub fn oauth2_credential(access_token: &str, seconds_from_now: i64) -> OAuth2Credential {
    let now = Utc::now().timestamp();
    OAuth2Credential {
        scope: "CONNECT_WRITE".to_owned(),
        jti: "j".to_owned(),
        token_type: "Bearer".to_owned(),
        access_token: access_token.to_owned(),
        refresh_token: "r".to_owned(),
        expires_in: 3600,
        expires_at: now + seconds_from_now,
        refresh_token_expires_in: 7200,
        refresh_token_expires_at: now + 7200,
    }
}
