// ABOUTME: Pluggable blocking HTTP transport used by the SSO handshake, token exchange, and upload
// ABOUTME: Redirects are never followed here; callers that need them follow them explicitly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use fitbridge_core::constants::network;
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use reqwest::blocking::{multipart, Client};
use reqwest::redirect::Policy;
use reqwest::Error as ReqwestError;
use tracing::debug;
use url::Url;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Upper-case method name, as used in OAuth signature base strings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
    /// `multipart/form-data` with a single file part
    Multipart {
        /// Form field name
        field: String,
        /// File name reported for the part
        file_name: String,
        /// File content
        bytes: Vec<u8>,
    },
}

/// Outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL including query
    pub url: String,
    /// Headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Payload
    pub body: RequestBody,
    /// Deadline for the whole call
    pub timeout: Duration,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: network::AUTH_TIMEOUT,
        }
    }

    /// GET request
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// POST request
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a form body
    #[must_use]
    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    /// Set a single-file multipart body
    #[must_use]
    pub fn multipart(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        };
        self
    }

    /// Override the deadline
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// First header value with this name, case-insensitive
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Method and URL without the query string, safe for logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} {}", self.method.as_str(), strip_query(&self.url))
    }
}

/// Response as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Headers in received order; repeated headers appear repeatedly
    pub headers: Vec<(String, String)>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// First header value with this name, case-insensitive
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).next()
    }

    /// Every value of a header, case-insensitive
    pub fn header_values<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, lossy
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking HTTP transport
pub trait HttpTransport: Send + Sync {
    /// Send one request without following redirects
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Transport`] when no response was received.
    fn send(&self, request: HttpRequest) -> ConnectResult<HttpResponse>;
}

/// [`HttpTransport`] over a blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the underlying client with redirects disabled
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Transport`] if the TLS backend cannot be initialized.
    pub fn new() -> ConnectResult<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConnectError::transport("building HTTP client", e.to_string(), false))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> ConnectResult<HttpResponse> {
        let context = request.describe();
        debug!(request = %context, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let part = multipart::Part::bytes(bytes).file_name(file_name);
                builder.multipart(multipart::Form::new().part(field, part))
            }
        };

        let response = builder
            .send()
            .map_err(|e| transport_error(&context, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| transport_error(&context, e))?
            .to_vec();

        debug!(request = %context, status, bytes = body.len(), "Received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// reqwest renders the full URL, query included, into its message
fn transport_error(context: &str, error: ReqwestError) -> ConnectError {
    let timed_out = error.is_timeout();
    ConnectError::transport(context, error.without_url().to_string(), timed_out)
}

fn strip_query(raw: &str) -> String {
    Url::parse(raw).map_or_else(
        |_| raw.split('?').next().unwrap_or(raw).to_owned(),
        |mut url| {
            url.set_query(None);
            url.to_string()
        },
    )
}
