// ABOUTME: Minimal cookie store threaded through the SSO handshake
// ABOUTME: Single-host jar: absorbs Set-Cookie headers and renders a Cookie header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use super::transport::HttpResponse;

/// Cookies set by the identity provider.
///
/// Every handshake request goes to the same SSO host, so domain and path
/// attributes are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Store cookies from every `Set-Cookie` header of a response
    pub fn absorb(&mut self, response: &HttpResponse) {
        for header in response.header_values("set-cookie") {
            self.absorb_header(header);
        }
    }

    fn absorb_header(&mut self, header: &str) {
        let mut parts = header.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let expired = parts.any(|attribute| {
            attribute
                .trim()
                .split_once('=')
                .is_some_and(|(key, value)| key.eq_ignore_ascii_case("max-age") && value.trim() == "0")
        });
        if expired {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_owned(), value.trim().to_owned());
        }
    }

    /// `Cookie` header value, `None` when empty
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Value of one cookie
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Number of cookies held
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether no cookies are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
