// ABOUTME: Garmin Connect upload client: session resume, login, refresh, and multipart upload
// ABOUTME: Retries exactly once after a 401 and classifies duplicates and logical failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fitbridge_core::constants::{client_headers, garmin, network};
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::errors::truncate_preview;
use fitbridge_core::models::{OAuth1Credential, OAuth2Credential};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cache::CredentialCache;
use super::sso::AuthSession;
use super::tokens::{ConsumerSource, TokenExchanger};
use super::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials loaded
    Unauthenticated,
    /// Credentials loaded and the access token is current
    Valid,
    /// Credentials loaded but the access token has expired
    Expired,
    /// The last login attempt failed
    Failed,
}

#[derive(Debug)]
enum Session {
    Unauthenticated,
    Authenticated {
        oauth1: OAuth1Credential,
        oauth2: OAuth2Credential,
    },
    Failed,
}

/// Identifiers reported by a successful upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// `detailedImportResult.uploadId`, when present
    pub upload_id: Option<String>,
    /// `internalId` of every imported activity
    pub activity_ids: Vec<u64>,
}

/// Authenticated uploader for one Connect domain.
///
/// Not shareable across threads for uploads: `upload` takes `&mut self`.
pub struct UploadClient {
    transport: Arc<dyn HttpTransport>,
    consumers: Arc<ConsumerSource>,
    exchanger: TokenExchanger,
    cache: Box<dyn CredentialCache>,
    domain: String,
    session: Session,
}

impl UploadClient {
    /// Client fetching the consumer document from its public location
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Box<dyn CredentialCache>,
        domain: impl Into<String>,
    ) -> Self {
        let consumers = Arc::new(ConsumerSource::new(Arc::clone(&transport)));
        Self::with_consumers(transport, consumers, cache, domain)
    }

    /// Client sharing an existing consumer source
    pub fn with_consumers(
        transport: Arc<dyn HttpTransport>,
        consumers: Arc<ConsumerSource>,
        cache: Box<dyn CredentialCache>,
        domain: impl Into<String>,
    ) -> Self {
        let exchanger = TokenExchanger::new(Arc::clone(&transport), Arc::clone(&consumers));
        Self {
            transport,
            consumers,
            exchanger,
            cache,
            domain: domain.into(),
            session: Session::Unauthenticated,
        }
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        match &self.session {
            Session::Unauthenticated => SessionState::Unauthenticated,
            Session::Failed => SessionState::Failed,
            Session::Authenticated { oauth2, .. } if oauth2.is_expired() => SessionState::Expired,
            Session::Authenticated { .. } => SessionState::Valid,
        }
    }

    /// Connect domain in use
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Loaded credentials, if any
    #[must_use]
    pub fn credentials(&self) -> Option<(&OAuth1Credential, &OAuth2Credential)> {
        match &self.session {
            Session::Authenticated { oauth1, oauth2 } => Some((oauth1, oauth2)),
            _ => None,
        }
    }

    /// Restore a session from the credential cache.
    ///
    /// An expired access token is refreshed with the cached `OAuth1`
    /// credential. On failure the state is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::NotAuthenticated`] when either document is
    /// missing or unreadable, or the refresh fails.
    pub fn resume(&mut self) -> ConnectResult<()> {
        let (oauth1, oauth2) = match (self.cache.load_oauth1(), self.cache.load_oauth2()) {
            (Ok(Some(oauth1)), Ok(Some(oauth2))) => (oauth1, oauth2),
            (Err(e), _) | (_, Err(e)) => {
                return Err(ConnectError::NotAuthenticated {
                    reason: format!("credential cache unreadable: {e}"),
                })
            }
            _ => {
                return Err(ConnectError::NotAuthenticated {
                    reason: "no cached session".to_owned(),
                })
            }
        };

        let domain = oauth1
            .domain
            .clone()
            .filter(|domain| !domain.is_empty())
            .unwrap_or_else(|| self.domain.clone());

        let oauth2 = if oauth2.is_expired() {
            info!(domain = %domain, "Cached session expired, refreshing");
            let oauth2 = self
                .exchanger
                .refresh(&oauth1)
                .map_err(|e| ConnectError::NotAuthenticated {
                    reason: format!("refresh failed: {e}"),
                })?;
            self.persist_oauth2(&oauth2);
            oauth2
        } else {
            info!(domain = %domain, "Resumed cached session");
            oauth2
        };

        self.domain = domain;
        self.session = Session::Authenticated { oauth1, oauth2 };
        Ok(())
    }

    /// Log in with a username and password and cache both credentials.
    ///
    /// # Errors
    ///
    /// Propagates handshake and exchange failures; the client moves to
    /// [`SessionState::Failed`].
    pub fn login(&mut self, email: &str, password: &str) -> ConnectResult<()> {
        match self.authenticate(email, password) {
            Ok((oauth1, oauth2)) => {
                if let Err(e) = self.cache.store_oauth1(&oauth1) {
                    warn!(error = %e, "Could not cache OAuth1 token");
                }
                self.persist_oauth2(&oauth2);
                info!(domain = %self.domain, "Logged in");
                self.session = Session::Authenticated { oauth1, oauth2 };
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.session = Session::Failed;
                Err(e)
            }
        }
    }

    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> ConnectResult<(OAuth1Credential, OAuth2Credential)> {
        let sso = AuthSession::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.consumers),
            self.domain.clone(),
        );
        let ticket = sso.handshake(email, password)?;
        let oauth1 = self
            .exchanger
            .mint_oauth1(&ticket.consumer, &ticket.ticket, &self.domain)?;
        let oauth2 = self
            .exchanger
            .exchange_oauth2(&ticket.consumer, &oauth1, &self.domain)?;
        Ok((oauth1, oauth2))
    }

    /// Upload one FIT file.
    ///
    /// An already-expired token is refreshed first. A 401 triggers one
    /// refresh and one retry; nothing else is retried.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::NotAuthenticated`] without a session
    /// - [`ConnectError::Duplicate`] on 409
    /// - [`ConnectError::UploadRejected`] on any other error status, including a second 401
    /// - [`ConnectError::LogicalUploadFailure`] when a 2xx body lists failures
    pub fn upload(&mut self, path: &Path) -> ConnectResult<UploadOutcome> {
        if matches!(
            self.state(),
            SessionState::Unauthenticated | SessionState::Failed
        ) {
            return Err(ConnectError::NotAuthenticated {
                reason: "log in or resume a session before uploading".to_owned(),
            });
        }

        let bytes = fs::read(path)
            .map_err(|e| ConnectError::io(format!("reading {}", path.display()), e))?;
        let file_name = path.file_name().map_or_else(
            || "activity.fit".to_owned(),
            |name| name.to_string_lossy().into_owned(),
        );

        if self.state() == SessionState::Expired {
            self.refresh_session()?;
        }

        let mut response = self.send_upload(&file_name, &bytes)?;
        if response.status == 401 {
            warn!(file = %file_name, "Token rejected, refreshing and retrying once");
            self.refresh_session()?;
            response = self.send_upload(&file_name, &bytes)?;
        }

        let outcome = classify_upload(&response)?;
        info!(
            file = %file_name,
            upload_id = outcome.upload_id.as_deref().unwrap_or("-"),
            activities = outcome.activity_ids.len(),
            "Uploaded activity"
        );
        Ok(outcome)
    }

    fn refresh_session(&mut self) -> ConnectResult<()> {
        let Session::Authenticated { oauth1, .. } = &self.session else {
            return Err(ConnectError::NotAuthenticated {
                reason: "no session to refresh".to_owned(),
            });
        };
        let fresh = self.exchanger.refresh(oauth1)?;
        self.persist_oauth2(&fresh);
        if let Session::Authenticated { oauth2, .. } = &mut self.session {
            *oauth2 = fresh;
        }
        Ok(())
    }

    fn persist_oauth2(&self, oauth2: &OAuth2Credential) {
        if let Err(e) = self.cache.store_oauth2(oauth2) {
            warn!(error = %e, "Could not cache OAuth2 token");
        }
    }

    fn send_upload(&self, file_name: &str, bytes: &[u8]) -> ConnectResult<HttpResponse> {
        let Session::Authenticated { oauth2, .. } = &self.session else {
            return Err(ConnectError::NotAuthenticated {
                reason: "no session".to_owned(),
            });
        };
        let api_base = garmin::api_base(&self.domain);
        let backend = api_base.trim_start_matches("https://").to_owned();
        let request = HttpRequest::post(format!("{api_base}{}", garmin::UPLOAD_PATH))
            .header("Authorization", oauth2.bearer())
            .header("User-Agent", client_headers::API_USER_AGENT)
            .header("DI-Backend", backend)
            .header("NK", client_headers::NK)
            .multipart("file", file_name, bytes.to_vec())
            .timeout(network::UPLOAD_TIMEOUT);
        debug!(file = %file_name, bytes = bytes.len(), "Uploading");
        self.transport.send(request)
    }
}

/// Classify an upload response.
///
/// # Errors
///
/// Returns [`ConnectError::Duplicate`] for 409, [`ConnectError::UploadRejected`]
/// for other non-2xx statuses, and [`ConnectError::LogicalUploadFailure`] when a
/// 2xx JSON body lists failures. A 2xx body that is not JSON is a success.
pub fn classify_upload(response: &HttpResponse) -> ConnectResult<UploadOutcome> {
    if response.status == 409 {
        return Err(ConnectError::Duplicate);
    }
    if !response.is_success() {
        return Err(ConnectError::UploadRejected {
            status: response.status,
            body: truncate_preview(&response.body, network::BODY_PREVIEW_LEN),
        });
    }

    let Ok(body) = serde_json::from_slice::<Value>(&response.body) else {
        return Ok(UploadOutcome::default());
    };
    let Some(result) = body.get("detailedImportResult") else {
        return Ok(UploadOutcome::default());
    };

    if let Some(failures) = result
        .get("failures")
        .and_then(Value::as_array)
        .filter(|failures| !failures.is_empty())
    {
        return Err(ConnectError::LogicalUploadFailure {
            failures: failures.clone(),
        });
    }

    let upload_id = result.get("uploadId").and_then(|id| match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    });
    let activity_ids = result
        .get("successes")
        .and_then(Value::as_array)
        .map(|successes| {
            successes
                .iter()
                .filter_map(|success| success.get("internalId").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default();

    Ok(UploadOutcome {
        upload_id,
        activity_ids,
    })
}
