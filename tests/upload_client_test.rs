// ABOUTME: Integration tests for the upload client session lifecycle and retry policy
// ABOUTME: Covers resume, login, proactive refresh, single retry on 401, and result classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use common::{
    init_test_logging, oauth1_credential, oauth2_body, oauth2_credential, response,
    script_login, MemoryCredentialCache, ScriptedTransport, CONSUMER_JSON, PREAUTHORIZED_BODY,
    SIGNIN_PAGE, SUCCESS_PAGE,
};
use fitbridge::connect::{HttpTransport, RequestBody, SessionState, UploadClient};
use fitbridge::constants::client_headers;
use fitbridge::errors::connect::ConnectError;
use tempfile::TempDir;

const UPLOAD_OK: &str = r#"{"detailedImportResult":{"uploadId":9001,"successes":[{"internalId":123456}],"failures":[]}}"#;

fn client(transport: &Arc<ScriptedTransport>, cache: &MemoryCredentialCache) -> UploadClient {
    let shared: Arc<dyn HttpTransport> = transport.clone();
    UploadClient::new(shared, Box::new(cache.clone()), "garmin.com")
}

fn activity_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("MyNewActivity-3.8.5_2025-01-02_030405.fit");
    fs::write(&path, b"fit bytes").unwrap();
    (dir, path)
}

fn resumed(transport: &Arc<ScriptedTransport>, cache: &MemoryCredentialCache) -> UploadClient {
    let mut client = client(transport, cache);
    client.resume().unwrap();
    client
}

fn valid_cache() -> MemoryCredentialCache {
    MemoryCredentialCache::with(
        Some(oauth1_credential("garmin.com")),
        Some(oauth2_credential("access-1", 3600)),
    )
}

#[test]
fn test_resume_from_cache_without_network() {
    init_test_logging();
    let transport = ScriptedTransport::new();
    let cache = valid_cache();

    let client = resumed(&transport, &cache);

    assert_eq!(client.state(), SessionState::Valid);
    assert!(transport.requests().is_empty());
    assert_eq!(client.credentials().unwrap().1.access_token, "access-1");
}

#[test]
fn test_upload_sends_expected_request() {
    let transport = ScriptedTransport::new();
    let cache = valid_cache();
    let mut client = resumed(&transport, &cache);
    let (_dir, path) = activity_file();
    transport.push(response(202, UPLOAD_OK));

    let outcome = client.upload(&path).unwrap();

    assert_eq!(outcome.upload_id.as_deref(), Some("9001"));
    assert_eq!(outcome.activity_ids, vec![123_456]);

    let request = &transport.requests()[0];
    assert_eq!(
        request.url,
        "https://connectapi.garmin.com/upload-service/upload"
    );
    assert_eq!(request.header_value("Authorization"), Some("Bearer access-1"));
    assert_eq!(
        request.header_value("User-Agent"),
        Some(client_headers::API_USER_AGENT)
    );
    assert_eq!(
        request.header_value("DI-Backend"),
        Some("connectapi.garmin.com")
    );
    assert_eq!(request.header_value("NK"), Some(client_headers::NK));
    match &request.body {
        RequestBody::Multipart {
            field,
            file_name,
            bytes,
        } => {
            assert_eq!(field, "file");
            assert_eq!(file_name, "MyNewActivity-3.8.5_2025-01-02_030405.fit");
            assert_eq!(bytes, b"fit bytes");
        }
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[test]
fn test_duplicate_is_not_retried() {
    let transport = ScriptedTransport::new();
    let cache = valid_cache();
    let mut client = resumed(&transport, &cache);
    let (_dir, path) = activity_file();
    transport.push(response(409, r#"{"detailedImportResult":{"failures":[{}]}}"#));

    let result = client.upload(&path);

    assert!(matches!(result, Err(ConnectError::Duplicate)));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_unauthorized_refreshes_and_retries_once() {
    let transport = ScriptedTransport::new();
    let cache = valid_cache();
    let mut client = resumed(&transport, &cache);
    let (_dir, path) = activity_file();
    transport.push(response(401, "token revoked"));
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(200, &oauth2_body("access-2", 3600)));
    transport.push(response(201, UPLOAD_OK));

    let outcome = client.upload(&path).unwrap();

    assert_eq!(outcome.activity_ids, vec![123_456]);
    let uploads = transport.requests_to("/upload-service/upload");
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].header_value("Authorization"), Some("Bearer access-1"));
    assert_eq!(uploads[1].header_value("Authorization"), Some("Bearer access-2"));
    assert_eq!(cache.oauth2().unwrap().access_token, "access-2");
    assert_eq!(cache.oauth2_stores(), 1);
}

#[test]
fn test_second_unauthorized_is_surfaced() {
    let transport = ScriptedTransport::new();
    let cache = valid_cache();
    let mut client = resumed(&transport, &cache);
    let (_dir, path) = activity_file();
    transport.push(response(401, "token revoked"));
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(200, &oauth2_body("access-2", 3600)));
    transport.push(response(401, "still revoked"));

    let result = client.upload(&path);

    assert!(matches!(
        result,
        Err(ConnectError::UploadRejected { status: 401, .. })
    ));
    assert_eq!(transport.requests_to("/upload-service/upload").len(), 2);
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn test_logical_failure_in_success_body() {
    let transport = ScriptedTransport::new();
    let cache = valid_cache();
    let mut client = resumed(&transport, &cache);
    let (_dir, path) = activity_file();
    transport.push(response(
        200,
        r#"{"detailedImportResult":{"uploadId":1,"successes":[],"failures":[{"messages":[{"code":202,"content":"Duplicate Activity."}]}]}}"#,
    ));

    let result = client.upload(&path);
    assert!(matches!(
        result,
        Err(ConnectError::LogicalUploadFailure { ref failures }) if failures.len() == 1
    ));
}

#[test]
fn test_expired_cache_is_refreshed_on_resume() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::with(
        Some(oauth1_credential("garmin.com")),
        Some(oauth2_credential("stale", -10)),
    );
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(200, &oauth2_body("fresh", 3600)));

    let client = resumed(&transport, &cache);

    assert_eq!(client.state(), SessionState::Valid);
    assert_eq!(cache.oauth2().unwrap().access_token, "fresh");
}

#[test]
fn test_failed_refresh_on_resume_is_not_authenticated() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::with(
        Some(oauth1_credential("garmin.com")),
        Some(oauth2_credential("stale", -10)),
    );
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(401, "oauth1 revoked"));

    let mut client = client(&transport, &cache);
    let result = client.resume();

    assert!(matches!(result, Err(ConnectError::NotAuthenticated { .. })));
    assert_eq!(client.state(), SessionState::Unauthenticated);
}

#[test]
fn test_expired_token_is_refreshed_before_upload() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::default();
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(200, "<html>embed</html>"));
    transport.push(response(200, SIGNIN_PAGE));
    transport.push(response(200, SUCCESS_PAGE));
    transport.push(response(200, PREAUTHORIZED_BODY));
    transport.push(response(200, &oauth2_body("short-lived", 0)));

    let mut client = client(&transport, &cache);
    client.login("rider@example.com", "hunter2").unwrap();
    assert_eq!(client.state(), SessionState::Expired);

    let (_dir, path) = activity_file();
    transport.push(response(200, &oauth2_body("renewed", 3600)));
    transport.push(response(200, UPLOAD_OK));

    client.upload(&path).unwrap();

    let uploads = transport.requests_to("/upload-service/upload");
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].header_value("Authorization"), Some("Bearer renewed"));
    assert_eq!(client.state(), SessionState::Valid);
}

#[test]
fn test_partial_cache_does_not_resume() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::with(Some(oauth1_credential("garmin.com")), None);
    let (_dir, path) = activity_file();

    let mut client = client(&transport, &cache);
    assert!(matches!(
        client.resume(),
        Err(ConnectError::NotAuthenticated { .. })
    ));
    assert_eq!(client.state(), SessionState::Unauthenticated);

    assert!(matches!(
        client.upload(&path),
        Err(ConnectError::NotAuthenticated { .. })
    ));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_login_caches_both_documents() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::default();
    script_login(&transport, "access-login");

    let mut client = client(&transport, &cache);
    client.login("rider@example.com", "hunter2").unwrap();

    assert_eq!(client.state(), SessionState::Valid);
    assert_eq!(cache.oauth1().unwrap().oauth_token, "o1-token");
    assert_eq!(cache.oauth1().unwrap().domain.as_deref(), Some("garmin.com"));
    assert_eq!(cache.oauth2().unwrap().access_token, "access-login");
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn test_failed_login_marks_session_failed() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::default();
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(200, "<html>embed</html>"));
    transport.push(response(200, SIGNIN_PAGE));
    transport.push(response(200, "<html><title>Sign In</title></html>"));
    let (_dir, path) = activity_file();

    let mut client = client(&transport, &cache);
    let result = client.login("rider@example.com", "wrong");

    assert!(matches!(
        result,
        Err(ConnectError::InvalidCredentials { .. })
    ));
    assert_eq!(client.state(), SessionState::Failed);
    assert!(cache.oauth1().is_none());
    assert!(matches!(
        client.upload(&path),
        Err(ConnectError::NotAuthenticated { .. })
    ));
}

#[test]
fn test_resume_adopts_cached_domain() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::with(
        Some(oauth1_credential("garmin.cn")),
        Some(oauth2_credential("access-cn", 3600)),
    );
    let mut client = resumed(&transport, &cache);
    assert_eq!(client.domain(), "garmin.cn");

    let (_dir, path) = activity_file();
    transport.push(response(200, "OK"));
    client.upload(&path).unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.url, "https://connectapi.garmin.cn/upload-service/upload");
    assert_eq!(request.header_value("DI-Backend"), Some("connectapi.garmin.cn"));
}

#[test]
fn test_failed_refresh_keeps_configured_domain() {
    let transport = ScriptedTransport::new();
    let cache = MemoryCredentialCache::with(
        Some(oauth1_credential("garmin.cn")),
        Some(oauth2_credential("stale-cn", -10)),
    );
    transport.push(response(200, CONSUMER_JSON));
    transport.push(response(401, "oauth1 revoked"));

    let mut client = client(&transport, &cache);
    assert!(client.resume().is_err());

    assert_eq!(client.domain(), "garmin.com");
    assert_eq!(client.state(), SessionState::Unauthenticated);
    // The refresh itself still targets the credential's own domain
    assert!(transport.requests_to("/oauth-service/oauth/exchange")[0]
        .url
        .starts_with("https://connectapi.garmin.cn"));
}
