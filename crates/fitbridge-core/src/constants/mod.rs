// ABOUTME: Protocol constants organized by domain: FIT sentinels, Garmin endpoints, client headers
// ABOUTME: Centralizes magic values shared by the codec, corrector, and Connect client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module

/// Reserved "no measurement" values per FIT base type
pub mod fit_invalid {
    /// `uint8` / `enum` invalid value
    pub const UINT8: u8 = 0xFF;
    /// `uint16` invalid value
    pub const UINT16: u16 = 0xFFFF;
    /// `sint8` invalid value
    pub const SINT8: i8 = 0x7F;
    /// `uint32z` invalid value
    pub const UINT32Z: u32 = 0;
}

/// Identity written into every corrected file
pub mod spoof_device {
    /// Garmin manufacturer id
    pub const MANUFACTURER: u16 = 1;
    /// fēnix 6S Pro product id
    pub const PRODUCT: u16 = 3288;
    /// Serial number shared by every spoofed device entry
    pub const SERIAL_NUMBER: u32 = 3_420_897_194;
}

/// Garmin Connect hosts and paths
pub mod garmin {
    /// Default Connect domain
    pub const DEFAULT_DOMAIN: &str = "garmin.com";
    /// Public document carrying the shared mobile-app consumer key/secret
    pub const OAUTH_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";
    /// Widget id the mobile app presents to the SSO pages
    pub const SSO_WIDGET_ID: &str = "gauth-widget";
    /// Path of the preauthorized (ticket → `OAuth1`) endpoint on the API host
    pub const PREAUTHORIZED_PATH: &str = "/oauth-service/oauth/preauthorized";
    /// Path of the `OAuth1` → `OAuth2` exchange endpoint on the API host
    pub const EXCHANGE_PATH: &str = "/oauth-service/oauth/exchange/user/2.0";
    /// Path of the activity upload endpoint on the API host
    pub const UPLOAD_PATH: &str = "/upload-service/upload";

    /// SSO host for a domain
    #[must_use]
    pub fn sso_base(domain: &str) -> String {
        format!("https://sso.{domain}")
    }

    /// API host for a domain
    #[must_use]
    pub fn api_base(domain: &str) -> String {
        format!("https://connectapi.{domain}")
    }
}

/// Fixed client-identifying header values; the upstream service rejects unknown clients
pub mod client_headers {
    /// User-Agent for SSO pages and token endpoints
    pub const SSO_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";
    /// User-Agent for API upload calls
    pub const API_USER_AGENT: &str = "GCM-iOS-5.19.1.2";
    /// `NK` header value required by the upload endpoint
    pub const NK: &str = "NT";
}

/// Network deadlines and diagnostic limits
pub mod network {
    use std::time::Duration;

    /// Deadline for SSO pages and token calls
    pub const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
    /// Deadline for a single upload attempt
    pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
    /// Maximum redirect hops followed during the SSO handshake
    pub const MAX_REDIRECTS: usize = 10;
    /// Bytes of a response body kept in error messages
    pub const BODY_PREVIEW_LEN: usize = 300;
}

/// Local file naming
pub mod files {
    /// Name of the cached `OAuth1` document
    pub const OAUTH1_FILE: &str = "oauth1_token.json";
    /// Name of the cached `OAuth2` document
    pub const OAUTH2_FILE: &str = "oauth2_token.json";
    /// Suffix appended to a source file to mark it synced
    pub const SYNCED_SUFFIX: &str = ".synced";
    /// Prefix of the files the producer writes for the newest activity
    pub const ACTIVITY_PREFIX: &str = "MyNewActivity-";
    /// FIT file extension
    pub const FIT_EXTENSION: &str = "fit";
    /// Default number of days scanned for unsynced files
    pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
    /// Default credential directory under the home directory
    pub const DEFAULT_TOKEN_DIR_NAME: &str = ".fitbridge";
}
