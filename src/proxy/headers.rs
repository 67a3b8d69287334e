//! HTTP header constants and utilities for the gateway
//!
//! This module centralizes all HTTP header names and header-related
//! constants used throughout the gateway to ensure consistency
//! and make maintenance easier.

use ::http::header;

/// Header carrying the encrypted service secret to backends
///
/// Always set by the gateway; a client-supplied value is overwritten.
pub const API_KEY_HEADER: &str = "api_key";

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Literal an `Authorization` value must start with to be sent for verification
pub const BEARER_PREFIX: &str = "Bearer";

/// Headers a client may use to present a CSRF token
pub const CSRF_TOKEN_HEADERS: [&str; 4] =
    ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Cookie holding the per-client CSRF secret
pub const CSRF_COOKIE: &str = "_csrf";

/// Standard header re-exports for convenience
pub use header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, SET_COOKIE};

/// Well-known paths
pub mod paths {
    /// Default path when none is specified
    pub const DEFAULT: &str = "/";

    /// Health check endpoint path
    pub const HEALTH: &str = "/health";

    /// CSRF token issuing endpoint path
    pub const CSRF_TOKEN: &str = "/csrf-token";
}

/// Content types the gateway inspects or produces
pub mod content_types {
    pub const JSON: &str = "application/json";
}

/// Whether a `Content-Type` value denotes JSON (`application/json`, `application/problem+json`, ...)
pub fn is_json_content_type(value: &str) -> bool {
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == content_types::JSON
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}
