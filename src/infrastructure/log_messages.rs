//! Log message constants for infrastructure components
//!
//! This module centralizes the log messages used throughout the gateway so
//! that log queries and alerts can rely on stable text. Variable details are
//! attached as structured `tracing` fields, never interpolated.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting API gateway";
    pub const LISTENING: &str = "API gateway listening";
    pub const SERVICE_REGISTERED: &str = "Service registered";
    pub const SHUTTING_DOWN: &str = "API gateway shutting down";
    pub const INVALID_PORT: &str = "PORT is not a valid port number, using the default";
}

/// Request/response processing messages
pub mod request_processing {
    pub const REQUEST_RECEIVED: &str = "Incoming request";
    pub const REQUEST_COMPLETED: &str = "Request completed";
    pub const REQUEST_FAILED: &str = "Request failed";
    pub const ROUTE_NOT_FOUND: &str = "No service registered for path";
    pub const REQUEST_FORWARDED: &str = "Request forwarded to upstream";
    pub const UPSTREAM_UNAVAILABLE: &str = "Upstream service unavailable";
    pub const RESPONSE_CASING_SKIPPED: &str = "Response body is not a JSON document, casing skipped";
    pub const RESPONSE_CASING_OVERSIZED: &str =
        "Response body exceeds the casing limit, forwarded as-is";
}

/// Authorization gate and client messages
pub mod authorization {
    pub const HEADER_MISSING: &str = "Authorization header missing";
    pub const HEADER_MALFORMED: &str = "Authorization header is not a bearer credential";
    pub const REJECTED: &str = "Authorization service rejected credential";
    pub const ALLOWED: &str = "Authorization service accepted credential";
    pub const SERVICE_UNREACHABLE: &str = "Authorization service unreachable";
    pub const SERVICE_TIMEOUT: &str = "Authorization service timed out";
    pub const CANCELLED: &str = "Authorization call cancelled by caller";
    pub const CLIENT_BUILT: &str = "Authorization client built for AUTH service";
    pub const API_KEY_FALLBACK: &str =
        "No authorization API key configured, presenting the AUTH service secret";
}

/// CSRF protection messages
pub mod csrf {
    pub const TOKEN_ISSUED: &str = "CSRF token issued";
    pub const TOKEN_REJECTED: &str = "CSRF token missing or invalid";
}

/// Messages returned to callers in response bodies
pub mod responses {
    pub const AUTHORIZATION_REQUIRED: &str = "AUTHORIZATION IS REQUIRED";
    pub const BAD_AUTHORIZATION: &str = "BAD AUTHORIZATION";
    pub const SERVICE_UNAVAILABLE: &str = "Service is unavailable.";
    pub const SHOP_SERVICE_UNAVAILABLE: &str = "Shop service is unavailable.";
    pub const AUTHORIZATION_UNAVAILABLE: &str = "Authorization service is unavailable.";
    pub const AUTHORIZATION_TIMEOUT: &str = "Authorization service timed out.";
    pub const AUTHORIZATION_CANCELLED: &str = "Authorization was cancelled.";
    pub const INVALID_CSRF_TOKEN: &str = "Invalid CSRF Token";
    pub const UNHANDLED_EXCEPTION: &str = "Unhandled Exception";
    pub const ROUTE_NOT_FOUND: &str = "Route not found";
    pub const HEALTH_OK: &str = "OK";
    pub const HEALTH_UNAVAILABLE: &str = "Service Unavailable";
}
