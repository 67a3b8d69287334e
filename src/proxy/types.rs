//! Type definitions for the proxy module

use crate::domain::AuthorizationResult;
use nutype::nutype;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ========== Size Types ==========

/// Maximum size of a response body the gateway will buffer, in bytes
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size > 0),
)]
pub struct ResponseSizeLimit(usize);

/// HTTP/1 read buffer size for upstream connections that carry large headers
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, Deserialize, Serialize, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size >= 8192),
)]
pub struct HeaderBufferSize(usize);

/// Gateway request-pipeline configuration
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Bound on the call to the authorization service
    pub authorization_timeout: Duration,
    /// Bound on the proxied upstream call (until response headers arrive)
    pub upstream_timeout: Duration,
    /// Largest JSON response the key-casing transform will buffer
    pub max_response_size: ResponseSizeLimit,
    /// Read buffer for requests flagged as needing extended headers
    pub extended_header_buffer: HeaderBufferSize,
    /// Whether unsafe methods must carry a valid CSRF token
    pub csrf_enabled: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            authorization_timeout: Duration::from_secs(5),
            upstream_timeout: Duration::from_secs(10),
            max_response_size: ResponseSizeLimit::try_new(10 * 1024 * 1024)
                .expect("10MB is valid"),
            extended_header_buffer: HeaderBufferSize::try_new(64 * 1024)
                .expect("64KB is valid"),
            csrf_enabled: true,
        }
    }
}

/// Tag distinguishing unexpected faults from expected rule rejections
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Unexpected fault, surfaced with diagnostic detail
    Unhandled,
    /// Expected business-rule rejection, surfaced with just a message
    Logical,
}

/// A tagged internal failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    pub detail: Option<String>,
}

impl Fault {
    pub fn unhandled(detail: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Unhandled,
            message: crate::infrastructure::log_messages::responses::UNHANDLED_EXCEPTION
                .to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn logical(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Logical,
            message: message.into(),
            detail: None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors that can occur while handling a gateway request
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Authorization header is required")]
    AuthorizationRequired,

    #[error("Authorization header is not a bearer credential")]
    BadAuthorization,

    #[error("Authorization service rejected the request with status {}", .0.status)]
    AuthorizationRejected(AuthorizationResult),

    #[error("Upstream service unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("No service registered for path {path}")]
    RouteNotFound { path: String },

    #[error("Invalid CSRF token")]
    InvalidCsrfToken,

    #[error("Invalid request URI: {0}")]
    InvalidRequestUri(String),

    #[error("{0}")]
    Fault(Fault),
}

impl ProxyError {
    pub fn unhandled(detail: impl Into<String>) -> Self {
        Self::Fault(Fault::unhandled(detail))
    }

    pub fn logical(message: impl Into<String>) -> Self {
        Self::Fault(Fault::logical(message))
    }
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
