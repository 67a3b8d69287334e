//! Authorization outcomes
//!
//! Both types are derived per request and never stored.

use bytes::Bytes;
use http::{HeaderValue, StatusCode};

/// What the authorization service said about a bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub allowed: bool,
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
}

impl AuthorizationResult {
    pub fn allowed(status: StatusCode, body: Bytes) -> Self {
        Self {
            allowed: true,
            status,
            body,
            content_type: None,
        }
    }

    pub fn rejected(status: StatusCode, body: Bytes) -> Self {
        Self {
            allowed: false,
            status,
            body,
            content_type: None,
        }
    }

    /// Rejection produced locally when the service itself could not answer
    pub fn unreachable(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "message": message }).to_string();
        Self {
            allowed: false,
            status,
            body: Bytes::from(body),
            content_type: Some(HeaderValue::from_static("application/json")),
        }
    }

    pub fn with_content_type(mut self, content_type: Option<HeaderValue>) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Terminal state of the authorization gate for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    RejectedNoHeader,
    RejectedMalformedHeader,
    RejectedByAuthService(AuthorizationResult),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed)
    }
}
