//! Unified error response handling for the gateway
//!
//! Every failure detected in the request pipeline is turned into a response
//! here. Bodies are `{"message": ...}`; unhandled faults add an
//! `innerException` with the diagnostic detail. Authorization rejections are
//! the exception: the authorization service's own status and body are
//! passed through untouched.

use crate::infrastructure::log_messages::responses;
use crate::proxy::headers::{CONTENT_TYPE, X_REQUEST_ID};
use crate::proxy::types::{FaultKind, ProxyError};
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
    /// Diagnostic detail for unhandled faults
    #[serde(rename = "innerException", skip_serializing_if = "Option::is_none")]
    pub inner_exception: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            inner_exception: None,
        }
    }

    pub fn with_inner_exception(mut self, detail: impl Into<String>) -> Self {
        self.inner_exception = Some(detail.into());
        self
    }

    /// Convert to HTTP response with the given status
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Convert to standardized error response
    fn to_error_response(&self) -> ErrorResponse;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for ProxyError {
    fn to_error_response(&self) -> ErrorResponse {
        use ProxyError::*;

        match self {
            AuthorizationRequired => ErrorResponse::new(responses::AUTHORIZATION_REQUIRED),
            BadAuthorization => ErrorResponse::new(responses::BAD_AUTHORIZATION),
            AuthorizationRejected(result) => {
                ErrorResponse::new(String::from_utf8_lossy(&result.body).into_owned())
            }
            UpstreamUnavailable { message } => ErrorResponse::new(message.clone()),
            RouteNotFound { .. } => ErrorResponse::new(responses::ROUTE_NOT_FOUND),
            InvalidCsrfToken => ErrorResponse::new(responses::INVALID_CSRF_TOKEN),
            InvalidRequestUri(uri) => ErrorResponse::new(format!("Invalid request URI: {uri}")),
            Fault(fault) => {
                let response = ErrorResponse::new(fault.message.clone());
                match (fault.kind, &fault.detail) {
                    (FaultKind::Unhandled, Some(detail)) => {
                        response.with_inner_exception(detail.clone())
                    }
                    _ => response,
                }
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        use ProxyError::*;

        match self {
            AuthorizationRequired | BadAuthorization => StatusCode::BAD_REQUEST,
            AuthorizationRejected(result) => result.status,
            UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RouteNotFound { .. } => StatusCode::NOT_FOUND,
            InvalidCsrfToken => StatusCode::FORBIDDEN,
            InvalidRequestUri(_) => StatusCode::BAD_REQUEST,
            Fault(fault) => match fault.kind {
                FaultKind::Unhandled => StatusCode::INTERNAL_SERVER_ERROR,
                FaultKind::Logical => StatusCode::NOT_ACCEPTABLE,
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::AuthorizationRejected(result) => {
                let mut response = Response::new(Body::from(result.body));
                *response.status_mut() = result.status;
                if let Some(content_type) = result.content_type {
                    response.headers_mut().insert(CONTENT_TYPE, content_type);
                }
                response
            }
            other => {
                let status = other.status_code();
                other
                    .to_error_response()
                    .into_response_with_status(status)
            }
        }
    }
}

/// Helper to extract request ID from headers
pub fn extract_request_id(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Copy a request ID onto a response when it is missing
pub fn ensure_request_id(response: &mut Response, request_id: &str) {
    if response.headers().contains_key(X_REQUEST_ID) {
        return;
    }
    if let Ok(header_value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, header_value);
    }
}
