//! Cross-cutting middleware for the gateway router

use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::error_response::{ensure_request_id, extract_request_id};
use crate::proxy::headers::X_REQUEST_ID;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

fn new_request_id() -> HeaderValue {
    // A hyphenated UUID is always a valid header value
    HeaderValue::from_str(&Uuid::now_v7().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Ensures every request carries an `x-request-id` and echoes it on the response
///
/// A client-supplied id is kept when it parses as a UUID; otherwise a fresh
/// v7 id replaces it.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|existing| existing.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .and_then(|uuid| HeaderValue::from_str(&uuid.to_string()).ok())
        .unwrap_or_else(new_request_id);

    request
        .headers_mut()
        .insert(X_REQUEST_ID, request_id.clone());

    let mut response = next.run(request).await;
    response.headers_mut().insert(X_REQUEST_ID, request_id);
    response
}

/// Logs request start and completion with timing
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = extract_request_id(request.headers()).unwrap_or_else(|| "unknown".into());

    info!(
        request_id = request_id,
        method = %method,
        path = path,
        "{}",
        messages::REQUEST_RECEIVED
    );

    let response = next.run(request).await;

    info!(
        request_id = request_id,
        method = %method,
        path = path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "{}",
        messages::REQUEST_COMPLETED
    );

    response
}

/// Logs failed responses generated by the gateway and stamps the request id on them
pub async fn error_handling_middleware(request: Request, next: Next) -> Response {
    let request_id = extract_request_id(request.headers());

    let mut response = next.run(request).await;
    let status = response.status();
    if status.is_server_error() {
        error!(
            request_id = request_id.as_deref().unwrap_or("unknown"),
            status = status.as_u16(),
            "{}",
            messages::REQUEST_FAILED
        );
    }

    if let Some(request_id) = request_id {
        ensure_request_id(&mut response, &request_id);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|request: Request| async move {
                    extract_request_id(request.headers()).unwrap_or_default()
                }),
            )
            .route(
                "/fail",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            )
            .layer(from_fn(error_handling_middleware))
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_request_id_generation() {
        let response = app()
            .oneshot(http::Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let request_id = response
            .headers()
            .get(X_REQUEST_ID)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let uuid = Uuid::parse_str(&request_id).unwrap();
        assert_eq!(uuid.get_version_num(), 7);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], request_id.as_bytes());
    }

    #[tokio::test]
    async fn test_valid_client_request_id_is_kept() {
        let client_id = Uuid::new_v4().to_string();
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/echo")
                    .header(X_REQUEST_ID, &client_id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), client_id.as_str());
    }

    #[tokio::test]
    async fn test_invalid_client_request_id_is_replaced() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/echo")
                    .header(X_REQUEST_ID, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let request_id = response.headers().get(X_REQUEST_ID).unwrap();
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_failed_responses_keep_request_id() {
        let response = app()
            .oneshot(http::Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }
}
