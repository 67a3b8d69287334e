//! Cookie-backed CSRF protection
//!
//! `GET /csrf-token` hands out a token bound to a per-client secret kept in
//! the `_csrf` cookie. Requests with an unsafe method must echo a valid
//! token in one of the CSRF token headers.
//!
//! Token layout: `<salt>-<base64url(sha256("<salt>-<secret>"))>`.

use crate::infrastructure::log_messages::csrf as messages;
use crate::proxy::headers::{COOKIE, CSRF_COOKIE, CSRF_TOKEN_HEADERS, SET_COOKIE};
use crate::proxy::types::ProxyError;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenBody {
    pub csrf_token: String,
}

/// Fresh random per-client secret
pub fn generate_secret() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// Token for `secret` with a fresh random salt
pub fn create_token(secret: &str) -> String {
    let salt = URL_SAFE_NO_PAD.encode(&Uuid::new_v4().as_bytes()[..6]);
    token_for(&salt, secret)
}

fn token_for(salt: &str, secret: &str) -> String {
    let digest = Sha256::digest(format!("{salt}-{secret}").as_bytes());
    format!("{salt}-{}", URL_SAFE_NO_PAD.encode(digest))
}

/// Check `token` against `secret`
pub fn verify_token(secret: &str, token: &str) -> bool {
    let Some((salt, _)) = token.split_once('-') else {
        return false;
    };
    if salt.is_empty() {
        return false;
    }
    token_for(salt, secret)
        .as_bytes()
        .ct_eq(token.as_bytes())
        .into()
}

/// Value of a named cookie across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    CSRF_TOKEN_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// `GET /csrf-token`
pub async fn csrf_token_handler(headers: HeaderMap) -> Response {
    let existing = cookie_value(&headers, CSRF_COOKIE);
    let secret = existing.clone().unwrap_or_else(generate_secret);
    let token = create_token(&secret);

    let mut response = Json(CsrfTokenBody { csrf_token: token }).into_response();
    if existing.is_none() {
        let cookie = format!("{CSRF_COOKIE}={secret}; Path=/; HttpOnly; SameSite=Strict");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => return ProxyError::unhandled(format!("csrf cookie: {e}")).into_response(),
        }
    }
    debug!(new_secret = existing.is_none(), "{}", messages::TOKEN_ISSUED);
    response
}

/// Rejects unsafe requests lacking a token that matches the cookie secret
pub async fn csrf_middleware(request: Request, next: Next) -> Result<Response, ProxyError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let valid = match (cookie_value(headers, CSRF_COOKIE), presented_token(headers)) {
        (Some(secret), Some(token)) => verify_token(&secret, token),
        _ => false,
    };
    if !valid {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "{}",
            messages::TOKEN_REJECTED
        );
        return Err(ProxyError::InvalidCsrfToken);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::headers::paths;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use http::StatusCode;
    use tower::ServiceExt;

    #[test]
    fn test_token_verifies_against_its_secret() {
        let secret = generate_secret();
        let token = create_token(&secret);
        assert!(verify_token(&secret, &token));
        assert!(!verify_token(&generate_secret(), &token));
    }

    #[test]
    fn test_tokens_are_salted() {
        let secret = generate_secret();
        assert_ne!(create_token(&secret), create_token(&secret));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let secret = generate_secret();
        assert!(!verify_token(&secret, ""));
        assert!(!verify_token(&secret, "nodash"));
        assert!(!verify_token(&secret, "-digest"));
    }

    #[test]
    fn test_same_length_forgery_rejected() {
        let secret = generate_secret();
        let token = create_token(&secret);
        let (salt, digest) = token.split_once('-').unwrap();
        let forged = format!("{salt}-{}", "A".repeat(digest.len()));
        assert_eq!(forged.len(), token.len());
        assert!(!verify_token(&secret, &forged));
    }

    #[test]
    fn test_every_token_header_is_accepted() {
        for name in CSRF_TOKEN_HEADERS {
            let mut headers = HeaderMap::new();
            headers.insert(name, HeaderValue::from_static("salt-digest"));
            assert_eq!(presented_token(&headers), Some("salt-digest"), "{name}");
        }
        assert!(CSRF_TOKEN_HEADERS.contains(&"xsrf-token"));
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; _csrf=abc123"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, "_csrf").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "other").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    fn app() -> Router {
        Router::new()
            .route(paths::CSRF_TOKEN, get(csrf_token_handler))
            .route("/orders", get(|| async { "list" }).post(|| async { "created" }))
            .layer(from_fn(csrf_middleware))
    }

    #[tokio::test]
    async fn test_issue_then_submit() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri(paths::CSRF_TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let token = body["csrfToken"].as_str().unwrap().to_string();

        let response = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header(COOKIE, cookie)
                    .header("x-csrf-token", token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_existing_cookie_is_reused() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri(paths::CSRF_TOKEN)
                    .header(COOKIE, "_csrf=known-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(verify_token("known-secret", body["csrfToken"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn test_unsafe_method_without_token_is_forbidden() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header(COOKIE, "_csrf=known-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"message":"Invalid CSRF Token"}"#);
    }

    #[tokio::test]
    async fn test_safe_methods_pass() {
        let response = app()
            .oneshot(http::Request::builder().uri("/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
