//! Response key casing
//!
//! Every JSON response leaving the gateway has its object keys rewritten:
//! keys of the root object get their first character lower-cased, while
//! keys at any deeper level have each ASCII capital replaced by `_` and its
//! lower-case form (`userName` → `user_name`, `Id` → `_id`). Elements of a
//! root array count as nested.

use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::headers::{is_json_content_type, CONTENT_LENGTH, CONTENT_TYPE};
use crate::proxy::types::{ProxyError, ResponseSizeLimit};
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures_util::{future, stream, StreamExt};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tracing::debug;

/// Rewrite the keys of a JSON document
pub fn convert_keys(value: Value) -> Value {
    convert(value, true)
}

fn convert(value: Value, is_root: bool) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let key = if is_root { root_key(&key) } else { nested_key(&key) };
                    (key, convert(value, false))
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|item| convert(item, false)).collect())
        }
        other => other,
    }
}

/// First character lower-cased, the rest untouched
pub fn root_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every ASCII capital becomes `_` followed by its lower-case form
pub fn nested_key(key: &str) -> String {
    let mut converted = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            converted.push('_');
            converted.push(c.to_ascii_lowercase());
        } else {
            converted.push(c);
        }
    }
    converted
}

/// Middleware applying [`convert_keys`] to JSON responses
///
/// Bodies are buffered up to `limit`. A larger body, or anything that does
/// not parse as JSON, is passed on with its original bytes.
pub async fn key_casing_middleware(
    State(limit): State<ResponseSizeLimit>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_json_content_type);
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match buffer_within(body, *limit.as_ref()).await {
        Ok(Buffered::Complete(bytes)) => bytes,
        Ok(Buffered::Overflow(body)) => {
            debug!(limit = %limit, "{}", messages::RESPONSE_CASING_OVERSIZED);
            return Response::from_parts(parts, body);
        }
        Err(e) => {
            return ProxyError::unhandled(format!("reading response body: {e}")).into_response()
        }
    };

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(document) => match serde_json::to_vec(&convert_keys(document)) {
            Ok(rewritten) => Body::from(rewritten),
            Err(_) => Body::from(bytes),
        },
        Err(_) => {
            debug!("{}", messages::RESPONSE_CASING_SKIPPED);
            Body::from(bytes)
        }
    };

    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

enum Buffered {
    Complete(Bytes),
    /// Limit exceeded; the read prefix followed by the unread rest
    Overflow(Body),
}

async fn buffer_within(mut body: Body, limit: usize) -> Result<Buffered, axum::Error> {
    let mut buffered = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let Ok(data) = frame?.into_data() else {
            continue;
        };
        buffered.extend_from_slice(&data);
        if buffered.len() > limit {
            let prefix = stream::once(future::ready(Ok::<_, axum::Error>(buffered.freeze())));
            let rest = prefix.chain(body.into_data_stream());
            return Ok(Buffered::Overflow(Body::from_stream(rest)));
        }
    }
    Ok(Buffered::Complete(buffered.freeze()))
}
