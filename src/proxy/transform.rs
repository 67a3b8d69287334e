//! Request transformation for proxied requests
//!
//! Strips the matched route prefix from the path, stamps the encrypted
//! service secret into the `api_key` header and tags requests that need
//! larger header buffers on the upstream connection.

use crate::domain::ResolvedRoute;
use crate::infrastructure::SecretCipher;
use crate::proxy::headers::API_KEY_HEADER;
use crate::proxy::types::{ProxyError, ProxyResult};
use crate::proxy::url_resolver::UrlResolver;
use http::{HeaderValue, Request};
use std::sync::Arc;

/// Marks a request whose upstream connection needs an enlarged header buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeaderBuffers;

/// The inbound path before prefix stripping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPath(pub String);

#[derive(Debug, Clone)]
pub struct RequestTransformer {
    cipher: Arc<SecretCipher>,
}

impl RequestTransformer {
    pub fn new(cipher: Arc<SecretCipher>) -> Self {
        Self { cipher }
    }

    pub fn transform<B>(&self, request: Request<B>, route: &ResolvedRoute) -> ProxyResult<Request<B>> {
        let (mut parts, body) = request.into_parts();

        let original = parts.uri.path().to_string();
        let stripped = route.matched.strip(&original).to_string();
        parts.uri = UrlResolver::path_and_query(&stripped, parts.uri.query())?;

        // `insert` drops every client-supplied value for the header
        let secret = self.cipher.encrypt(route.service.secret.as_ref());
        let secret = HeaderValue::from_str(&secret)
            .map_err(|e| ProxyError::unhandled(format!("encrypted secret header: {e}")))?;
        parts.headers.insert(API_KEY_HEADER, secret);

        if route.service.needs_extended_headers(&stripped) {
            parts.extensions.insert(ExtendedHeaderBuffers);
        }
        parts.extensions.insert(OriginalPath(original));

        Ok(Request::from_parts(parts, body))
    }
}
