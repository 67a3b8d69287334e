//! Target URL resolution and path handling for proxied requests

use crate::domain::UpstreamUrl;
use crate::proxy::headers::paths;
use crate::proxy::types::*;
use hyper::Uri;

/// Strategy for composing upstream URIs
pub struct UrlResolver;

impl UrlResolver {
    /// Resolve the final URI for the outgoing request
    ///
    /// The upstream base URL is joined with the already-stripped request
    /// path; the original query string is kept as-is.
    pub fn resolve_target_uri(
        upstream: &UpstreamUrl,
        stripped_path: &str,
        query: Option<&str>,
    ) -> ProxyResult<Uri> {
        let path = if stripped_path.is_empty() {
            paths::DEFAULT
        } else {
            stripped_path
        };

        let final_uri_str = match query {
            Some(query) => format!("{}{path}?{query}", upstream.as_ref()),
            None => format!("{}{path}", upstream.as_ref()),
        };

        final_uri_str
            .parse()
            .map_err(|_| ProxyError::InvalidRequestUri(final_uri_str))
    }

    /// Path-and-query form of a stripped path, for the rewritten inbound request
    pub fn path_and_query(stripped_path: &str, query: Option<&str>) -> ProxyResult<Uri> {
        let uri_str = match query {
            Some(query) => format!("{stripped_path}?{query}"),
            None => stripped_path.to_string(),
        };
        uri_str
            .parse()
            .map_err(|_| ProxyError::InvalidRequestUri(uri_str))
    }
}
