//! Upstream dispatch for transformed requests
//!
//! Forwards the request to the service's upstream and streams the response
//! back unchanged. Requests tagged with [`ExtendedHeaderBuffers`] go
//! through a second client whose HTTP/1 read buffer is enlarged.

use crate::domain::ServiceDescriptor;
use crate::infrastructure::log_messages::request_processing as messages;
use crate::proxy::failure::FailureTranslator;
use crate::proxy::transform::{ExtendedHeaderBuffers, OriginalPath};
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use axum::body::Body;
use hyper::{Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::{Duration, Instant};
use tracing::debug;

type UpstreamClient = Client<HttpConnector, Body>;

#[derive(Clone)]
pub struct UpstreamDispatcher {
    client: UpstreamClient,
    extended_client: UpstreamClient,
    timeout: Duration,
}

impl UpstreamDispatcher {
    pub fn new(config: &ProxyConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http1_preserve_header_case(true)
            .build_http();

        let extended_client = Client::builder(TokioExecutor::new())
            .http1_preserve_header_case(true)
            .http1_max_buf_size(*config.extended_header_buffer.as_ref())
            .build_http();

        Self {
            client,
            extended_client,
            timeout: config.upstream_timeout,
        }
    }

    /// Forward a transformed request to `service`
    ///
    /// Dropping the returned future aborts the upstream call.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        service: &ServiceDescriptor,
    ) -> ProxyResult<Response<Body>> {
        let start_time = Instant::now();
        let (mut parts, body) = request.into_parts();

        let original_path = parts
            .extensions
            .remove::<OriginalPath>()
            .map(|OriginalPath(path)| path)
            .unwrap_or_else(|| parts.uri.path().to_string());
        let extended = parts.extensions.remove::<ExtendedHeaderBuffers>().is_some();

        parts.uri =
            UrlResolver::resolve_target_uri(&service.upstream, parts.uri.path(), parts.uri.query())?;
        let target = parts.uri.clone();

        let client = if extended {
            &self.extended_client
        } else {
            &self.client
        };

        let response = match tokio::time::timeout(
            self.timeout,
            client.request(Request::from_parts(parts, body)),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                return Err(FailureTranslator::unavailable(service, &original_path, &error))
            }
            Err(_) => {
                let cause = format!("no response within {:?}", self.timeout);
                return Err(FailureTranslator::unavailable(service, &original_path, &cause));
            }
        };

        debug!(
            service = %service.name,
            target = %target,
            status = response.status().as_u16(),
            extended_headers = extended,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "{}",
            messages::REQUEST_FORWARDED
        );

        Ok(response.map(Body::new))
    }
}
