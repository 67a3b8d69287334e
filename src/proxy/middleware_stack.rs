//! Middleware stack builder for clean composition
//!
//! Composes the Tower middleware around the gateway router so that the
//! ordering lives in one place and can be tested on its own.

use crate::proxy::casing::key_casing_middleware;
use crate::proxy::csrf::csrf_middleware;
use crate::proxy::middleware::*;
use crate::proxy::types::{ProxyConfig, ResponseSizeLimit};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::cors::CorsLayer;

/// Builder for composing the gateway middleware stack
#[derive(Clone, Debug)]
pub struct GatewayMiddlewareStack {
    casing_limit: ResponseSizeLimit,
    csrf_enabled: bool,
}

impl GatewayMiddlewareStack {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            casing_limit: config.max_response_size,
            csrf_enabled: config.csrf_enabled,
        }
    }

    /// Apply the complete middleware stack to a router
    ///
    /// Outer to inner:
    /// 1. Request ID generation/propagation
    /// 2. Logging (with request ID)
    /// 3. Permissive CORS
    /// 4. Error logging
    /// 5. Response key casing
    /// 6. CSRF verification (when enabled)
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = if self.csrf_enabled {
            router.layer(from_fn(csrf_middleware))
        } else {
            router
        };

        router
            .layer(from_fn_with_state(self.casing_limit, key_casing_middleware))
            .layer(from_fn(error_handling_middleware))
            .layer(CorsLayer::permissive())
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
    }

    /// Stack without CSRF verification
    pub fn without_csrf(mut self) -> Self {
        self.csrf_enabled = false;
        self
    }
}
