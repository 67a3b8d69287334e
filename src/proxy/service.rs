//! Gateway service: router assembly and the per-request pipeline
//!
//! ```rust,ignore
//! use api_gateway::proxy::{GatewayService, ProxyConfig};
//!
//! let authorizers = Arc::new(HttpAuthorizerFactory::new(cipher.clone(), api_key, timeout));
//! let service = GatewayService::new(config, registry, cipher, authorizers);
//! let router = service.into_router();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4100").await?;
//! axum::serve(listener, router).await?;
//! ```
//!
//! Each proxied request is resolved against the registry, transformed,
//! checked by the authorization gate when the service requires it and then
//! dispatched upstream. Every failure is turned into a response where it
//! is detected; nothing is retried.
//!
//! The authorization gate follows the registry: when a reload brings a
//! different `AUTH` entry, the next guarded request builds a fresh
//! authorizer for it.

use crate::domain::{RegistryHandle, ServiceDescriptor, ServiceRegistry};
use crate::infrastructure::log_messages::{authorization, request_processing as messages};
use crate::infrastructure::{AuthorizerFactory, SecretCipher};
use crate::proxy::csrf::csrf_token_handler;
use crate::proxy::dispatcher::UpstreamDispatcher;
use crate::proxy::gate::AuthorizationGate;
use crate::proxy::headers::paths;
use crate::proxy::health::HealthReport;
use crate::proxy::middleware_stack::GatewayMiddlewareStack;
use crate::proxy::transform::RequestTransformer;
use crate::proxy::types::*;
use arc_swap::ArcSwapOption;
use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Gate built for one particular `AUTH` descriptor
struct BoundGate {
    auth_service: Arc<ServiceDescriptor>,
    gate: AuthorizationGate,
}

/// The gateway's request pipeline and its shared, read-only collaborators
pub struct GatewayService {
    config: ProxyConfig,
    registry: Arc<RegistryHandle>,
    transformer: RequestTransformer,
    authorizers: Arc<dyn AuthorizerFactory>,
    gate: ArcSwapOption<BoundGate>,
    dispatcher: UpstreamDispatcher,
    started: Instant,
}

impl GatewayService {
    pub fn new(
        config: ProxyConfig,
        registry: Arc<RegistryHandle>,
        cipher: Arc<SecretCipher>,
        authorizers: Arc<dyn AuthorizerFactory>,
    ) -> Self {
        let dispatcher = UpstreamDispatcher::new(&config);
        Self {
            transformer: RequestTransformer::new(cipher),
            authorizers,
            gate: ArcSwapOption::empty(),
            dispatcher,
            registry,
            config,
            started: Instant::now(),
        }
    }

    /// Handle for swapping in a new registry while serving
    pub fn registry(&self) -> Arc<RegistryHandle> {
        Arc::clone(&self.registry)
    }

    /// Run one proxied request through the pipeline
    pub async fn handle(&self, request: Request<Body>) -> ProxyResult<Response<Body>> {
        let registry = self.registry.load();
        let Some(route) = registry.resolve(request.uri().path()) else {
            info!(path = %request.uri().path(), "{}", messages::ROUTE_NOT_FOUND);
            return Err(ProxyError::RouteNotFound {
                path: request.uri().path().to_string(),
            });
        };

        let request = self.transformer.transform(request, &route)?;

        if route.service.requires_auth {
            let gate = self.gate_for(&registry)?;
            Result::<(), ProxyError>::from(gate.evaluate(request.headers()).await)?;
        }

        self.dispatcher.dispatch(request, &route.service).await
    }

    /// Gate for the `AUTH` entry of `registry`, rebuilt when that entry changed
    fn gate_for(&self, registry: &ServiceRegistry) -> ProxyResult<AuthorizationGate> {
        let auth_service = registry
            .authorization_service()
            .ok_or_else(|| ProxyError::unhandled("no AUTH service is registered"))?;

        if let Some(bound) = self.gate.load_full() {
            if Arc::ptr_eq(&bound.auth_service, &auth_service) {
                return Ok(bound.gate.clone());
            }
        }

        let authorizer = self
            .authorizers
            .build(&auth_service)
            .map_err(|e| ProxyError::unhandled(e.to_string()))?;
        let gate = AuthorizationGate::new(authorizer);
        info!(
            service = %auth_service.name,
            upstream = %auth_service.upstream,
            "{}",
            authorization::CLIENT_BUILT
        );
        self.gate.store(Some(Arc::new(BoundGate {
            auth_service,
            gate: gate.clone(),
        })));
        Ok(gate)
    }

    /// Create the axum router with the full middleware stack
    pub fn into_router(self) -> Router {
        let stack = GatewayMiddlewareStack::new(&self.config);

        let router = Router::new()
            .route(paths::HEALTH, get(health_handler))
            .route(paths::CSRF_TOKEN, get(csrf_token_handler))
            .fallback(gateway_handler)
            .with_state(Arc::new(self));

        stack.apply_to_router(router)
    }
}

async fn gateway_handler(
    State(gateway): State<Arc<GatewayService>>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    gateway.handle(request).await
}

async fn health_handler(State(gateway): State<Arc<GatewayService>>) -> HealthReport {
    HealthReport::since(gateway.started)
}
