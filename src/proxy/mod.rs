//! Request pipeline of the gateway
//!
//! Resolve → transform → authorize → dispatch, wrapped in the middleware
//! stack (request ids, logging, CORS, key casing, CSRF).

pub mod casing;
pub mod csrf;
pub mod dispatcher;
pub mod error_response;
pub mod failure;
pub mod gate;
pub mod headers;
pub mod health;
pub mod middleware;
pub mod middleware_stack;
pub mod service;
pub mod transform;
pub mod types;
pub mod url_resolver;

pub use service::GatewayService;
pub use types::{FaultKind, ProxyConfig, ProxyError, ProxyResult};
