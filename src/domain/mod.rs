//! Domain types for the gateway
//!
//! Routing patterns, service descriptors, the service registry and the
//! authorization outcomes the gate works with.

pub mod auth;
pub mod config_types;
pub mod pattern;
pub mod registry;
pub mod service;

pub use auth::{AuthDecision, AuthorizationResult};
pub use pattern::{PatternError, RouteMatch, RoutePattern};
pub use registry::{RegistryError, RegistryHandle, ResolvedRoute, ServiceRegistry};
pub use service::{ServiceDescriptor, ServiceName, ServiceSecret, UpstreamUrl};
