//! API gateway - a reverse proxy in front of internal HTTP services
//!
//! Inbound requests are matched against a registry of services, have the
//! matched route prefix stripped and an encrypted shared secret attached,
//! are checked against an external authorization service when the target
//! requires it, and are then forwarded to the service's upstream.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod proxy;

pub use application::Application;
pub use error::{Error, Result};
