//! Application bootstrap
//!
//! Turns loaded settings into the running gateway: cipher, registry,
//! authorization client and the HTTP listener.

pub mod app;

pub use app::Application;
