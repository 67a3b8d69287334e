//! Routable backend services
//!
//! A [`ServiceDescriptor`] is immutable once built; the gateway shares them
//! between requests behind `Arc`s.

use crate::domain::pattern::{RouteMatch, RoutePattern};
use nutype::nutype;
use std::collections::HashSet;
use std::fmt;

/// Unique service name, normalised to upper case (`SHOP`, `AUTH`)
#[nutype(
    sanitize(trim, uppercase),
    validate(not_empty, len_char_max = 64, regex = r"^[A-Z][A-Z0-9_-]*$"),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display)
)]
pub struct ServiceName(String);

impl ServiceName {
    /// Name of the entry that locates the authorization service
    pub const AUTHORIZATION: &'static str = "AUTH";
}

/// Base URL of an upstream service, stored without a trailing slash
#[nutype(
    sanitize(trim, with = |url: String| url.trim_end_matches('/').to_string()),
    validate(predicate = |url: &str| url.starts_with("http://") || url.starts_with("https://")),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display)
)]
pub struct UpstreamUrl(String);

/// Shared secret a backend uses to recognise gateway traffic
#[nutype(validate(not_empty), derive(Clone, PartialEq, Eq, Deserialize, AsRef))]
pub struct ServiceSecret(String);

impl fmt::Debug for ServiceSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceSecret(***)")
    }
}

/// Everything the gateway knows about one backend
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: ServiceName,
    pub pattern: RoutePattern,
    pub upstream: UpstreamUrl,
    pub secret: ServiceSecret,
    pub requires_auth: bool,
    pub extended_header_paths: HashSet<String>,
    pub unavailable_message: Option<String>,
}

impl ServiceDescriptor {
    pub fn new(
        name: ServiceName,
        pattern: RoutePattern,
        upstream: UpstreamUrl,
        secret: ServiceSecret,
    ) -> Self {
        Self {
            name,
            pattern,
            upstream,
            secret,
            requires_auth: false,
            extended_header_paths: HashSet::new(),
            unavailable_message: None,
        }
    }

    pub fn requiring_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn with_extended_header_path(mut self, path: impl Into<String>) -> Self {
        self.extended_header_paths.insert(path.into());
        self
    }

    pub fn with_unavailable_message(mut self, message: impl Into<String>) -> Self {
        self.unavailable_message = Some(message.into());
        self
    }

    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        self.pattern.matches(path)
    }

    pub fn needs_extended_headers(&self, stripped_path: &str) -> bool {
        self.extended_header_paths.contains(stripped_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_normalisation() {
        let name = ServiceName::try_new(" shop ").unwrap();
        assert_eq!(name.as_ref(), "SHOP");
        assert!(ServiceName::try_new("").is_err());
        assert!(ServiceName::try_new("1SHOP").is_err());
        assert!(ServiceName::try_new("SHOP SERVICE").is_err());
    }

    #[test]
    fn test_upstream_url_validation() {
        let url = UpstreamUrl::try_new("http://localhost:4200/").unwrap();
        assert_eq!(url.as_ref(), "http://localhost:4200");
        assert!(UpstreamUrl::try_new("https://shop.internal").is_ok());
        assert!(UpstreamUrl::try_new("localhost:4200").is_err());
        assert!(UpstreamUrl::try_new("ftp://shop.internal").is_err());
    }

    #[test]
    fn test_service_secret_is_redacted() {
        let secret = ServiceSecret::try_new("super-secret").unwrap();
        assert_eq!(format!("{secret:?}"), "ServiceSecret(***)");
        assert_eq!(secret.as_ref(), "super-secret");
        assert!(ServiceSecret::try_new("").is_err());
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ServiceDescriptor::new(
            ServiceName::try_new("SHOP").unwrap(),
            RoutePattern::parse("/api/*/shop/*").unwrap(),
            UpstreamUrl::try_new("http://localhost:4200").unwrap(),
            ServiceSecret::try_new("shop-key").unwrap(),
        )
        .requiring_auth(true)
        .with_extended_header_path("/a/product")
        .with_unavailable_message("Shop service is unavailable.");

        assert!(descriptor.requires_auth);
        assert!(descriptor.needs_extended_headers("/a/product"));
        assert!(!descriptor.needs_extended_headers("/orders"));
        assert!(descriptor.matches("/api/v1/shop/orders").is_some());
        assert_eq!(
            descriptor.unavailable_message.as_deref(),
            Some("Shop service is unavailable.")
        );
    }
}
