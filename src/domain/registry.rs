//! Service registry: the read-only routing table
//!
//! The registry is validated once when it is built. A reload builds a whole
//! new registry and swaps it into the [`RegistryHandle`] in one step, so
//! requests in flight keep matching against the table they started with.

use crate::domain::pattern::RouteMatch;
use crate::domain::service::{ServiceDescriptor, ServiceName};
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service '{0}' is registered more than once")]
    DuplicateService(String),

    #[error("route patterns '{first}' ({first_service}) and '{second}' ({second_service}) can match the same path")]
    AmbiguousPatterns {
        first_service: String,
        first: String,
        second_service: String,
        second: String,
    },

    #[error("service '{0}' requires authentication but no '{auth}' service is registered", auth = ServiceName::AUTHORIZATION)]
    MissingAuthorizationService(String),
}

/// A descriptor together with how it matched the request path
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub service: Arc<ServiceDescriptor>,
    pub matched: RouteMatch,
}

/// Immutable routing table, checked in registration order
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    pub fn new(descriptors: Vec<ServiceDescriptor>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        for descriptor in &descriptors {
            if !names.insert(descriptor.name.as_ref().to_string()) {
                return Err(RegistryError::DuplicateService(
                    descriptor.name.to_string(),
                ));
            }
        }

        for (index, first) in descriptors.iter().enumerate() {
            for second in &descriptors[index + 1..] {
                if first.pattern.overlaps(&second.pattern) {
                    return Err(RegistryError::AmbiguousPatterns {
                        first_service: first.name.to_string(),
                        first: first.pattern.to_string(),
                        second_service: second.name.to_string(),
                        second: second.pattern.to_string(),
                    });
                }
            }
        }

        if !names.contains(ServiceName::AUTHORIZATION) {
            if let Some(guarded) = descriptors.iter().find(|d| d.requires_auth) {
                return Err(RegistryError::MissingAuthorizationService(
                    guarded.name.to_string(),
                ));
            }
        }

        Ok(Self {
            services: descriptors.into_iter().map(Arc::new).collect(),
        })
    }

    /// First registered service whose pattern matches `path`
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        self.services.iter().find_map(|service| {
            service.matches(path).map(|matched| ResolvedRoute {
                service: Arc::clone(service),
                matched,
            })
        })
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services
            .iter()
            .find(|service| service.name.as_ref().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn authorization_service(&self) -> Option<Arc<ServiceDescriptor>> {
        self.by_name(ServiceName::AUTHORIZATION)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceDescriptor>> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Shared, atomically replaceable reference to the current registry
#[derive(Debug)]
pub struct RegistryHandle {
    current: ArcSwap<ServiceRegistry>,
}

impl RegistryHandle {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            current: ArcSwap::from_pointee(registry),
        }
    }

    /// Snapshot of the registry in effect right now
    pub fn load(&self) -> Arc<ServiceRegistry> {
        self.current.load_full()
    }

    /// Swap in a fully built replacement
    pub fn replace(&self, registry: ServiceRegistry) {
        self.current.store(Arc::new(registry));
    }
}
