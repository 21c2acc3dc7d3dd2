//! Resource registry for managing resource descriptors and their routes

use axum::Router;
use std::collections::HashMap;

use crate::config::ApiConfig;

/// Trait that describes how to build routes for a resource
///
/// [`Resource`](super::Resource) implements it for any model; implement it
/// directly to expose a resource with hand-written routes.
pub trait ResourceDescriptor: Send + Sync {
    /// The resource name (singular, e.g., "product")
    fn name(&self) -> &str;

    /// Build the routes for this resource
    fn build_routes(&self, config: &ApiConfig) -> Router;
}

/// Registry for all resources of the application
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: HashMap<String, Box<dyn ResourceDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register a resource descriptor
    ///
    /// The resource name is the key; registering a name twice replaces the
    /// earlier descriptor.
    pub fn register(&mut self, descriptor: Box<dyn ResourceDescriptor>) {
        let name = descriptor.name().to_string();
        self.descriptors.insert(name, descriptor);
    }

    /// Build a router with the routes of every registered resource
    pub fn build_routes(&self, config: &ApiConfig) -> Router {
        let mut router = Router::new();

        for descriptor in self.descriptors.values() {
            router = router.merge(descriptor.build_routes(config));
        }

        router
    }

    /// Names of all registered resources, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
