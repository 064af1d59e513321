// src/registry/mod.rs
mod endpoint;

pub use endpoint::{Check, Endpoint, EndpointKind, EndpointState};

use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered collection of tracked endpoints. The list itself is guarded by
/// one coarse lock; endpoint internals have their own locks, so replacing
/// the list on reconcile never waits on an in-flight probe.
pub struct Registry {
    endpoints: RwLock<Vec<Arc<Endpoint>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(Vec::new()),
        }
    }

    /// Stable iteration snapshot: clones the Arcs, not the endpoints.
    pub async fn snapshot(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    pub async fn find(&self, url: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .read()
            .await
            .iter()
            .find(|ep| ep.url == url)
            .cloned()
    }

    /// Atomically swap in a freshly reconciled list.
    pub async fn replace(&self, endpoints: Vec<Arc<Endpoint>>) {
        let mut list = self.endpoints.write().await;
        *list = endpoints;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
