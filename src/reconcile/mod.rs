// src/reconcile/mod.rs
mod order;

pub use order::extract_section_order;

use crate::registry::{Endpoint, EndpointKind, Registry};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to fetch instances: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to fetch instances with unexpected status code: {0}")]
    FetchStatus(reqwest::StatusCode),

    #[error("failed to parse instances JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct ApiGroupDetail {
    pub urls: Vec<String>,
    #[serde(default)]
    pub cors: bool,
}

/// Shape of the upstream instances file. Maps are unordered; declaration
/// order is recovered separately from the raw text.
#[derive(Debug, Deserialize)]
pub struct InstancesFile {
    #[serde(default)]
    pub api: HashMap<String, ApiGroupDetail>,
    #[serde(default)]
    pub ui: HashMap<String, Vec<String>>,
}

/// Net membership change of one reconciliation, as two independent set
/// differences over URLs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: usize,
    pub removed: usize,
}

impl ReconcileOutcome {
    pub fn membership_changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Fetches the instances file and merges it into the registry, keeping
/// history for every endpoint that survives the merge.
pub struct Reconciler {
    client: Client,
    instances_url: String,
    registry: Arc<Registry>,
}

impl Reconciler {
    pub fn new(client: Client, instances_url: String, registry: Arc<Registry>) -> Self {
        Self {
            client,
            instances_url,
            registry,
        }
    }

    /// One full reconciliation pass. On any fetch or parse error the
    /// registry is left exactly as it was.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let response = self.client.get(&self.instances_url).send().await?;
        if !response.status().is_success() {
            return Err(ReconcileError::FetchStatus(response.status()));
        }
        let body = response.text().await?;

        let outcome = self.apply(&body).await?;
        if outcome.membership_changed() {
            info!(
                "Instance list updated: {} added, {} removed",
                outcome.added, outcome.removed
            );
        }
        Ok(outcome)
    }

    /// Merge a raw instances payload into the registry. Split from
    /// `reconcile` so the merge is testable without a network fetch.
    pub async fn apply(&self, body: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let data: InstancesFile = serde_json::from_str(body)?;

        let api_order = extract_section_order(body, "api");
        let ui_order = extract_section_order(body, "ui");

        let current = self.registry.snapshot().await;
        let mut existing: HashMap<&str, &Arc<Endpoint>> =
            current.iter().map(|ep| (ep.url.as_str(), ep)).collect();

        let mut updated: Vec<Arc<Endpoint>> = Vec::new();
        let mut added = 0usize;
        let mut group_order = 0usize;

        for group in &api_order {
            if let Some(detail) = data.api.get(group) {
                for url in &detail.urls {
                    if let Some(ep) = existing.remove(url.as_str()) {
                        ep.reclassify(group.clone(), group_order, detail.cors).await;
                        updated.push(Arc::clone(ep));
                    } else {
                        added += 1;
                        updated.push(Arc::new(Endpoint::new(
                            url.clone(),
                            EndpointKind::Api,
                            group.clone(),
                            group_order,
                            detail.cors,
                        )));
                    }
                }
                group_order += 1;
            }
        }

        for group in &ui_order {
            if let Some(urls) = data.ui.get(group) {
                for url in urls {
                    if let Some(ep) = existing.remove(url.as_str()) {
                        // UI instances carry no CORS flag.
                        ep.reclassify(group.clone(), group_order, false).await;
                        updated.push(Arc::clone(ep));
                    } else {
                        added += 1;
                        updated.push(Arc::new(Endpoint::new(
                            url.clone(),
                            EndpointKind::Ui,
                            group.clone(),
                            group_order,
                            false,
                        )));
                    }
                }
                group_order += 1;
            }
        }

        // Whatever is left in the lookup map was not re-listed upstream.
        let removed = existing.len();

        for (i, ep) in updated.iter().enumerate() {
            ep.set_index(i + 1).await;
        }
        self.registry.replace(updated).await;

        Ok(ReconcileOutcome { added, removed })
    }
}
