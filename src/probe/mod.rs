// src/probe/mod.rs
use crate::registry::{Check, Endpoint, EndpointKind};
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Diagnostic query appended to API instance URLs; UI instances are
/// probed at their URL as-is.
const API_PROBE_SUFFIX: &str = "/search/?s=kanye";

/// Executes one health probe per endpoint, all in parallel, and records
/// each outcome into that endpoint's history.
pub struct Prober {
    client: Client,
    max_history: usize,
}

impl Prober {
    pub fn new(timeout: Duration, max_history: usize) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, max_history }
    }

    pub fn probe_target(endpoint: &Endpoint) -> String {
        match endpoint.kind {
            EndpointKind::Api => format!("{}{}", endpoint.url, API_PROBE_SUFFIX),
            EndpointKind::Ui => endpoint.url.clone(),
        }
    }

    /// Probe every endpoint in the slice concurrently; returns once the
    /// last probe has finished and its result is recorded.
    pub async fn run_cycle(self: &Arc<Self>, endpoints: Vec<Arc<Endpoint>>) {
        info!("Starting check cycle for {} instances", endpoints.len());
        let start = Instant::now();

        let mut tasks = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let prober = self.clone();
            tasks.push(tokio::spawn(async move {
                prober.probe(&endpoint).await;
            }));
        }
        futures::future::join_all(tasks).await;

        info!("Check cycle completed in {:?}", start.elapsed());
    }

    /// One GET against the endpoint's probe target. A transport failure or
    /// timeout is a data point, never an error: it records status 0 with
    /// the failure description.
    pub async fn probe(&self, endpoint: &Endpoint) {
        let target = Self::probe_target(endpoint);
        let timestamp = Utc::now();
        let start = Instant::now();

        let check = match self.client.get(&target).send().await {
            Ok(response) => {
                let status = response.status();
                Check {
                    timestamp,
                    status_code: status.as_u16(),
                    response_time: start.elapsed().as_millis() as i64,
                    success: status.is_success(),
                    error: None,
                }
            }
            Err(err) => Check {
                timestamp,
                status_code: 0,
                response_time: start.elapsed().as_millis() as i64,
                success: false,
                error: Some(err.to_string()),
            },
        };

        debug!(
            "{} ({:?}): success={}, status={}, time={}ms",
            endpoint.url, endpoint.kind, check.success, check.status_code, check.response_time
        );

        endpoint.push_check(check, self.max_history).await;
    }
}
