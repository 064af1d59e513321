// src/snapshot/mod.rs
use crate::registry::{Check, EndpointKind, Registry};
use chrono::Utc;
use serde::Serialize;

/// Read-only view of one endpoint plus its derived metrics.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointView {
    pub group: String,
    pub url: String,
    pub instance_type: EndpointKind,
    pub cors: bool,
    pub group_order: usize,
    pub index: usize,
    pub checks: Vec<Check>,
    pub uptime: f64,
    pub avg_response_time: i64,
    pub last_check: Option<Check>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_instances: usize,
    pub up_instances: usize,
    pub avg_uptime: f64,
}

/// Full dashboard payload, built fresh on every request.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub instances: Vec<EndpointView>,
    pub stats: Stats,
    pub timestamp: i64,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serialization of these derive-only types cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

pub fn uptime_percent(checks: &[Check]) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    let successful = checks.iter().filter(|c| c.success).count();
    (successful as f64 / checks.len() as f64) * 100.0
}

pub fn avg_response_time(checks: &[Check]) -> i64 {
    if checks.is_empty() {
        return 0;
    }
    let total: i64 = checks.iter().map(|c| c.response_time).sum();
    total / checks.len() as i64
}

/// Build the endpoint views under a single pass of per-endpoint read locks.
pub async fn build_views(registry: &Registry) -> Vec<EndpointView> {
    let endpoints = registry.snapshot().await;
    let mut views = Vec::with_capacity(endpoints.len());

    for ep in endpoints {
        let state = ep.read_state().await;
        let checks: Vec<Check> = state.checks.iter().cloned().collect();
        views.push(EndpointView {
            group: state.group.clone(),
            url: ep.url.clone(),
            instance_type: ep.kind,
            cors: state.cors,
            group_order: state.group_order,
            index: state.index,
            uptime: uptime_percent(&checks),
            avg_response_time: avg_response_time(&checks),
            last_check: checks.last().cloned(),
            checks,
        });
    }
    views
}

pub async fn build_stats(registry: &Registry) -> Stats {
    let endpoints = registry.snapshot().await;
    let total_instances = endpoints.len();
    let mut up_instances = 0usize;
    let mut total_uptime = 0.0f64;

    for ep in &endpoints {
        let state = ep.read_state().await;
        if state.checks.back().map(|c| c.success).unwrap_or(false) {
            up_instances += 1;
        }
        let checks: Vec<Check> = state.checks.iter().cloned().collect();
        total_uptime += uptime_percent(&checks);
    }

    let avg_uptime = if total_instances > 0 {
        total_uptime / total_instances as f64
    } else {
        0.0
    };

    Stats {
        total_instances,
        up_instances,
        avg_uptime,
    }
}

pub async fn build_snapshot(registry: &Registry) -> Snapshot {
    Snapshot {
        instances: build_views(registry).await,
        stats: build_stats(registry).await,
        timestamp: Utc::now().timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Endpoint;
    use std::sync::Arc;

    fn check(success: bool, response_time: i64) -> Check {
        Check {
            timestamp: Utc::now(),
            status_code: if success { 200 } else { 500 },
            response_time,
            success,
            error: None,
        }
    }

    #[test]
    fn uptime_is_success_ratio() {
        let checks = vec![check(true, 1), check(true, 1), check(false, 1), check(true, 1)];
        assert_eq!(uptime_percent(&checks), 75.0);
        assert_eq!(uptime_percent(&[]), 0.0);
    }

    #[test]
    fn avg_response_time_is_mean() {
        let checks = vec![check(true, 100), check(true, 200), check(true, 300)];
        assert_eq!(avg_response_time(&checks), 200);
        assert_eq!(avg_response_time(&[]), 0);
    }

    #[tokio::test]
    async fn stats_count_up_instances_by_last_check() {
        let registry = Registry::new();
        let up = Arc::new(Endpoint::new("http://up".into(), EndpointKind::Api, "g".into(), 0, false));
        up.push_check(check(false, 10), 8).await;
        up.push_check(check(true, 10), 8).await;
        let down = Arc::new(Endpoint::new("http://down".into(), EndpointKind::Ui, "g".into(), 1, false));
        down.push_check(check(true, 10), 8).await;
        down.push_check(check(false, 10), 8).await;
        registry.replace(vec![up, down]).await;

        let stats = build_stats(&registry).await;
        assert_eq!(stats.total_instances, 2);
        assert_eq!(stats.up_instances, 1);
        assert_eq!(stats.avg_uptime, 50.0);
    }

    #[tokio::test]
    async fn empty_registry_yields_zeroed_stats() {
        let registry = Registry::new();
        let stats = build_stats(&registry).await;
        assert_eq!(stats.total_instances, 0);
        assert_eq!(stats.up_instances, 0);
        assert_eq!(stats.avg_uptime, 0.0);
    }

    #[tokio::test]
    async fn views_expose_history_oldest_first() {
        let registry = Registry::new();
        let ep = Arc::new(Endpoint::new("http://a".into(), EndpointKind::Api, "g".into(), 0, true));
        ep.push_check(check(true, 10), 8).await;
        ep.push_check(check(false, 30), 8).await;
        registry.replace(vec![ep]).await;

        let views = build_views(&registry).await;
        assert_eq!(views.len(), 1);
        let view = &views[0];
        assert_eq!(view.url, "http://a");
        assert!(view.cors);
        assert_eq!(view.checks.len(), 2);
        assert_eq!(view.checks[0].response_time, 10);
        assert_eq!(view.uptime, 50.0);
        assert_eq!(view.avg_response_time, 20);
        assert!(!view.last_check.as_ref().unwrap().success);
    }
}
