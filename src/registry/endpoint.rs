// src/registry/endpoint.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Api,
    Ui,
}

/// One probe outcome. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub timestamp: DateTime<Utc>,
    pub status_code: u16,
    pub response_time: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutable classification and history, guarded by the endpoint's own lock.
#[derive(Debug)]
pub struct EndpointState {
    pub group: String,
    pub group_order: usize,
    pub cors: bool,
    pub index: usize,
    pub checks: VecDeque<Check>,
}

/// One monitored target. `url` and `kind` never change after creation;
/// everything else lives behind a per-endpoint lock so probes and
/// reconciliation can touch different endpoints without contending.
#[derive(Debug)]
pub struct Endpoint {
    pub url: String,
    pub kind: EndpointKind,
    state: RwLock<EndpointState>,
}

impl Endpoint {
    pub fn new(url: String, kind: EndpointKind, group: String, group_order: usize, cors: bool) -> Self {
        Self {
            url,
            kind,
            state: RwLock::new(EndpointState {
                group,
                group_order,
                cors,
                index: 0,
                checks: VecDeque::new(),
            }),
        }
    }

    pub async fn read_state(&self) -> tokio::sync::RwLockReadGuard<'_, EndpointState> {
        self.state.read().await
    }

    /// Update classification fields on reconcile; history is untouched.
    pub async fn reclassify(&self, group: String, group_order: usize, cors: bool) {
        let mut state = self.state.write().await;
        state.group = group;
        state.group_order = group_order;
        state.cors = cors;
    }

    pub async fn set_index(&self, index: usize) {
        self.state.write().await.index = index;
    }

    /// Append a check, evicting the oldest entry once at capacity.
    pub async fn push_check(&self, check: Check, max_history: usize) {
        let mut state = self.state.write().await;
        state.checks.push_back(check);
        while state.checks.len() > max_history {
            state.checks.pop_front();
        }
    }

    pub async fn history_len(&self) -> usize {
        self.state.read().await.checks.len()
    }

    /// Most recent check, if any.
    pub async fn last_check(&self) -> Option<Check> {
        self.state.read().await.checks.back().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(success: bool, response_time: i64) -> Check {
        Check {
            timestamp: Utc::now(),
            status_code: if success { 200 } else { 0 },
            response_time,
            success,
            error: None,
        }
    }

    #[tokio::test]
    async fn push_check_evicts_oldest_at_capacity() {
        let ep = Endpoint::new("http://a".into(), EndpointKind::Api, "g".into(), 0, false);
        for i in 0..5 {
            ep.push_check(check(true, i), 3).await;
        }
        let state = ep.read_state().await;
        assert_eq!(state.checks.len(), 3);
        let times: Vec<i64> = state.checks.iter().map(|c| c.response_time).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn reclassify_preserves_history() {
        let ep = Endpoint::new("http://a".into(), EndpointKind::Ui, "old".into(), 0, false);
        ep.push_check(check(true, 10), 8).await;
        ep.push_check(check(false, 20), 8).await;
        ep.reclassify("new".into(), 3, true).await;
        let state = ep.read_state().await;
        assert_eq!(state.group, "new");
        assert_eq!(state.group_order, 3);
        assert!(state.cors);
        assert_eq!(state.checks.len(), 2);
        assert_eq!(state.checks[0].response_time, 10);
        assert_eq!(state.checks[1].response_time, 20);
    }

    proptest! {
        #[test]
        fn history_never_exceeds_capacity(appends in 0usize..500, cap in 1usize..50) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let times: Vec<i64> = rt.block_on(async {
                let ep = Endpoint::new("http://a".into(), EndpointKind::Api, "g".into(), 0, false);
                for i in 0..appends {
                    ep.push_check(check(true, i as i64), cap).await;
                }
                let times: Vec<i64> =
                    ep.read_state().await.checks.iter().map(|c| c.response_time).collect();
                times
            });

            prop_assert!(times.len() <= cap);
            prop_assert_eq!(times.len(), appends.min(cap));
            // Oldest-first FIFO: survivors are the most recent appends in order.
            if appends > 0 {
                prop_assert_eq!(times[0], appends.saturating_sub(cap) as i64);
                prop_assert_eq!(*times.last().unwrap(), (appends - 1) as i64);
            }
        }
    }
}
