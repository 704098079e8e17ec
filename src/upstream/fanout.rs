//! Concurrent dispatch of a batch of upstream calls.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinSet;

use crate::upstream::client::{TransportError, Upstream, UpstreamCall, UpstreamClient, UpstreamResult};

/// Name-indexed results of one batch. Arrival order is not preserved.
#[derive(Debug, Default)]
pub struct FanOutResults {
    results: HashMap<Upstream, UpstreamResult>,
}

impl FanOutResults {
    pub fn get(&self, name: Upstream) -> Option<&UpstreamResult> {
        self.results.get(&name)
    }

    pub fn take(&mut self, name: Upstream) -> Option<UpstreamResult> {
        self.results.remove(&name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Run every call on its own task and wait for all of them.
///
/// Failures do not cancel siblings. Each call yields exactly one named
/// result, including calls whose task died before publishing.
pub async fn fan_out(client: &UpstreamClient, calls: Vec<UpstreamCall>) -> FanOutResults {
    let collected: Arc<DashMap<Upstream, UpstreamResult>> = Arc::new(DashMap::new());
    let mut pending = HashSet::with_capacity(calls.len());
    let mut join_set = JoinSet::new();

    for call in calls {
        pending.insert(call.name);
        let client = client.clone();
        let collected = Arc::clone(&collected);
        join_set.spawn(async move {
            let result = client.call(call).await;
            collected.insert(result.name, result);
        });
    }

    let mut task_failure = None;
    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Upstream task panicked");
            task_failure = Some(e.to_string());
        }
    }

    // Every task has finished, so this is the only remaining reference.
    let mut results: HashMap<Upstream, UpstreamResult> = match Arc::try_unwrap(collected) {
        Ok(map) => map.into_iter().collect(),
        Err(shared) => shared
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect(),
    };

    for name in pending {
        results.entry(name).or_insert_with(|| UpstreamResult {
            name,
            outcome: Err(TransportError::TaskFailed(
                task_failure
                    .clone()
                    .unwrap_or_else(|| "no result published".to_string()),
            )),
        });
    }

    FanOutResults { results }
}
