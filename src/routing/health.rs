use dashmap::DashMap;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Time-windowed failure memory for replicas.
///
/// A replica that failed less than `retry_window` ago is "recently failed". Entries are
/// never cleared; a replica recovers purely by time passing.
#[derive(Debug)]
pub struct HealthTracker {
    failures: DashMap<String, Instant>,
    retry_window: Duration,
}

impl HealthTracker {
    pub fn new(retry_window: Duration) -> Self {
        Self {
            failures: DashMap::new(),
            retry_window,
        }
    }

    pub fn retry_window(&self) -> Duration {
        self.retry_window
    }

    pub fn record_failure(&self, replica_id: &str) {
        self.record_failure_at(replica_id, Instant::now());
    }

    pub fn record_failure_at(&self, replica_id: &str, at: Instant) {
        self.failures.insert(replica_id.to_string(), at);
    }

    pub fn last_failed_at(&self, replica_id: &str) -> Option<Instant> {
        self.failures.get(replica_id).map(|entry| *entry.value())
    }

    /// `Some(failed_at)` if the replica is still inside its retry window at `now`.
    pub fn recent_failure(&self, replica_id: &str, now: Instant) -> Option<Instant> {
        self.last_failed_at(replica_id)
            .filter(|failed_at| now.saturating_duration_since(*failed_at) < self.retry_window)
    }

    pub fn is_recently_failed(&self, replica_id: &str, now: Instant) -> bool {
        self.recent_failure(replica_id, now).is_some()
    }

    /// Replicas still inside their retry window, with time elapsed since the failure.
    pub fn snapshot(&self) -> BTreeMap<String, Duration> {
        let now = Instant::now();
        self.failures
            .iter()
            .filter_map(|entry| {
                let elapsed = now.saturating_duration_since(*entry.value());
                (elapsed < self.retry_window).then(|| (entry.key().clone(), elapsed))
            })
            .collect()
    }
}
