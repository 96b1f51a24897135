use super::event::{BucketMap, RequestEvent, Verb};
use super::health::HealthTracker;
use super::resolver::ShardResolver;
use crate::config::{Replica, Topology};
use crate::error::Result;

use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Turns resolved buckets into an ordered list of replicas to try.
pub struct ReplicaSelector {
    topology: Arc<Topology>,
    health: Arc<HealthTracker>,
}

impl ReplicaSelector {
    pub fn new(topology: Arc<Topology>, health: Arc<HealthTracker>) -> Self {
        Self { topology, health }
    }

    /// Union of the replica ids of every resolved bucket, limited to the restricted
    /// cluster when one is configured.
    pub fn replica_set(&self, buckets: &BucketMap) -> BTreeSet<String> {
        let restriction = self.topology.restrict_to_cluster();
        buckets
            .iter()
            .filter(|&(&cluster, _)| restriction.is_none_or(|only| only == cluster))
            .flat_map(|(&cluster, &bucket)| self.topology.clusters()[cluster][bucket].replicas.iter())
            .cloned()
            .collect()
    }

    /// Resolves the event's replica set, memoized on the event.
    pub fn replica_ids(
        &self,
        resolver: &ShardResolver,
        event: &mut RequestEvent,
    ) -> Result<BTreeSet<String>> {
        if let Some(replicas) = &event.replicas {
            return Ok(replicas.clone());
        }

        let buckets = resolver.resolve(event)?;
        let replicas = self.replica_set(&buckets);
        event.replicas = Some(replicas.clone());
        Ok(replicas)
    }

    /// Full fallback ordering for one call.
    pub fn candidates(
        &self,
        resolver: &ShardResolver,
        event: &mut RequestEvent,
    ) -> Result<Vec<Replica>> {
        let ids = self.replica_ids(resolver, event)?;
        let ordered = self.order(&ids, event.verb, Instant::now(), &mut rand::thread_rng());
        tracing::debug!(
            "Candidates for {:?}: {:?}",
            event.name,
            ordered.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()
        );
        Ok(ordered)
    }

    /// Healthy replicas first, shuffled by weight (drawn without replacement), then recently
    /// failed replicas oldest failure first. Zero-weight replicas are left out entirely.
    pub fn order<R: Rng>(
        &self,
        ids: &BTreeSet<String>,
        verb: Verb,
        now: Instant,
        rng: &mut R,
    ) -> Vec<Replica> {
        let mut healthy: Vec<(&Replica, u64)> = Vec::new();
        let mut failed: Vec<(&Replica, Instant)> = Vec::new();

        for id in ids.iter() {
            let Some(replica) = self.topology.replica(id) else {
                continue;
            };
            let weight = if verb.is_read() {
                replica.read_weight as u64
            } else {
                1
            };
            if weight == 0 {
                continue;
            }

            match self.health.recent_failure(id, now) {
                Some(failed_at) => failed.push((replica, failed_at)),
                None => healthy.push((replica, weight)),
            }
        }

        let mut ordered = weighted_shuffle(healthy, rng);
        failed.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        ordered.extend(failed.into_iter().map(|(replica, _)| replica.clone()));
        ordered
    }
}

/// Repeated weighted draws without replacement over a shrinking pool.
fn weighted_shuffle<R: Rng>(mut pool: Vec<(&Replica, u64)>, rng: &mut R) -> Vec<Replica> {
    let mut total: u64 = pool.iter().map(|(_, weight)| weight).sum();
    let mut ordered = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let cumulative: Vec<u64> = pool
            .iter()
            .scan(0u64, |acc, (_, weight)| {
                *acc += weight;
                Some(*acc)
            })
            .collect();
        let pick = rng.gen_range(0..total);
        let index = cumulative.partition_point(|&upper| upper <= pick);

        let (replica, weight) = pool.remove(index);
        total -= weight;
        ordered.push(replica.clone());
    }

    ordered
}
