use super::codec;
use super::event::{BucketMap, RequestEvent};
use crate::config::Topology;
use crate::error::Result;

use std::sync::{Arc, OnceLock};

/// Maps names to one bucket per cluster.
///
/// Encoded names are decoded; everything else is hashed against a per-cluster table in which
/// bucket `i` occupies `write_weight` consecutive slots.
pub struct ShardResolver {
    topology: Arc<Topology>,
    tables: Vec<OnceLock<Vec<usize>>>,
}

impl ShardResolver {
    pub fn new(topology: Arc<Topology>) -> Self {
        let tables = topology.clusters().iter().map(|_| OnceLock::new()).collect();
        Self { topology, tables }
    }

    /// CRC32 of the cluster index (little-endian u64) followed by the name.
    pub fn hash_name(cluster: usize, name: &str) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(cluster as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.finalize()
    }

    /// Weighted lookup table for `cluster`, built on first use.
    pub fn table(&self, cluster: usize) -> &[usize] {
        self.tables[cluster].get_or_init(|| {
            let table: Vec<usize> = self.topology.clusters()[cluster]
                .iter()
                .enumerate()
                .flat_map(|(bucket, b)| std::iter::repeat_n(bucket, b.write_weight as usize))
                .collect();
            tracing::debug!(
                "Built weighted table for cluster {} ({} slots)",
                cluster,
                table.len()
            );
            table
        })
    }

    pub fn hash_buckets(&self, name: &str) -> BucketMap {
        (0..self.topology.clusters().len())
            .map(|cluster| {
                let table = self.table(cluster);
                let slot = Self::hash_name(cluster, name) as usize % table.len();
                (cluster, table[slot])
            })
            .collect()
    }

    /// Resolves (and memoizes on `event`) the bucket assignment for the event's name.
    pub fn resolve(&self, event: &mut RequestEvent) -> Result<BucketMap> {
        if let Some(buckets) = &event.buckets {
            return Ok(buckets.clone());
        }

        let buckets = if self.topology.encode_name() && event.encoded {
            codec::decode(&event.name, self.topology.clusters())?.0
        } else {
            self.hash_buckets(&event.name)
        };
        tracing::debug!("Resolved {:?} -> buckets {:?}", event.name, buckets);

        event.buckets = Some(buckets.clone());
        Ok(buckets)
    }

    /// Rewrites the event's name into its encoded form when encode-name mode is on and the
    /// name is not encoded yet. No-op otherwise.
    pub fn encode(&self, event: &mut RequestEvent) -> Result<()> {
        if !self.topology.encode_name() || event.encoded {
            return Ok(());
        }

        let buckets = self.resolve(event)?;
        event.name = codec::encode(&buckets, &event.name)?;
        event.encoded = true;
        Ok(())
    }
}
