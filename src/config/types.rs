use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

/// Per-attempt network timeout used when the topology does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// --- Raw (as parsed) ---

/// Topology exactly as it appears in the JSON document.
///
/// Every field is optional here so that validation can name what is missing
/// instead of surfacing a bare serde error.
#[derive(Debug, Default, Deserialize)]
pub struct RawTopology {
    pub clusters: Option<Vec<Vec<RawBucket>>>,
    pub replicas: Option<HashMap<String, RawReplica>>,
    pub encode_name: Option<Flag>,
    pub replica_retry: Option<u64>,
    /// `None` = key missing, `Some(None)` = explicitly `null`.
    #[serde(default, deserialize_with = "present")]
    pub ttl: Option<Option<u64>>,
    pub cluster: Option<usize>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBucket {
    pub write_weight: Option<u32>,
    pub replicas: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawReplica {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub read_weight: Option<u32>,
}

/// Boolean switch that also accepts `0` / `1`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub fn enabled(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- Validated ---

/// A shard within a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub write_weight: u32,
    pub replicas: Vec<String>,
}

/// One physical storage node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub read_weight: u32,
}

impl Replica {
    pub fn base_url(&self) -> String {
        if self.ip.contains(':') {
            format!("http://[{}]:{}", self.ip, self.port)
        } else {
            format!("http://{}:{}", self.ip, self.port)
        }
    }
}

pub type Cluster = Vec<Bucket>;

/// Validated, immutable storage topology.
///
/// Only obtainable through the validator (`Topology::from_json` and friends), so a
/// `Topology` value always satisfies the structural rules: at least one cluster,
/// no empty cluster or bucket, every referenced replica defined, no replica in two buckets.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) replicas: HashMap<String, Replica>,
    pub(crate) encode_name: bool,
    pub(crate) replica_retry: Duration,
    pub(crate) default_ttl: Option<u64>,
    pub(crate) restrict_to_cluster: Option<usize>,
    pub(crate) timeout: Duration,
}

impl Topology {
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn replica(&self, id: &str) -> Option<&Replica> {
        self.replicas.get(id)
    }

    pub fn encode_name(&self) -> bool {
        self.encode_name
    }

    pub fn replica_retry(&self) -> Duration {
        self.replica_retry
    }

    pub fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }

    pub fn restrict_to_cluster(&self) -> Option<usize> {
        self.restrict_to_cluster
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Copy of this topology with encode-name mode switched.
    pub fn with_encode_name(&self, encode_name: bool) -> Self {
        Self {
            encode_name,
            ..self.clone()
        }
    }
}
