use super::types::*;
use crate::error::{Result, RouterError};

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

fn missing(field: &str) -> RouterError {
    RouterError::Configuration(format!("missing required field '{}'", field))
}

impl Topology {
    /// Reads and validates a JSON topology file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RouterError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RouterError::Configuration(format!("unparseable topology: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.as_object().is_none_or(|object| object.is_empty()) {
            return Err(RouterError::Configuration(
                "empty configuration".to_string(),
            ));
        }
        let raw: RawTopology = serde_json::from_value(value)
            .map_err(|e| RouterError::Configuration(format!("malformed topology: {}", e)))?;
        Self::from_raw(raw)
    }

    /// Validates a parsed topology. Fails on the first violation found.
    pub fn from_raw(raw: RawTopology) -> Result<Self> {
        let raw_clusters = raw.clusters.ok_or_else(|| missing("clusters"))?;
        let raw_replicas = raw.replicas.ok_or_else(|| missing("replicas"))?;
        let encode_name = raw.encode_name.ok_or_else(|| missing("encode_name"))?;
        let replica_retry = raw.replica_retry.ok_or_else(|| missing("replica_retry"))?;
        let default_ttl = raw.ttl.ok_or_else(|| missing("ttl"))?;

        if raw_clusters.is_empty() {
            return Err(RouterError::Configuration(
                "at least one cluster is required".to_string(),
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut replicas: HashMap<String, Replica> = HashMap::new();
        let mut clusters: Vec<Cluster> = Vec::with_capacity(raw_clusters.len());

        for (ci, raw_cluster) in raw_clusters.into_iter().enumerate() {
            if raw_cluster.is_empty() {
                return Err(RouterError::Configuration(format!(
                    "cluster {} has no buckets",
                    ci
                )));
            }

            let mut cluster = Vec::with_capacity(raw_cluster.len());
            for (bi, raw_bucket) in raw_cluster.into_iter().enumerate() {
                let write_weight = raw_bucket.write_weight.ok_or_else(|| {
                    RouterError::Configuration(format!(
                        "cluster {} bucket {} is missing 'write_weight'",
                        ci, bi
                    ))
                })?;
                if write_weight == 0 {
                    return Err(RouterError::Configuration(format!(
                        "cluster {} bucket {} has a zero write_weight",
                        ci, bi
                    )));
                }

                let ids = raw_bucket.replicas.ok_or_else(|| {
                    RouterError::Configuration(format!(
                        "cluster {} bucket {} is missing 'replicas'",
                        ci, bi
                    ))
                })?;
                if ids.is_empty() {
                    return Err(RouterError::Configuration(format!(
                        "cluster {} bucket {} has an empty replica list",
                        ci, bi
                    )));
                }

                for id in ids.iter() {
                    if !seen.insert(id.clone()) {
                        return Err(RouterError::Configuration(format!(
                            "replica {} is assigned to more than one bucket",
                            id
                        )));
                    }
                    let replica = validate_replica(id, raw_replicas.get(id))?;
                    replicas.insert(id.clone(), replica);
                }

                cluster.push(Bucket {
                    write_weight,
                    replicas: ids,
                });
            }
            clusters.push(cluster);
        }

        if let Some(restriction) = raw.cluster
            && restriction >= clusters.len()
        {
            return Err(RouterError::Configuration(format!(
                "cluster restriction {} is out of range ({} clusters)",
                restriction,
                clusters.len()
            )));
        }

        tracing::info!(
            "Loaded topology: {} clusters, {} replicas, encode_name={}",
            clusters.len(),
            replicas.len(),
            encode_name.enabled()
        );

        Ok(Self {
            clusters,
            replicas,
            encode_name: encode_name.enabled(),
            replica_retry: Duration::from_secs(replica_retry),
            default_ttl,
            restrict_to_cluster: raw.cluster,
            timeout: Duration::from_secs(raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

fn validate_replica(id: &str, raw: Option<&RawReplica>) -> Result<Replica> {
    let raw = raw.ok_or_else(|| {
        RouterError::Configuration(format!("replica {} is referenced but not defined", id))
    })?;
    let field = |name: &str| {
        RouterError::Configuration(format!("replica {} is missing '{}'", id, name))
    };

    Ok(Replica {
        id: id.to_string(),
        ip: raw.ip.clone().ok_or_else(|| field("ip"))?,
        port: raw.port.ok_or_else(|| field("port"))?,
        read_weight: raw.read_weight.ok_or_else(|| field("read_weight"))?,
    })
}
