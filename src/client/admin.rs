//! Direct-to-node administrative calls.
//!
//! These address one replica chosen by the caller: no shard resolution, no fallback list,
//! and no health bookkeeping. Any failure, 404 included, is surfaced as a `Request` error.

use super::api::BlobClient;
use super::forwarder::Attempt;
use super::protocol::{
    ENDPOINT_BUFFER, ENDPOINT_LIST, ENDPOINT_PURGE, ENDPOINT_STATUS, ENDPOINT_SYNC, NodeRequest,
    NodeResponse, Query, format_timestamp,
};
use crate::config::Replica;
use crate::error::{Result, RouterError};
use crate::routing::Verb;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only list names whose hash falls in this modulo class (node-defined).
    pub modulo: Option<u32>,
    /// Ask the node to include checksums.
    pub checksum: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Replica id to pull from.
    pub source: Option<String>,
    /// Unix seconds; only objects modified in `[start, end)` are synced.
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl ListOptions {
    fn query(&self) -> Query {
        let mut query = Query::new();
        if let Some(modulo) = self.modulo {
            query.push(("modulo", modulo.to_string()));
        }
        if self.checksum {
            query.push(("checksum", "1".to_string()));
        }
        query
    }
}

impl SyncOptions {
    fn query(&self) -> Query {
        let mut query = Query::new();
        if let Some(source) = &self.source {
            query.push(("source", source.clone()));
        }
        if let Some(start) = self.start {
            query.push(("start", format_timestamp(start)));
        }
        if let Some(end) = self.end {
            query.push(("end", format_timestamp(end)));
        }
        query
    }
}

impl BlobClient {
    fn admin_target(&self, replica_id: &str) -> Result<&Replica> {
        self.topology
            .replica(replica_id)
            .ok_or_else(|| RouterError::Request {
                replica: replica_id.to_string(),
                detail: "unknown replica".to_string(),
            })
    }

    async fn admin(&self, replica_id: &str, request: NodeRequest) -> Result<NodeResponse> {
        let replica = self.admin_target(replica_id)?;
        tracing::debug!(
            "Admin {} /{} -> replica {}",
            request.verb.method(),
            request.path,
            replica.id
        );

        match self.forwarder.send(replica, &request).await? {
            Attempt::Found(response) => Ok(response),
            Attempt::Absent => Err(RouterError::Request {
                replica: replica.id.clone(),
                detail: format!("404 Not Found for /{}", request.path),
            }),
        }
    }

    pub async fn status(&self, replica_id: &str) -> Result<NodeResponse> {
        self.admin(replica_id, NodeRequest::new(Verb::Get, ENDPOINT_STATUS))
            .await
    }

    pub async fn list(&self, replica_id: &str, options: ListOptions) -> Result<NodeResponse> {
        let request = NodeRequest::new(Verb::Get, ENDPOINT_LIST).with_query(options.query());
        self.admin(replica_id, request).await
    }

    pub async fn purge(&self, replica_id: &str) -> Result<NodeResponse> {
        self.admin(replica_id, NodeRequest::new(Verb::Delete, ENDPOINT_PURGE))
            .await
    }

    pub async fn sync(&self, replica_id: &str, options: SyncOptions) -> Result<NodeResponse> {
        let request = NodeRequest::new(Verb::Put, ENDPOINT_SYNC).with_query(options.query());
        self.admin(replica_id, request).await
    }

    pub async fn buffer(&self, replica_id: &str) -> Result<NodeResponse> {
        self.admin(replica_id, NodeRequest::new(Verb::Get, ENDPOINT_BUFFER))
            .await
    }
}
