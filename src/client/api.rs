use super::forwarder::RequestForwarder;
use super::protocol::{
    DELETE_PARAMS, GET_PARAMS, NodeRequest, NodeResponse, PUT_PARAMS, Param, now_secs,
};
use crate::config::Topology;
use crate::error::Result;
use crate::routing::{
    BucketMap, HealthTracker, ReplicaSelector, Replicate, RequestEvent, ResponseKind,
    ShardResolver, Verb,
};

use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub response: ResponseKind,
    /// Defaults to "already encoded" when encode-name mode is on.
    pub encoded: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Relative expiry in seconds. Ignored when `deleted` is set.
    pub ttl: Option<u64>,
    /// Absolute expiry (Unix seconds).
    pub deleted: Option<f64>,
    pub modified: Option<f64>,
    pub modified_deleted: Option<f64>,
    pub replicate: Option<Replicate>,
    /// Defaults to "not encoded yet".
    pub encoded: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Seconds until the object expires; 0 (the default) expires it right away.
    pub ttl: Option<u64>,
    pub deleted: Option<f64>,
    pub modified_deleted: Option<f64>,
    pub replicate: Option<Replicate>,
    pub encoded: Option<bool>,
}

/// Routing client for the blob cluster. Cheap to share behind an `Arc`.
pub struct BlobClient {
    pub(crate) topology: Arc<Topology>,
    pub(crate) resolver: ShardResolver,
    pub(crate) selector: ReplicaSelector,
    pub(crate) forwarder: RequestForwarder,
    pub(crate) health: Arc<HealthTracker>,
}

impl BlobClient {
    pub fn new(topology: Topology) -> Self {
        let health = Arc::new(HealthTracker::new(topology.replica_retry()));
        Self::with_health(topology, health)
    }

    /// Builds a client around an existing health tracker, e.g. one shared between clients.
    ///
    /// The tracker keeps its own retry window; the topology's `replica_retry` is not applied
    /// to it.
    pub fn with_health(topology: Topology, health: Arc<HealthTracker>) -> Self {
        if health.retry_window() != topology.replica_retry() {
            tracing::warn!(
                "Shared health tracker uses a {:?} retry window, topology asks for {:?}",
                health.retry_window(),
                topology.replica_retry()
            );
        }
        let topology = Arc::new(topology);
        tracing::info!(
            "Blob client ready: {} clusters, restriction={:?}, timeout={:?}",
            topology.clusters().len(),
            topology.restrict_to_cluster(),
            topology.timeout()
        );

        Self {
            resolver: ShardResolver::new(topology.clone()),
            selector: ReplicaSelector::new(topology.clone(), health.clone()),
            forwarder: RequestForwarder::new(health.clone(), topology.timeout()),
            topology,
            health,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self::new(Topology::from_json(text)?))
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    fn event(
        &self,
        name: &str,
        verb: Verb,
        encoded: Option<bool>,
        assume_encoded: bool,
    ) -> Result<RequestEvent> {
        let encoded = encoded.unwrap_or(self.topology.encode_name() && assume_encoded);
        Ok(RequestEvent::new(name, verb)?.with_encoded(encoded))
    }

    async fn dispatch(
        &self,
        event: &mut RequestEvent,
        params: &[Param],
        body: Option<Vec<u8>>,
        parse_json: bool,
    ) -> Result<NodeResponse> {
        let mut request = NodeRequest::from_event(event, params);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        if !parse_json {
            request = request.raw();
        }

        let candidates = self.selector.candidates(&self.resolver, event)?;
        self.forwarder.forward(&candidates, &request).await
    }

    /// Reads an object. `ResponseKind::Data` returns raw bytes; `Info` returns the node's
    /// JSON metadata.
    pub async fn get(&self, name: &str, options: GetOptions) -> Result<NodeResponse> {
        let mut event = self.event(name, Verb::Get, options.encoded, true)?;
        event.response = Some(options.response);

        let parse_json = options.response != ResponseKind::Data;
        self.dispatch(&mut event, GET_PARAMS, None, parse_json).await
    }

    /// Writes an object to one reachable replica, which replicates it onward.
    pub async fn put(
        &self,
        name: &str,
        data: Vec<u8>,
        options: PutOptions,
    ) -> Result<NodeResponse> {
        let mut event = self.event(name, Verb::Put, options.encoded, false)?;
        let now = now_secs();

        let ttl = options.ttl.or(self.topology.default_ttl());
        event.ttl = ttl;
        event.deleted = options
            .deleted
            .or_else(|| ttl.map(|ttl| now + ttl as f64));
        event.modified = Some(options.modified.unwrap_or(now));
        event.modified_deleted = options.modified_deleted;
        event.replicate = Some(options.replicate.unwrap_or_default());

        self.resolver.encode(&mut event)?;
        tracing::debug!("PUT {:?} ({} bytes)", event.name, data.len());

        self.dispatch(&mut event, PUT_PARAMS, Some(data), true).await
    }

    /// Expires an object. Every delete is stamped; the node keeps the newest stamp.
    pub async fn delete(&self, name: &str, options: DeleteOptions) -> Result<NodeResponse> {
        let mut event = self.event(name, Verb::Delete, options.encoded, true)?;
        let now = now_secs();

        let ttl = options.ttl.unwrap_or(0);
        event.ttl = Some(ttl);
        event.deleted = Some(options.deleted.unwrap_or(now + ttl as f64));
        event.modified_deleted = Some(options.modified_deleted.unwrap_or(now));
        event.replicate = Some(options.replicate.unwrap_or_default());

        self.resolver.encode(&mut event)?;

        self.dispatch(&mut event, DELETE_PARAMS, None, true).await
    }

    /// The name that would go on the wire for `name`.
    ///
    /// `encoded` defaults to `false` even in encode-name mode, so a name that already carries
    /// its bucket prefix gets a second one unless the caller passes `Some(true)`.
    pub fn name(&self, name: &str, encoded: Option<bool>) -> Result<String> {
        let mut event = self.event(name, Verb::Get, encoded, false)?;
        self.resolver.resolve(&mut event)?;
        self.resolver.encode(&mut event)?;
        Ok(event.name)
    }

    /// Resolved bucket per cluster, without any network traffic.
    pub fn buckets(&self, name: &str, encoded: Option<bool>) -> Result<BucketMap> {
        let mut event = self.event(name, Verb::Get, encoded, true)?;
        self.resolver.resolve(&mut event)
    }

    /// Sorted replica ids that host `name`, without any network traffic.
    pub fn replicas(&self, name: &str, encoded: Option<bool>) -> Result<Vec<String>> {
        let mut event = self.event(name, Verb::Get, encoded, true)?;
        let ids = self.selector.replica_ids(&self.resolver, &mut event)?;
        Ok(ids.into_iter().collect())
    }
}
