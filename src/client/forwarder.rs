use super::protocol::{JSON_CONTENT_TYPE, NodeRequest, NodeResponse};
use crate::config::Replica;
use crate::error::{Result, RouterError};
use crate::routing::HealthTracker;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single replica attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Found(NodeResponse),
    /// The replica answered 404.
    Absent,
}

/// Walks a candidate list against the network, one replica at a time.
pub struct RequestForwarder {
    http_client: reqwest::Client,
    health: Arc<HealthTracker>,
    timeout: Duration,
}

impl RequestForwarder {
    pub fn new(health: Arc<HealthTracker>, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            health,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn node_url(replica: &Replica, request: &NodeRequest) -> Result<reqwest::Url> {
        let invalid = |detail: String| RouterError::Request {
            replica: replica.id.clone(),
            detail,
        };

        let mut url = reqwest::Url::parse(&replica.base_url())
            .map_err(|e| invalid(format!("bad address {}: {}", replica.base_url(), e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("address {} cannot carry a path", replica.base_url())))?
            .clear()
            .push(&request.path);
        Ok(url)
    }

    /// Issues `request` to exactly one replica. Network failures and non-404 error statuses
    /// come back as `RouterError::Request`; the health tracker is not touched.
    pub async fn send(&self, replica: &Replica, request: &NodeRequest) -> Result<Attempt> {
        let failed = |detail: String| RouterError::Request {
            replica: replica.id.clone(),
            detail,
        };

        let url = Self::node_url(replica, request)?;
        let mut builder = self
            .http_client
            .request(request.verb.method(), url)
            .timeout(self.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_LENGTH, body.len())
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Attempt::Absent);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(JSON_CONTENT_TYPE));
        let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        if !status.is_success() {
            return Err(failed(format!(
                "{} {}",
                status,
                String::from_utf8_lossy(&body).trim()
            )));
        }

        if is_json && request.parse_json {
            let value = serde_json::from_slice(&body)
                .map_err(|e| failed(format!("invalid JSON body: {}", e)))?;
            Ok(Attempt::Found(NodeResponse::Json(value)))
        } else {
            Ok(Attempt::Found(NodeResponse::Raw(body.to_vec())))
        }
    }

    /// Tries `candidates` in order until one succeeds.
    ///
    /// 404s move on silently; every other failure is recorded against the replica before
    /// moving on. Each candidate is tried at most once.
    pub async fn forward(&self, candidates: &[Replica], request: &NodeRequest) -> Result<NodeResponse> {
        let mut last_error: Option<RouterError> = None;

        for replica in candidates {
            tracing::debug!(
                "{} /{} -> replica {} ({}:{})",
                request.verb.method(),
                request.path,
                replica.id,
                replica.ip,
                replica.port
            );

            match self.send(replica, request).await {
                Ok(Attempt::Found(response)) => return Ok(response),
                Ok(Attempt::Absent) => {
                    tracing::debug!("Replica {} does not have {:?}", replica.id, request.path);
                }
                Err(e) => {
                    tracing::warn!("Replica {} failed, marking unhealthy: {}", replica.id, e);
                    self.health.record_failure(&replica.id);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                tracing::error!(
                    "All {} replicas errored for {:?}",
                    candidates.len(),
                    request.path
                );
                Err(RouterError::ExhaustedReplicas {
                    name: request.path.clone(),
                    last_error: e.to_string(),
                })
            }
            None if candidates.is_empty() => Err(RouterError::ExhaustedReplicas {
                name: request.path.clone(),
                last_error: "no eligible replicas".to_string(),
            }),
            None => Err(RouterError::NotFound {
                name: request.path.clone(),
            }),
        }
    }
}
