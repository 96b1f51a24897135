//! Router Error Taxonomy
//!
//! Every fallible library operation returns [`RouterError`]. Construction failures are
//! `Configuration`; bad caller names are `NameFormat` / `BucketRange`; everything else comes
//! out of walking the replica candidate list.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid topology. Only raised while building a client.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied name is empty, reserved, or carries a malformed encoded prefix.
    #[error("invalid name: {0}")]
    NameFormat(String),

    /// Encoded prefix decoded to a bucket index the topology does not have.
    #[error("bucket {value} out of range in encoded name {name:?}")]
    BucketRange { value: usize, name: String },

    /// A single replica attempt failed (network error or non-404 error status).
    #[error("request to replica {replica} failed: {detail}")]
    Request { replica: String, detail: String },

    /// Every reachable candidate answered "not found".
    #[error("{name:?} not found on any replica")]
    NotFound { name: String },

    /// Every candidate failed; carries the last failure for diagnostics.
    #[error("all replicas errored for {name:?}: {last_error}")]
    ExhaustedReplicas { name: String, last_error: String },
}

impl RouterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
