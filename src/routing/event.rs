use super::codec::validate_name;
use crate::error::Result;

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Cluster index -> bucket index. Ordered by cluster so iteration (and thus encoding) is deterministic.
pub type BucketMap = BTreeMap<usize, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
    Delete,
}

impl Verb {
    pub fn method(self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }

    /// Reads balance by replica read weight; everything else is uniform.
    pub fn is_read(self) -> bool {
        self == Verb::Get
    }
}

/// What a GET should return: the stored bytes or the node's JSON metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    #[default]
    Data,
    Info,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Data => "data",
            ResponseKind::Info => "info",
        }
    }
}

/// How far the receiving node should fan a write out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replicate {
    #[default]
    All,
    Cluster,
    None,
}

impl Replicate {
    pub fn as_str(self) -> &'static str {
        match self {
            Replicate::All => "all",
            Replicate::Cluster => "cluster",
            Replicate::None => "none",
        }
    }
}

impl FromStr for Replicate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Replicate::All),
            "cluster" => Ok(Replicate::Cluster),
            "none" => Ok(Replicate::None),
            other => Err(format!("unknown replicate scope '{}'", other)),
        }
    }
}

/// Per-call request descriptor.
///
/// Created by an API entry point, passed `&mut` through resolution and forwarding, and
/// dropped when the call returns. `buckets` and `replicas` are memoized here so a single
/// call never resolves twice.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// Effective name; replaced by its encoded form once encoding has run.
    pub name: String,
    pub verb: Verb,
    pub encoded: bool,
    pub ttl: Option<u64>,
    pub deleted: Option<f64>,
    pub modified: Option<f64>,
    pub modified_deleted: Option<f64>,
    pub response: Option<ResponseKind>,
    pub replicate: Option<Replicate>,

    pub(crate) buckets: Option<BucketMap>,
    pub(crate) replicas: Option<BTreeSet<String>>,
}

impl RequestEvent {
    /// Validates `name` and starts a descriptor for one call.
    pub fn new(name: &str, verb: Verb) -> Result<Self> {
        validate_name(name)?;

        Ok(Self {
            name: name.to_string(),
            verb,
            encoded: false,
            ttl: None,
            deleted: None,
            modified: None,
            modified_deleted: None,
            response: None,
            replicate: None,
            buckets: None,
            replicas: None,
        })
    }

    pub fn with_encoded(mut self, encoded: bool) -> Self {
        self.encoded = encoded;
        self
    }

    pub fn resolved_buckets(&self) -> Option<&BucketMap> {
        self.buckets.as_ref()
    }
}
