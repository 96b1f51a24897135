//! Storage Node Wire Protocol
//!
//! A request is `VERB /<name>?<params>` with an optional raw body. Responses are
//! JSON when the node says `application/json`, raw bytes otherwise.

use crate::routing::{RequestEvent, Verb};

use std::time::{SystemTime, UNIX_EPOCH};

// --- Node-local endpoints (never shard-resolved) ---

pub const ENDPOINT_BUFFER: &str = "_buffer";
pub const ENDPOINT_LIST: &str = "_list";
pub const ENDPOINT_PURGE: &str = "_purge";
pub const ENDPOINT_STATUS: &str = "_status";
pub const ENDPOINT_SYNC: &str = "_sync";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Descriptor fields an operation may forward as query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Response,
    Deleted,
    Modified,
    ModifiedDeleted,
    Replicate,
}

pub const GET_PARAMS: &[Param] = &[Param::Response];
pub const PUT_PARAMS: &[Param] = &[
    Param::Deleted,
    Param::Modified,
    Param::ModifiedDeleted,
    Param::Replicate,
];
pub const DELETE_PARAMS: &[Param] = &[Param::Deleted, Param::ModifiedDeleted, Param::Replicate];

pub type Query = Vec<(&'static str, String)>;

/// Query pairs for the fields `params` names, in `params` order, skipping unset fields.
pub fn query_pairs(event: &RequestEvent, params: &[Param]) -> Query {
    params
        .iter()
        .filter_map(|param| match param {
            Param::Response => event.response.map(|r| ("response", r.as_str().to_string())),
            Param::Deleted => event.deleted.map(|t| ("deleted", format_timestamp(t))),
            Param::Modified => event.modified.map(|t| ("modified", format_timestamp(t))),
            Param::ModifiedDeleted => event
                .modified_deleted
                .map(|t| ("modified_deleted", format_timestamp(t))),
            Param::Replicate => event.replicate.map(|r| ("replicate", r.as_str().to_string())),
        })
        .collect()
}

/// Unix seconds with microsecond precision.
pub fn format_timestamp(seconds: f64) -> String {
    format!("{:.6}", seconds)
}

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// One request as it goes on the wire, independent of the target replica.
#[derive(Debug, Clone)]
pub struct NodeRequest {
    pub verb: Verb,
    pub path: String,
    pub query: Query,
    pub body: Option<Vec<u8>>,
    /// Decode JSON bodies. Off for raw data reads.
    pub parse_json: bool,
}

impl NodeRequest {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            query: Vec::new(),
            body: None,
            parse_json: true,
        }
    }

    pub fn from_event(event: &RequestEvent, params: &[Param]) -> Self {
        Self {
            query: query_pairs(event, params),
            ..Self::new(event.verb, event.name.clone())
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn raw(mut self) -> Self {
        self.parse_json = false;
        self
    }
}

/// Successful node answer.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResponse {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

impl NodeResponse {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            NodeResponse::Json(value) => Some(value),
            NodeResponse::Raw(_) => None,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            NodeResponse::Json(value) => value.to_string().into_bytes(),
            NodeResponse::Raw(bytes) => bytes,
        }
    }
}
