//! Topology Configuration Module
//!
//! Parses and validates the static description of the storage cluster: which clusters exist,
//! which buckets each cluster is split into, and which replicas host each bucket.
//!
//! ## Core Concepts
//! - **Raw vs Validated**: `RawTopology` mirrors the JSON document with every field optional;
//!   `Topology` is only produced by the validator and is immutable afterwards.
//! - **Fail Fast**: any structural violation aborts construction with a `Configuration` error,
//!   so a client can never hold a half-valid topology.

pub mod types;
pub mod validate;

pub use types::{Bucket, Cluster, Replica, Topology};
