//! Routing Module
//!
//! Decides, without touching the network, where a name lives and in which order its replicas
//! should be contacted.
//!
//! ## Core Concepts
//! - **Shard Resolution**: `ShardResolver` maps a name to one bucket per cluster, by CRC32 hash
//!   against a write-weighted table, or by decoding a name that already carries its buckets.
//! - **Name Encoding**: `codec` writes the bucket assignment into a base-62 name prefix.
//! - **Replica Ordering**: `ReplicaSelector` shuffles healthy replicas by read weight and
//!   appends recently failed ones, least recently failed first.
//! - **Health**: `HealthTracker` remembers when each replica last failed; failures expire by time only.
//! - **Request Event**: `RequestEvent` carries one call's parameters and memoized routing results.

pub mod codec;
pub mod event;
pub mod health;
pub mod resolver;
pub mod selector;

pub use event::{BucketMap, Replicate, RequestEvent, ResponseKind, Verb};
pub use health::HealthTracker;
pub use resolver::ShardResolver;
pub use selector::ReplicaSelector;

#[cfg(test)]
mod tests;
