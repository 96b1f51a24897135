//! Client Module
//!
//! The network-facing half of the router. `BlobClient` builds a request descriptor per call,
//! asks the routing layer for an ordered candidate list, and hands both to `RequestForwarder`.
//!
//! ## Call Outcomes
//! - **Success**: the first 2xx answer wins; later candidates are never contacted.
//! - **Not Found**: every candidate answered 404. Nothing is recorded as a failure.
//! - **Exhausted**: at least one candidate errored and none succeeded. Errored replicas are
//!   recorded in the shared `HealthTracker` and sink to the back of later candidate lists.
//!
//! ## Submodules
//! - **`api`**: blob verbs (`get`, `put`, `delete`) and routing diagnostics (`name`, `buckets`, `replicas`).
//! - **`admin`**: direct single-node calls (`status`, `list`, `purge`, `sync`, `buffer`).
//! - **`forwarder`**: sequential candidate walk over `reqwest`.
//! - **`protocol`**: endpoints, query parameters and response decoding.

pub mod admin;
pub mod api;
pub mod forwarder;
pub mod protocol;

pub use admin::{ListOptions, SyncOptions};
pub use api::{BlobClient, DeleteOptions, GetOptions, PutOptions};
pub use forwarder::{Attempt, RequestForwarder};
pub use protocol::{NodeRequest, NodeResponse};
