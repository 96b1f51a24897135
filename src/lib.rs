//! Blob Router Library
//!
//! Client-side routing for a replicated blob storage cluster. The router stores nothing; it
//! decides which bucket of which cluster owns a name, which replicas host that bucket, and
//! in what order to contact them, steering around replicas that failed recently.
//!
//! ## Architecture Modules
//! - **`config`**: Topology parsing and validation (clusters -> buckets -> replicas).
//! - **`routing`**: Shard resolution, base-62 name encoding, weighted replica ordering and
//!   the time-windowed health tracker. Pure, no I/O.
//! - **`client`**: `BlobClient` with the blob verbs and admin calls, and the sequential
//!   request forwarder.
//! - **`error`**: `RouterError`, the single error type of the library.

pub mod client;
pub mod config;
pub mod error;
pub mod routing;

pub use client::BlobClient;
pub use config::Topology;
pub use error::{Result, RouterError};
