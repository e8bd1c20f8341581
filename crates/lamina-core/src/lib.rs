//! # lamina-core — Partition Contract
//!
//! The stable contract between the Lamina gateway and the partitioning
//! engine that backs it:
//!
//! - [`Element`] — one unit of extracted content returned to API clients.
//! - [`PartitionParams`] / [`PartitionRequest`] — the parameter set and
//!   uploaded files accepted by the partition operation.
//! - [`Partitioner`] — the async seam the gateway calls through. The gateway
//!   never sees inside a backend; it hands over a request and receives an
//!   ordered element list or a [`PartitionError`].
//!
//! ## Crate Policy
//!
//! - No HTTP types. Status codes cross the seam as plain `u16` so backends
//!   do not pick up a web-framework dependency.
//! - No partitioning logic. Engines live in their own crates and implement
//!   [`Partitioner`].

pub mod element;
pub mod partition;

pub use element::Element;
pub use partition::{
    PartitionError, PartitionParams, PartitionRequest, Partitioner, UploadedFile,
};
