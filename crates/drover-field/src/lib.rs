//! Flow-field generation, storage, and caching.
//!
//! A flow field is an immutable grid of direction vectors that routes any
//! point within its coverage area toward a single destination. This crate
//! owns the whole field lifecycle:
//!
//! - [`FlowField`] — the immutable artifact (costs + directions), shared by
//!   reference among every agent assigned to it;
//! - [`FieldStore`] — a generational slot map issuing [`FieldHandle`]s;
//!   stale or pending handles resolve to `None` instead of dangling;
//! - [`FieldGenerator`] — Dijkstra cost propagation plus gradient-based
//!   direction derivation over an 8-connected grid;
//! - [`FieldCache`] — tolerance-quantized request keys, so near-identical
//!   requests collapse onto one generated field;
//! - [`TerrainSampler`] — the seam through which the host marks terrain
//!   impassable.
//!
//! Fields are read-only after construction and safe for unsynchronized
//! concurrent sampling.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod field;
pub mod generate;
pub mod request;
pub mod store;
pub mod terrain;

pub use cache::{CacheKey, FieldCache};
pub use field::{FlowField, DIRECTION_EPSILON};
pub use generate::FieldGenerator;
pub use request::{GenerationRequest, Urgency};
pub use store::{FieldHandle, FieldStore};
pub use terrain::{OpenTerrain, TerrainSampler};
