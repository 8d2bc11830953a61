//! Tick driver and per-tick phases for the Drover guidance subsystem.
//!
//! The [`Engine`] owns every mutable structure — field store, cache,
//! scheduler queue, spatial index, follower registry — and advances them
//! in a fixed phase order each [`tick`](Engine::tick):
//!
//! 1. spatial index rebuild;
//! 2. request scheduling (cache-first, demand-gated, budgeted);
//! 3. cache retention sweep and field release;
//! 4. LOD tier re-evaluation;
//! 5. parallel movement planning (read-only over immutable fields);
//! 6. sequential move application to the host's position store.
//!
//! Only phase 2 and 3 mutate the cache/store/queue (single-writer
//! discipline); phase 5 reads `Arc`-shared fields without synchronization.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod config;
pub mod engine;
pub mod lod;
pub mod metrics;
pub mod movement;
pub mod scheduler;
pub mod spatial;

pub use agent::{Follower, FollowerParams};
pub use config::{ConfigError, EngineConfig, MovementConfig};
pub use engine::{Engine, EngineError};
pub use lod::{LodController, LodTier};
pub use metrics::TickMetrics;
pub use scheduler::RequestScheduler;
pub use spatial::{SpatialCellKey, SpatialIndex};
