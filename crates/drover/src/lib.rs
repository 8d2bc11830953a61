//! Drover: shared flow-field movement guidance for large crowds of agents.
//!
//! Hundreds of independently-moving agents converge on common destinations
//! without per-agent pathfinding: a destination gets one precomputed grid
//! of direction vectors (a *flow field*), and every agent headed there
//! samples it. Fields are generated on demand under a per-tick budget,
//! reused through a tolerance-quantized cache, and sampled at a fidelity
//! chosen by distance-based level-of-detail tiers.
//!
//! This is the top-level facade crate re-exporting the public API from the
//! Drover sub-crates. For most users, adding `drover` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use drover::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let mut positions = InMemoryPositions::new();
//! let camera = StaticReference(Vec2::ZERO);
//!
//! // Five agents rally on the same point; the engine builds one field
//! // and they all share it.
//! let rally = Vec2::new(20.0, 5.0);
//! for i in 0..5 {
//!     let agent = AgentId(i);
//!     positions.insert(agent, Vec2::new(i as f32 * 2.0, 0.0));
//!     engine.add_follower(agent, FollowerParams::default());
//!     engine.set_destination(agent, rally).unwrap();
//! }
//!
//! for _ in 0..120 {
//!     engine.tick(&mut positions, &camera, 1.0 / 60.0);
//! }
//!
//! let start = Vec2::new(0.0, 0.0);
//! let now = positions.position(AgentId(0)).unwrap();
//! assert!(now.distance(rally) < start.distance(rally));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `drover-core` | IDs, vector math, collaborator traits |
//! | [`field`] | `drover-field` | Field artifact, store, generator, cache |
//! | [`engine`] | `drover-engine` | Tick driver, scheduler, LOD, movement |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, vector math, and collaborator traits (`drover-core`).
pub use drover_core as types;

/// Flow-field artifact, storage, generation, and caching (`drover-field`).
pub use drover_field as field;

/// Tick driver, request scheduling, LOD, and movement (`drover-engine`).
pub use drover_engine as engine;

/// The most commonly used types, re-exported flat.
pub mod prelude {
    pub use drover_core::{
        AgentId, InMemoryPositions, PositionStore, ReferencePoint, StaticReference, TickId,
        Vec2,
    };
    pub use drover_engine::{
        ConfigError, Engine, EngineConfig, EngineError, Follower, FollowerParams,
        LodController, LodTier, MovementConfig, TickMetrics,
    };
    pub use drover_field::{
        FieldCache, FieldGenerator, FieldHandle, FieldStore, FlowField, GenerationRequest,
        OpenTerrain, TerrainSampler, Urgency,
    };
}
