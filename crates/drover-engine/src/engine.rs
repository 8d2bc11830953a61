//! The tick driver and the subsystem's public operations.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use drover_core::{AgentId, PositionStore, ReferencePoint, TickId, Vec2};
use drover_field::{
    FieldCache, FieldGenerator, FieldHandle, FieldStore, TerrainSampler, Urgency,
};
use indexmap::IndexMap;

use crate::agent::{Follower, FollowerParams};
use crate::config::{ConfigError, EngineConfig};
use crate::lod::LodController;
use crate::metrics::TickMetrics;
use crate::movement;
use crate::scheduler::RequestScheduler;
use crate::spatial::SpatialIndex;

// ── EngineError ───────────────────────────────────────────────────

/// Errors from the engine's public operations.
///
/// Runtime guidance never fails — missing fields degrade to fallbacks —
/// so the only operational error is naming an agent that was never
/// registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The operation named an agent with no follower state.
    UnknownAgent {
        /// The unregistered agent.
        agent: AgentId,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAgent { agent } => write!(f, "agent {agent} is not a follower"),
        }
    }
}

impl Error for EngineError {}

// ── Engine ────────────────────────────────────────────────────────

/// The flow-field guidance engine.
///
/// Owns every mutable structure of the subsystem and advances them in a
/// fixed phase order each [`tick`](Engine::tick). Positions stay in the
/// host's [`PositionStore`]; the engine reads them during planning and
/// writes them back once planning completes.
pub struct Engine {
    config: EngineConfig,
    store: FieldStore,
    cache: FieldCache,
    scheduler: RequestScheduler,
    spatial: SpatialIndex,
    generator: FieldGenerator,
    lod: LodController,
    followers: IndexMap<AgentId, Follower>,
    metrics: TickMetrics,
    tick_id: TickId,
    now: f64,
    worker_count: usize,
}

impl Engine {
    /// Construct an engine over fully-open terrain.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_generator(config, FieldGenerator::open())
    }

    /// Construct an engine whose generator consults the host's terrain.
    pub fn with_terrain(
        config: EngineConfig,
        terrain: Arc<dyn TerrainSampler>,
    ) -> Result<Self, ConfigError> {
        Self::with_generator(config, FieldGenerator::new(terrain))
    }

    fn with_generator(
        config: EngineConfig,
        generator: FieldGenerator,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = RequestScheduler::new(
            config.cache_tolerance,
            config.queue_depth_cap,
            config.max_generations_per_tick,
            config.min_shared_agents,
            config.sharing_distance,
        );
        let spatial = SpatialIndex::new(config.spatial_cell_size);
        let lod = LodController::new(config.lod_thresholds);
        let worker_count = config.resolved_worker_count();
        Ok(Self {
            config,
            store: FieldStore::new(),
            cache: FieldCache::new(),
            scheduler,
            spatial,
            generator,
            lod,
            followers: IndexMap::new(),
            metrics: TickMetrics::default(),
            tick_id: TickId(0),
            now: 0.0,
            worker_count,
        })
    }

    // ── public operations ─────────────────────────────────────────

    /// Opt an agent into flow-field guidance.
    ///
    /// Re-registering an existing follower resets its parameters and
    /// releases any assigned field.
    pub fn add_follower(&mut self, agent: AgentId, params: FollowerParams) {
        if let Some(old) = self.followers.insert(agent, Follower::new(params)) {
            if let Some(handle) = old.assigned {
                self.store.release_agent_ref(handle);
            }
        }
    }

    /// Remove an agent, releasing its field reference.
    pub fn remove_follower(&mut self, agent: AgentId) {
        if let Some(old) = self.followers.shift_remove(&agent) {
            if let Some(handle) = old.assigned {
                self.store.release_agent_ref(handle);
            }
        }
    }

    /// Enqueue a field covering a square of half-extent `radius` around
    /// `center`, steering toward `destination`. Never blocks: the
    /// returned handle resolves once generation (or a cache hit)
    /// completes, and reads as absent until then.
    pub fn create_field_for_area(
        &mut self,
        center: Vec2,
        destination: Vec2,
        radius: f32,
    ) -> FieldHandle {
        self.scheduler.request(
            center,
            destination,
            radius,
            self.config.field_cell_size,
            Urgency::Explicit,
            &mut self.store,
            &mut self.cache,
            self.now,
        )
    }

    /// Point an agent at a shared field.
    ///
    /// The agent releases any previous field. When the field is already
    /// generated its destination becomes the agent's destination, which
    /// also drives fallback steering while the handle is pending or after
    /// the field is evicted.
    pub fn assign_agent_to_field(
        &mut self,
        agent: AgentId,
        handle: FieldHandle,
        follow_strength: f32,
    ) -> Result<(), EngineError> {
        let destination = self.store.get(handle).map(|f| f.destination());
        let follower = self
            .followers
            .get_mut(&agent)
            .ok_or(EngineError::UnknownAgent { agent })?;
        if let Some(old) = follower.assigned.take() {
            self.store.release_agent_ref(old);
        }
        follower.follow_strength = follow_strength;
        if self.store.add_agent_ref(handle) {
            follower.assigned = Some(handle);
        }
        if let Some(destination) = destination {
            follower.destination = Some(destination);
        }
        Ok(())
    }

    /// Change where an agent is headed.
    ///
    /// Releases the current field and flags the follower so the next
    /// tick's demand phase issues an explicit (ungated) request for a
    /// field toward the new destination. The old field ages out of the
    /// cache on its own; there is no targeted invalidation.
    pub fn set_destination(
        &mut self,
        agent: AgentId,
        destination: Vec2,
    ) -> Result<(), EngineError> {
        let follower = self
            .followers
            .get_mut(&agent)
            .ok_or(EngineError::UnknownAgent { agent })?;
        follower.destination = Some(destination);
        follower.needs_explicit_refield = true;
        if let Some(old) = follower.assigned.take() {
            self.store.release_agent_ref(old);
        }
        Ok(())
    }

    /// Read-only field sample at a world position. Returns the zero
    /// vector for absent, pending, or out-of-bounds lookups.
    pub fn sample_field(&self, handle: FieldHandle, position: Vec2) -> Vec2 {
        match self.store.get(handle) {
            Some(field) => field.sample(position),
            None => Vec2::ZERO,
        }
    }

    /// Follower state for inspection.
    pub fn follower(&self, agent: AgentId) -> Option<&Follower> {
        self.followers.get(&agent)
    }

    /// Metrics from the most recent tick.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// Simulation time, advanced by [`tick`](Engine::tick).
    pub fn current_time(&self) -> f64 {
        self.now
    }

    /// Number of completed ticks.
    pub fn current_tick(&self) -> TickId {
        self.tick_id
    }

    /// Generated fields currently alive.
    pub fn live_fields(&self) -> usize {
        self.store.live_fields()
    }

    // ── tick ──────────────────────────────────────────────────────

    /// Advance the subsystem by `dt` time units.
    ///
    /// Phase order is fixed: spatial rebuild → demand analysis → request
    /// scheduling → cache sweep → LOD update → parallel movement
    /// planning → sequential move application. The sequential phases are
    /// the only writers of the store, cache, and queue; the parallel
    /// phase reads immutable snapshots only.
    pub fn tick<P, R>(&mut self, positions: &mut P, reference: &R, dt: f64)
    where
        P: PositionStore + Sync,
        R: ReferencePoint,
    {
        let tick_start = Instant::now();
        self.metrics.begin_tick();
        self.now += dt;
        let now = self.now;

        // 1. Spatial rebuild: agents and live field coverage.
        let phase_start = Instant::now();
        let agent_positions: Vec<(AgentId, Vec2)> = self
            .followers
            .keys()
            .filter_map(|&id| positions.position(id).map(|p| (id, p)))
            .collect();
        let field_areas: Vec<(FieldHandle, Vec2, f32)> = self
            .store
            .iter_ready()
            .map(|(handle, field)| (handle, field.center(), field.half_extent()))
            .collect();
        self.spatial.rebuild(agent_positions.iter().copied(), field_areas);
        self.metrics.spatial_rebuild_us = phase_start.elapsed().as_micros() as u64;

        // 2. Demand analysis: re-request for agents whose field is gone.
        let phase_start = Instant::now();
        self.analyze_demand(&agent_positions);

        // 3. Request scheduling: cache-first, gated, budgeted.
        self.scheduler.process(
            now,
            &mut self.store,
            &mut self.cache,
            &self.generator,
            &self.spatial,
            &mut self.metrics,
        );

        // 4. Cache retention sweep; release evicted fields.
        let evicted = self.cache.sweep(now, self.config.cache_retention);
        self.metrics.fields_evicted = evicted.len() as u32;
        for handle in evicted {
            self.store.release_cache(handle);
        }
        self.metrics.scheduling_us = phase_start.elapsed().as_micros() as u64;

        // 5. LOD re-evaluation for due followers.
        let reference_point = reference.reference();
        for (&agent, follower) in self.followers.iter_mut() {
            if !self.lod.due(follower.lod, follower.last_lod_update, now) {
                continue;
            }
            if let Some(position) = positions.position(agent) {
                follower.lod = self.lod.assign_tier(position.distance(reference_point));
                follower.last_lod_update = now;
            }
        }

        // 6. Parallel movement planning over immutable state.
        let phase_start = Instant::now();
        let snapshot: Vec<(AgentId, Follower)> = self
            .followers
            .iter()
            .map(|(&id, f)| (id, *f))
            .collect();
        let moves = movement::plan_moves(
            &snapshot,
            &*positions,
            &self.store,
            &self.spatial,
            &self.config.movement,
            now,
            dt,
            self.worker_count,
        );

        // 7. Sequential application: the single writer of positions.
        for planned in &moves {
            positions.set_position(planned.agent, planned.position);
            if let Some(follower) = self.followers.get_mut(&planned.agent) {
                follower.last_move = now;
            }
            if planned.used_fallback {
                self.metrics.agents_on_fallback += 1;
            }
        }
        self.metrics.movement_us = phase_start.elapsed().as_micros() as u64;

        self.tick_id = TickId(self.tick_id.0 + 1);
        self.metrics.total_us = tick_start.elapsed().as_micros() as u64;
        tracing::trace!(
            tick = %self.tick_id,
            total_us = self.metrics.total_us,
            moved = moves.len(),
            "tick complete"
        );
    }

    /// Issue requests for followers that want to move but whose assigned
    /// field reads absent (never assigned, evicted, or invalidated).
    ///
    /// Request centers are coarsened to half the default field radius so
    /// a cluster of agents collapses onto one request; demand gating then
    /// decides whether the cluster is worth a field.
    fn analyze_demand(&mut self, agent_positions: &[(AgentId, Vec2)]) {
        let coarsen = self.config.default_field_radius * 0.5;
        for &(agent, position) in agent_positions {
            let Some(follower) = self.followers.get(&agent) else {
                continue;
            };
            let Some(destination) = follower.destination else {
                continue;
            };
            // A field is usable while it is still being generated or
            // while the agent stands inside its coverage. Walking off
            // the grid counts as losing the field: the agent requests a
            // relay field for its new area instead of crawling on the
            // fallback path indefinitely.
            let has_usable = follower.assigned.is_some_and(|h| {
                self.store.is_pending(h)
                    || self
                        .store
                        .get(h)
                        .is_some_and(|field| field.world_to_grid(position).is_some())
            });
            if has_usable {
                continue;
            }

            let urgency = if follower.needs_explicit_refield {
                Urgency::Explicit
            } else {
                Urgency::Demand
            };
            let center = position.quantize(coarsen);
            let handle = self.scheduler.request(
                center,
                destination,
                self.config.default_field_radius,
                self.config.field_cell_size,
                urgency,
                &mut self.store,
                &mut self.cache,
                self.now,
            );
            let follower = self
                .followers
                .get_mut(&agent)
                .expect("follower checked above");
            follower.needs_explicit_refield = false;
            if let Some(old) = follower.assigned.take() {
                self.store.release_agent_ref(old);
            }
            if self.store.add_agent_ref(handle) {
                follower.assigned = Some(handle);
            }
        }
    }
}
