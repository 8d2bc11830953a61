//! Per-agent movement: field sampling, fallback steering, separation.
//!
//! Movement is split into a *planning* pass and an *apply* pass. Planning
//! is embarrassingly data-parallel — no agent's step depends on another's
//! result within the tick — so it fans out across a scoped worker pool,
//! reading only immutable state (positions snapshot, `Arc`-shared fields,
//! the rebuilt spatial index). The tick driver applies the planned moves
//! to the host's position store sequentially afterward.

use crate::agent::Follower;
use crate::config::MovementConfig;
use crate::spatial::SpatialIndex;
use drover_core::{AgentId, PositionStore, Vec2};
use drover_field::FieldStore;

/// An agent stops short of its destination within this distance.
const ARRIVAL_EPSILON: f32 = 0.25;

/// A worker resuming after a stall steps at most this many update
/// intervals at once, so backlogged agents never teleport.
const MAX_CATCHUP_INTERVALS: f64 = 4.0;

/// One agent's planned movement for this tick.
#[derive(Clone, Copy, Debug)]
pub struct PlannedMove {
    /// The agent to move.
    pub agent: AgentId,
    /// Its new position.
    pub position: Vec2,
    /// Whether the step came from the no-field fallback path.
    pub used_fallback: bool,
}

/// Plan movement for every due follower, in parallel when the population
/// and worker budget justify it.
pub(crate) fn plan_moves<P: PositionStore + Sync>(
    followers: &[(AgentId, Follower)],
    positions: &P,
    store: &FieldStore,
    spatial: &SpatialIndex,
    config: &MovementConfig,
    now: f64,
    dt: f64,
    workers: usize,
) -> Vec<PlannedMove> {
    let chunk_size = followers.len().div_ceil(workers.max(1)).max(1);
    if workers <= 1 || followers.len() <= chunk_size {
        return followers
            .iter()
            .filter_map(|(id, f)| step_agent(*id, f, positions, store, spatial, config, now, dt))
            .collect();
    }

    let chunk_results: Vec<Vec<PlannedMove>> = std::thread::scope(|scope| {
        let handles: Vec<_> = followers
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .filter_map(|(id, f)| {
                            step_agent(*id, f, positions, store, spatial, config, now, dt)
                        })
                        .collect()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("movement worker panicked"))
            .collect()
    });
    chunk_results.into_iter().flatten().collect()
}

/// Compute one agent's step, or `None` when it is not due or does not
/// move.
fn step_agent<P: PositionStore + Sync>(
    id: AgentId,
    follower: &Follower,
    positions: &P,
    store: &FieldStore,
    spatial: &SpatialIndex,
    config: &MovementConfig,
    now: f64,
    dt: f64,
) -> Option<PlannedMove> {
    let pos = positions.position(id)?;
    let tier = follower.lod;
    let elapsed = now - follower.last_move;
    if elapsed < tier.update_interval() {
        return None;
    }
    // A finite gap means the agent skipped ticks by design (or stalled);
    // step over the gap, capped so backlog never becomes a teleport.
    let step_dt = if elapsed.is_finite() {
        elapsed.min(tier.update_interval() * MAX_CATCHUP_INTERVALS) as f32
    } else {
        dt as f32
    };

    let speed = follower.preferred_speed * tier.speed_multiplier();
    let sample_pos = pos.quantize(tier.quantization());

    let mut used_fallback = false;
    let mut delta = Vec2::ZERO;
    match follower.assigned.and_then(|h| store.get(h)) {
        Some(field) => {
            let dir = field.sample(sample_pos);
            if dir.length() > config.direction_epsilon {
                delta = dir * (speed * follower.follow_strength * step_dt);
            } else if field.cost_at(sample_pos).is_none_or(f32::is_infinite) {
                // Off the grid or in an unreachable pocket: the field has
                // no guidance here, so steer directly.
                delta = fallback_step(follower, pos, speed, step_dt, config);
                used_fallback = delta != Vec2::ZERO;
            }
            // Zero direction with finite cost is the destination cell:
            // the agent has arrived and holds position.
        }
        None => {
            delta = fallback_step(follower, pos, speed, step_dt, config);
            used_fallback = delta != Vec2::ZERO;
        }
    }

    let offset = if config.use_local_avoidance {
        separation_offset(id, follower, pos, spatial, config, speed * step_dt)
    } else {
        Vec2::ZERO
    };

    let moved = delta + offset;
    if moved.length_squared() == 0.0 {
        return None;
    }
    Some(PlannedMove {
        agent: id,
        position: pos + moved,
        used_fallback,
    })
}

/// Direct steering for agents without usable field guidance: straight
/// line toward the destination at reduced speed. An agent with no
/// destination holds position.
fn fallback_step(
    follower: &Follower,
    pos: Vec2,
    speed: f32,
    step_dt: f32,
    config: &MovementConfig,
) -> Vec2 {
    let Some(destination) = follower.destination else {
        return Vec2::ZERO;
    };
    let to_destination = destination - pos;
    if to_destination.length() <= ARRIVAL_EPSILON {
        return Vec2::ZERO;
    }
    to_destination.normalize_or_zero() * (speed * config.fallback_speed_factor * step_dt)
}

/// Inverse-falloff repulsion from neighbors within the avoidance radius,
/// capped at half the step length so separation stays subordinate to
/// field following.
fn separation_offset(
    id: AgentId,
    follower: &Follower,
    pos: Vec2,
    spatial: &SpatialIndex,
    config: &MovementConfig,
    step_length: f32,
) -> Vec2 {
    let radius = follower.avoidance_radius;
    if radius <= 0.0 || config.separation_strength <= 0.0 {
        return Vec2::ZERO;
    }

    let mut push = Vec2::ZERO;
    for (other, other_pos) in spatial.agents_within(pos, radius) {
        if other == id {
            continue;
        }
        let away = pos - other_pos;
        let distance = away.length();
        if distance > 1e-4 {
            push += (away / distance) * (1.0 - distance / radius);
        } else {
            // Exactly stacked agents: split them along an id-derived
            // direction so both sides pick different ways out.
            let angle = (id.0 % 1024) as f32 * 2.399_963; // golden angle
            push += Vec2::new(angle.cos(), angle.sin());
        }
    }
    if push == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let offset = push * (config.separation_strength * step_length);
    let cap = step_length * 0.5;
    if offset.length() > cap {
        offset.normalize_or_zero() * cap
    } else {
        offset
    }
}
