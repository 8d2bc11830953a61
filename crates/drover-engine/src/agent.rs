//! Follower state for agents opted into flow-field guidance.

use crate::lod::LodTier;
use drover_core::Vec2;
use drover_field::FieldHandle;

/// Construction parameters for a follower.
#[derive(Clone, Copy, Debug)]
pub struct FollowerParams {
    /// Base movement speed in world units per time unit. Default: 3.0.
    pub preferred_speed: f32,
    /// Radius of the local separation query. Default: 1.5.
    pub avoidance_radius: f32,
    /// Scale on the field-following step; 1.0 = full guidance.
    pub follow_strength: f32,
}

impl Default for FollowerParams {
    fn default() -> Self {
        Self {
            preferred_speed: 3.0,
            avoidance_radius: 1.5,
            follow_strength: 1.0,
        }
    }
}

/// Per-agent guidance state.
///
/// The follower holds a *handle* to its field, never the field itself;
/// positions stay in the host's store. Everything here is owned by the
/// engine and mutated only from the sequential phases.
#[derive(Clone, Copy, Debug)]
pub struct Follower {
    /// Field this agent currently samples, if any.
    pub assigned: Option<FieldHandle>,
    /// Where this agent is trying to go. Drives re-requests when the
    /// assigned field reads absent, and the straight-line fallback.
    pub destination: Option<Vec2>,
    /// Base movement speed.
    pub preferred_speed: f32,
    /// Local separation query radius.
    pub avoidance_radius: f32,
    /// Scale on the field-following step.
    pub follow_strength: f32,
    /// Current fidelity tier.
    pub lod: LodTier,
    /// When the tier was last re-evaluated.
    pub last_lod_update: f64,
    /// When this agent last took a movement step (tier-throttled).
    pub last_move: f64,
    /// Set by `set_destination`: the next demand pass issues an ungated
    /// request for this agent instead of a gated one.
    pub needs_explicit_refield: bool,
}

impl Follower {
    /// Create a follower from parameters, unassigned and at the highest
    /// fidelity until the first LOD pass runs.
    pub fn new(params: FollowerParams) -> Self {
        Self {
            assigned: None,
            destination: None,
            preferred_speed: params.preferred_speed,
            avoidance_radius: params.avoidance_radius,
            follow_strength: params.follow_strength,
            lod: LodTier::High,
            last_lod_update: f64::NEG_INFINITY,
            last_move: f64::NEG_INFINITY,
            needs_explicit_refield: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_follower_is_unassigned_and_due() {
        let f = Follower::new(FollowerParams::default());
        assert!(f.assigned.is_none());
        assert!(f.destination.is_none());
        assert_eq!(f.lod, LodTier::High);
        // NEG_INFINITY timestamps make the first tick re-evaluate
        // immediately.
        assert!(f.last_lod_update < 0.0);
    }
}
