//! Collaborator traits at the subsystem boundary.
//!
//! Drover never owns agent transforms. The host exposes them through
//! [`PositionStore`]; the LOD controller measures distance to whatever
//! the host nominates as the [`ReferencePoint`] (camera, player, ...).
//!
//! [`InMemoryPositions`] and [`StaticReference`] are convenience
//! implementations for hosts without an existing transform layer, and for
//! tests.

use crate::id::AgentId;
use crate::math::Vec2;
use indexmap::IndexMap;

/// Read/write access to agent positions owned by the host.
///
/// Reads happen concurrently during the parallel movement phase; writes
/// happen only from the tick driver after planning completes, so
/// implementations need no interior synchronization.
pub trait PositionStore {
    /// Current position of an agent, or `None` if the host no longer
    /// tracks it.
    fn position(&self, agent: AgentId) -> Option<Vec2>;

    /// Write an agent's position after a movement step. Unknown agents are
    /// ignored.
    fn set_position(&mut self, agent: AgentId, position: Vec2);
}

/// Provides the point the LOD controller measures agent distance against.
pub trait ReferencePoint {
    /// The current reference position (e.g. camera or player).
    fn reference(&self) -> Vec2;
}

/// A plain map-backed [`PositionStore`].
///
/// Iteration order is insertion order (`IndexMap`), which keeps tick
/// processing deterministic for a given insertion sequence.
#[derive(Debug, Default)]
pub struct InMemoryPositions {
    positions: IndexMap<AgentId, Vec2>,
}

impl InMemoryPositions {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an agent's position.
    pub fn insert(&mut self, agent: AgentId, position: Vec2) {
        self.positions.insert(agent, position);
    }

    /// Remove an agent.
    pub fn remove(&mut self, agent: AgentId) {
        self.positions.shift_remove(&agent);
    }

    /// Number of tracked agents.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionStore for InMemoryPositions {
    fn position(&self, agent: AgentId) -> Option<Vec2> {
        self.positions.get(&agent).copied()
    }

    fn set_position(&mut self, agent: AgentId, position: Vec2) {
        if let Some(slot) = self.positions.get_mut(&agent) {
            *slot = position;
        }
    }
}

/// A fixed [`ReferencePoint`], settable between ticks.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticReference(pub Vec2);

impl ReferencePoint for StaticReference {
    fn reference(&self) -> Vec2 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_position_ignores_unknown_agents() {
        let mut store = InMemoryPositions::new();
        store.insert(AgentId(1), Vec2::new(1.0, 2.0));
        store.set_position(AgentId(99), Vec2::new(5.0, 5.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.position(AgentId(99)), None);
    }

    #[test]
    fn set_position_updates_known_agents() {
        let mut store = InMemoryPositions::new();
        store.insert(AgentId(1), Vec2::ZERO);
        store.set_position(AgentId(1), Vec2::new(3.0, 4.0));
        assert_eq!(store.position(AgentId(1)), Some(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn static_reference_returns_point() {
        let r = StaticReference(Vec2::new(10.0, -2.0));
        assert_eq!(r.reference(), Vec2::new(10.0, -2.0));
    }
}
