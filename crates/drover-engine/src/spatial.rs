//! Uniform-grid spatial index over agents and field coverage areas.
//!
//! Rebuilt from scratch every tick — populations are bounded (hundreds to
//! low thousands) and a full O(n) rebuild is cheaper and simpler than
//! incremental maintenance under continuous movement. Reads after the
//! rebuild phase are lock-free; nothing mutates the index mid-tick.

use drover_core::{AgentId, Vec2};
use drover_field::FieldHandle;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Axis mixing primes; chosen for few collisions over quantized grids.
const PRIME_X: i64 = 73_856_093;
const PRIME_Y: i64 = 19_349_663;

/// Integer key of a quantized grid cell. Recomputed every tick, never
/// persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpatialCellKey(pub i64);

/// One occupant of a spatial bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpatialEntry {
    /// A moving agent at its position this tick.
    Agent {
        /// The agent.
        id: AgentId,
        /// Its position when the index was rebuilt.
        position: Vec2,
    },
    /// A live flow field's coverage area.
    Field {
        /// Handle of the covering field.
        handle: FieldHandle,
        /// Coverage center.
        center: Vec2,
        /// Coverage half-extent.
        radius: f32,
    },
}

/// Multi-valued map from quantized cells to their occupants.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    buckets: IndexMap<SpatialCellKey, SmallVec<[SpatialEntry; 4]>>,
}

impl SpatialIndex {
    /// Create an index with the given bucket edge length.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            buckets: IndexMap::new(),
        }
    }

    /// Key of the cell containing `position`.
    pub fn key_for(&self, position: Vec2) -> SpatialCellKey {
        let qx = (position.x / self.cell_size).floor() as i64;
        let qy = (position.y / self.cell_size).floor() as i64;
        SpatialCellKey((qx.wrapping_mul(PRIME_X)) ^ (qy.wrapping_mul(PRIME_Y)))
    }

    /// Clear and repopulate from this tick's agents and field areas.
    ///
    /// Agents land in their containing cell; a field lands in every cell
    /// its square coverage area overlaps, so point queries find it from
    /// anywhere inside.
    pub fn rebuild<A, F>(&mut self, agents: A, fields: F)
    where
        A: IntoIterator<Item = (AgentId, Vec2)>,
        F: IntoIterator<Item = (FieldHandle, Vec2, f32)>,
    {
        self.buckets.clear();
        for (id, position) in agents {
            let key = self.key_for(position);
            self.buckets
                .entry(key)
                .or_default()
                .push(SpatialEntry::Agent { id, position });
        }
        for (handle, center, radius) in fields {
            for key in Self::covered_keys(self.cell_size, center, radius) {
                self.buckets.entry(key).or_default().push(SpatialEntry::Field {
                    handle,
                    center,
                    radius,
                });
            }
        }
    }

    /// Occupants of one cell. Empty for unoccupied cells.
    pub fn query(&self, key: SpatialCellKey) -> &[SpatialEntry] {
        self.buckets.get(&key).map(|b| b.as_slice()).unwrap_or(&[])
    }

    /// Agents within `radius` of `position`, exact-distance filtered.
    pub fn agents_within(&self, position: Vec2, radius: f32) -> Vec<(AgentId, Vec2)> {
        let mut result = Vec::new();
        let radius_sq = radius * radius;
        for key in Self::covered_keys(self.cell_size, position, radius) {
            for entry in self.query(key) {
                if let SpatialEntry::Agent { id, position: p } = entry {
                    if (*p - position).length_squared() <= radius_sq {
                        result.push((*id, *p));
                    }
                }
            }
        }
        result
    }

    /// Number of agents within `radius` of `position`.
    pub fn count_agents_within(&self, position: Vec2, radius: f32) -> usize {
        let mut count = 0;
        let radius_sq = radius * radius;
        for key in Self::covered_keys(self.cell_size, position, radius) {
            for entry in self.query(key) {
                if let SpatialEntry::Agent { position: p, .. } = entry {
                    if (*p - position).length_squared() <= radius_sq {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Handles of fields whose coverage area contains `position`.
    pub fn fields_covering(&self, position: Vec2) -> Vec<FieldHandle> {
        let mut result = Vec::new();
        for entry in self.query(self.key_for(position)) {
            if let SpatialEntry::Field {
                handle,
                center,
                radius,
            } = entry
            {
                let local = position - *center;
                if local.x.abs() <= *radius && local.y.abs() <= *radius {
                    result.push(*handle);
                }
            }
        }
        result
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }

    /// Keys of all cells overlapping a square of half-extent `radius`
    /// around `center`.
    fn covered_keys(
        cell_size: f32,
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = SpatialCellKey> {
        let min_x = ((center.x - radius) / cell_size).floor() as i64;
        let max_x = ((center.x + radius) / cell_size).floor() as i64;
        let min_y = ((center.y - radius) / cell_size).floor() as i64;
        let max_y = ((center.y + radius) / cell_size).floor() as i64;
        (min_y..=max_y).flat_map(move |qy| {
            (min_x..=max_x).map(move |qx| {
                SpatialCellKey((qx.wrapping_mul(PRIME_X)) ^ (qy.wrapping_mul(PRIME_Y)))
            })
        })
    }
}
