//! Flow-field generation: cost propagation and direction derivation.
//!
//! Generation is a single-source shortest-path sweep (Dijkstra over a
//! uniform-cost 8-connected grid) seeded at the destination cell, followed
//! by a gradient pass that turns per-cell costs into unit direction
//! vectors. Both passes are synchronous and bounded by the grid cell
//! count; the scheduler, not the generator, limits how many generations
//! run per tick.

use crate::field::FlowField;
use crate::request::GenerationRequest;
use crate::terrain::{OpenTerrain, TerrainSampler};
use drover_core::Vec2;
use std::sync::Arc;

/// Orthogonal step cost.
const CARDINAL_COST: f32 = 1.0;
/// Diagonal step cost.
const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// 8-connected neighborhood offsets: cardinals first, then diagonals.
const OFFSETS_8: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Builds [`FlowField`]s from [`GenerationRequest`]s.
///
/// Stateless apart from the terrain seam, so independent requests within a
/// tick's budget may be generated concurrently — each writes a disjoint
/// field object.
#[derive(Clone)]
pub struct FieldGenerator {
    terrain: Arc<dyn TerrainSampler>,
}

impl FieldGenerator {
    /// Grid dimensions are clamped to this many cells per axis. A request
    /// whose `radius / cell_size` ratio exceeds it gets a coarser field
    /// rather than an unbounded allocation.
    pub const MAX_DIM: u32 = 512;

    /// Create a generator that consults `terrain` for passability.
    pub fn new(terrain: Arc<dyn TerrainSampler>) -> Self {
        Self { terrain }
    }

    /// Create a generator over fully-open terrain.
    pub fn open() -> Self {
        Self::new(Arc::new(OpenTerrain))
    }

    /// Generate a field covering a square of half-extent `request.radius`
    /// centered on `request.center`, steering toward
    /// `request.destination`.
    ///
    /// A destination outside the coverage area is clamped to the nearest
    /// edge cell. Cells unreachable from the destination keep infinite
    /// cost and the zero direction; callers fall back rather than fail.
    pub fn generate(&self, request: &GenerationRequest) -> FlowField {
        let cell_size = if request.cell_size > 0.0 {
            request.cell_size
        } else {
            1.0
        };
        let radius = request.radius.max(cell_size);
        let dim = grid_dim(radius, cell_size);
        let extent = dim as f32 * cell_size;
        let origin = request.center - Vec2::new(extent * 0.5, extent * 0.5);

        let width = dim;
        let height = dim;
        let cells = (width as usize) * (height as usize);

        tracing::debug!(
            width,
            height,
            cell_size,
            destination = %request.destination,
            "generating flow field"
        );

        // Passability mask, one terrain query per cell center.
        let half = cell_size * 0.5;
        let mut passable = vec![true; cells];
        for y in 0..height {
            for x in 0..width {
                let center = origin
                    + Vec2::new(x as f32 * cell_size + half, y as f32 * cell_size + half);
                passable[(y * width + x) as usize] = self.terrain.passable(center);
            }
        }

        let costs = propagate_costs(
            width,
            height,
            &passable,
            destination_cell(origin, cell_size, width, height, request.destination),
        );
        let directions = derive_directions(width, height, &costs);

        FlowField::new(
            origin,
            cell_size,
            width,
            height,
            request.destination,
            costs,
            directions,
        )
    }
}

/// Cells per axis for a request: `ceil(2r / cell)`, clamped to
/// `[1, MAX_DIM]`.
fn grid_dim(radius: f32, cell_size: f32) -> u32 {
    let dim = ((radius * 2.0) / cell_size).ceil() as u32;
    dim.clamp(1, FieldGenerator::MAX_DIM)
}

/// Locate the destination's grid cell, clamping out-of-bounds
/// destinations to the nearest valid cell.
fn destination_cell(
    origin: Vec2,
    cell_size: f32,
    width: u32,
    height: u32,
    destination: Vec2,
) -> (u32, u32) {
    let local = destination - origin;
    let x = (local.x / cell_size).floor().max(0.0) as u32;
    let y = (local.y / cell_size).floor().max(0.0) as u32;
    (x.min(width - 1), y.min(height - 1))
}

/// Dijkstra cost propagation from the destination cell.
///
/// The open list is a plain vector with linear minimum extraction — at
/// these grid scales the constant factor beats a binary heap's bookkeeping
/// and keeps the inner loop branch-light.
fn propagate_costs(width: u32, height: u32, passable: &[bool], dest: (u32, u32)) -> Vec<f32> {
    let w = width as usize;
    let cells = w * height as usize;
    let mut costs = vec![f32::INFINITY; cells];
    let mut in_open = vec![false; cells];

    let dest_idx = dest.1 as usize * w + dest.0 as usize;
    costs[dest_idx] = 0.0;
    let mut open: Vec<usize> = vec![dest_idx];
    in_open[dest_idx] = true;

    while !open.is_empty() {
        // Extract the lowest-cost open cell.
        let mut best = 0;
        for i in 1..open.len() {
            if costs[open[i]] < costs[open[best]] {
                best = i;
            }
        }
        let current = open.swap_remove(best);
        in_open[current] = false;
        let current_cost = costs[current];

        let cx = (current % w) as i32;
        let cy = (current / w) as i32;

        for (dx, dy) in OFFSETS_8 {
            let nx = cx + dx;
            let ny = cy + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            let neighbor = ny as usize * w + nx as usize;
            if !passable[neighbor] {
                continue;
            }
            let step = if dx != 0 && dy != 0 {
                DIAGONAL_COST
            } else {
                CARDINAL_COST
            };
            let tentative = current_cost + step;
            if tentative < costs[neighbor] {
                costs[neighbor] = tentative;
                if !in_open[neighbor] {
                    open.push(neighbor);
                    in_open[neighbor] = true;
                }
            }
        }
    }

    costs
}

/// Turn propagated costs into per-cell unit directions.
///
/// Each cell accumulates a vector toward every strictly-lower-cost
/// neighbor, weighted by the cost drop, then normalizes the sum. Cells
/// with no lower neighbor — the destination and anything unreachable —
/// get the zero vector.
fn derive_directions(width: u32, height: u32, costs: &[f32]) -> Vec<Vec2> {
    let w = width as usize;
    let mut directions = vec![Vec2::ZERO; costs.len()];

    for cy in 0..height as i32 {
        for cx in 0..width as i32 {
            let idx = cy as usize * w + cx as usize;
            let cost = costs[idx];
            if !cost.is_finite() {
                continue;
            }

            let mut sum = Vec2::ZERO;
            for (dx, dy) in OFFSETS_8 {
                let nx = cx + dx;
                let ny = cy + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                    continue;
                }
                let neighbor_cost = costs[ny as usize * w + nx as usize];
                if neighbor_cost < cost {
                    let toward = Vec2::new(dx as f32, dy as f32).normalize_or_zero();
                    sum += toward * (cost - neighbor_cost);
                }
            }
            directions[idx] = sum.normalize_or_zero();
        }
    }

    directions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::request::Urgency;
    use crate::store::FieldHandle;
    use proptest::prelude::*;

    fn request(center: Vec2, destination: Vec2, radius: f32, cell_size: f32) -> GenerationRequest {
        GenerationRequest {
            center,
            destination,
            radius,
            cell_size,
            key: CacheKey::quantize(center, destination, radius, 0.5),
            urgency: Urgency::Explicit,
            handle: FieldHandle::from_raw_parts(0, 0),
            arrival_seq: 0,
        }
    }

    /// 10×10 grid, cell size 1, destination in cell (5,5): the scenario
    /// from the cost-propagation contract.
    fn open_10x10() -> FlowField {
        FieldGenerator::open().generate(&request(
            Vec2::new(5.0, 5.0),
            Vec2::new(5.5, 5.5),
            5.0,
            1.0,
        ))
    }

    #[test]
    fn destination_cell_has_zero_cost_and_direction() {
        let field = open_10x10();
        let idx = field.index(5, 5);
        assert_eq!(field.costs()[idx], 0.0);
        assert_eq!(field.directions()[idx], Vec2::ZERO);
        assert_eq!(field.sample(Vec2::new(5.5, 5.5)), Vec2::ZERO);
    }

    #[test]
    fn corner_cost_matches_diagonal_path() {
        let field = open_10x10();
        // (0,0) → (5,5) is five diagonal steps: 5 · √2 ≈ 7.07.
        let cost = field.costs()[field.index(0, 0)];
        assert!((cost - 5.0 * std::f32::consts::SQRT_2).abs() < 1e-4, "got {cost}");
    }

    #[test]
    fn directions_point_toward_decreasing_cost() {
        let field = open_10x10();
        let w = field.width();
        for y in 0..field.height() {
            for x in 0..w {
                let idx = field.index(x, y);
                let dir = field.directions()[idx];
                if dir == Vec2::ZERO {
                    continue;
                }
                // Moving half a cell along the direction must not increase
                // cost (gradient-following).
                let here = field.grid_to_world(x, y);
                let ahead = here + dir * (field.cell_size() * 0.9);
                let c0 = field.cost_at(here).unwrap();
                let c1 = field.cost_at(ahead).unwrap_or(f32::INFINITY);
                assert!(c1 <= c0, "cost rose from {c0} to {c1} at ({x},{y})");
            }
        }
    }

    #[test]
    fn destination_outside_grid_clamps_to_edge() {
        let field = FieldGenerator::open().generate(&request(
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            5.0,
            1.0,
        ));
        // The clamped cell sits on the +x edge, y clamped into range.
        let (dx, dy) = field.world_to_grid_clamped(Vec2::new(100.0, 0.0));
        assert_eq!(dx, field.width() - 1);
        assert_eq!(field.costs()[field.index(dx, dy)], 0.0);
        // The far side of the grid is still reachable from the edge seed.
        assert!(field.costs()[field.index(0, dy)].is_finite());
    }

    struct Wall;
    impl TerrainSampler for Wall {
        fn passable(&self, world: Vec2) -> bool {
            // A full-height wall at x ∈ [4, 5) in world space.
            !(4.0..5.0).contains(&world.x)
        }
    }

    #[test]
    fn walled_off_region_is_unreachable() {
        let generator = FieldGenerator::new(Arc::new(Wall));
        let field = generator.generate(&request(
            Vec2::new(5.0, 5.0),
            Vec2::new(8.5, 5.5),
            5.0,
            1.0,
        ));
        // Cells left of the wall can never reach the destination.
        let blocked = field.index(1, 5);
        assert!(field.costs()[blocked].is_infinite());
        assert_eq!(field.directions()[blocked], Vec2::ZERO);
        // Cells right of the wall can.
        let reachable = field.index(7, 5);
        assert!(field.costs()[reachable].is_finite());
    }

    #[test]
    fn oversized_request_is_clamped() {
        assert_eq!(grid_dim(1e6, 1.0), FieldGenerator::MAX_DIM);
        assert_eq!(grid_dim(0.1, 1.0), 1);
        assert_eq!(grid_dim(5.0, 1.0), 10);
    }

    proptest! {
        // Monotonic cost: costs are non-negative, and every finite-cost
        // cell other than the seed has a strictly cheaper neighbor to
        // descend toward.
        #[test]
        fn cost_field_is_monotonic(
            radius in 2.0f32..12.0,
            dx in -10.0f32..10.0,
            dy in -10.0f32..10.0,
        ) {
            let field = FieldGenerator::open().generate(&request(
                Vec2::ZERO,
                Vec2::new(dx, dy),
                radius,
                1.0,
            ));
            let w = field.width() as i32;
            let h = field.height() as i32;
            for cy in 0..h {
                for cx in 0..w {
                    let idx = field.index(cx as u32, cy as u32);
                    let cost = field.costs()[idx];
                    prop_assert!(cost >= 0.0 || cost.is_infinite());
                    if cost > 0.0 && cost.is_finite() {
                        let mut lowest = f32::INFINITY;
                        for (ox, oy) in OFFSETS_8 {
                            let nx = cx + ox;
                            let ny = cy + oy;
                            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                                continue;
                            }
                            let nc = field.costs()[field.index(nx as u32, ny as u32)];
                            lowest = lowest.min(nc);
                        }
                        prop_assert!(
                            lowest < cost,
                            "cell ({cx},{cy}) cost {cost} has no cheaper neighbor",
                        );
                    }
                }
            }
        }

        // Gradient-following: each stored direction has positive dot
        // product with the offset toward at least one strictly cheaper
        // neighbor.
        #[test]
        fn directions_agree_with_gradient(
            radius in 2.0f32..10.0,
            dx in -8.0f32..8.0,
            dy in -8.0f32..8.0,
        ) {
            let field = FieldGenerator::open().generate(&request(
                Vec2::ZERO,
                Vec2::new(dx, dy),
                radius,
                1.0,
            ));
            let w = field.width() as i32;
            let h = field.height() as i32;
            for cy in 0..h {
                for cx in 0..w {
                    let idx = field.index(cx as u32, cy as u32);
                    let dir = field.directions()[idx];
                    if dir == Vec2::ZERO {
                        continue;
                    }
                    let cost = field.costs()[idx];
                    let mut agrees = false;
                    for (ox, oy) in OFFSETS_8 {
                        let nx = cx + ox;
                        let ny = cy + oy;
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let nc = field.costs()[field.index(nx as u32, ny as u32)];
                        if nc < cost
                            && dir.dot(Vec2::new(ox as f32, oy as f32)) > 0.0
                        {
                            agrees = true;
                            break;
                        }
                    }
                    prop_assert!(agrees, "direction at ({cx},{cy}) fights the gradient");
                }
            }
        }
    }
}
