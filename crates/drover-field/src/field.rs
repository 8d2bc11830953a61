//! The immutable flow-field artifact.

use drover_core::Vec2;

/// Direction magnitudes below this are treated as "no direction".
pub const DIRECTION_EPSILON: f32 = 0.01;

/// An immutable grid of propagated costs and flow directions.
///
/// Built once by [`FieldGenerator`](crate::FieldGenerator), then shared by
/// reference among every agent steering toward its destination. A cell's
/// direction is a unit vector pointing down the cost gradient; the zero
/// vector marks the destination cell itself and unreachable cells. A cost
/// of `f32::INFINITY` marks unreachable cells.
///
/// Invariant: `directions.len() == costs.len() == width * height`.
#[derive(Clone, Debug)]
pub struct FlowField {
    origin: Vec2,
    cell_size: f32,
    width: u32,
    height: u32,
    destination: Vec2,
    costs: Vec<f32>,
    directions: Vec<Vec2>,
}

impl FlowField {
    /// Assemble a field from generator output.
    ///
    /// # Panics
    ///
    /// Panics if the array lengths do not match `width * height`. Only the
    /// generator constructs fields, so a mismatch is a construction bug,
    /// not a runtime condition.
    pub(crate) fn new(
        origin: Vec2,
        cell_size: f32,
        width: u32,
        height: u32,
        destination: Vec2,
        costs: Vec<f32>,
        directions: Vec<Vec2>,
    ) -> Self {
        let cells = (width as usize) * (height as usize);
        assert_eq!(costs.len(), cells, "cost array length mismatch");
        assert_eq!(directions.len(), cells, "direction array length mismatch");
        Self {
            origin,
            cell_size,
            width,
            height,
            destination,
            costs,
            directions,
        }
    }

    /// World-space minimum corner of the grid.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Edge length of one grid cell in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Grid width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The world point this field steers toward.
    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    /// World-space center of the coverage area.
    pub fn center(&self) -> Vec2 {
        self.origin
            + Vec2::new(
                self.width as f32 * self.cell_size * 0.5,
                self.height as f32 * self.cell_size * 0.5,
            )
    }

    /// Coverage half-extent along the larger axis.
    pub fn half_extent(&self) -> f32 {
        let w = self.width as f32 * self.cell_size;
        let h = self.height as f32 * self.cell_size;
        w.max(h) * 0.5
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Propagated path costs, row-major.
    pub fn costs(&self) -> &[f32] {
        &self.costs
    }

    /// Flow directions, row-major.
    pub fn directions(&self) -> &[Vec2] {
        &self.directions
    }

    /// Flat index for a cell coordinate.
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Map a world position to the containing grid cell, or `None` when
    /// the position lies outside the grid.
    pub fn world_to_grid(&self, world: Vec2) -> Option<(u32, u32)> {
        let local = world - self.origin;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let x = (local.x / self.cell_size) as u32;
        let y = (local.y / self.cell_size) as u32;
        if x < self.width && y < self.height {
            Some((x, y))
        } else {
            None
        }
    }

    /// Map a world position to the containing cell, clamping out-of-bounds
    /// positions to the nearest edge cell.
    pub fn world_to_grid_clamped(&self, world: Vec2) -> (u32, u32) {
        let local = world - self.origin;
        let x = (local.x / self.cell_size).floor().max(0.0) as u32;
        let y = (local.y / self.cell_size).floor().max(0.0) as u32;
        (x.min(self.width - 1), y.min(self.height - 1))
    }

    /// World-space center of a grid cell.
    pub fn grid_to_world(&self, x: u32, y: u32) -> Vec2 {
        let half = self.cell_size * 0.5;
        self.origin
            + Vec2::new(
                x as f32 * self.cell_size + half,
                y as f32 * self.cell_size + half,
            )
    }

    /// Flow direction at a world position.
    ///
    /// Positions outside the grid return the zero vector rather than
    /// failing; callers apply their own fallback.
    pub fn sample(&self, world: Vec2) -> Vec2 {
        match self.world_to_grid(world) {
            Some((x, y)) => self.directions[self.index(x, y)],
            None => Vec2::ZERO,
        }
    }

    /// Propagated cost at a world position, or `None` outside the grid.
    pub fn cost_at(&self, world: Vec2) -> Option<f32> {
        self.world_to_grid(world).map(|(x, y)| self.costs[self.index(x, y)])
    }
}
