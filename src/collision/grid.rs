//! Uniform grid broad-phase.
//!
//! The world is split into `rows x cols` equal cells. Cells are addressed by a
//! flat id `row * cols + col`; a particle's cell depends only on its current
//! position, and the grid is rebuilt from scratch before every resolution pass.

use glam::Vec2;

use crate::{config::SimulationConfig, core::store::ParticleStore, error::ConfigError};

/// Geometry shared by the index grid and the SoA grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    rows: u32,
    cols: u32,
    cell_size: Vec2,
}

impl GridLayout {
    /// Validates and builds a layout. World extents must be positive whole
    /// units, and `rows`/`cols` must divide them exactly.
    pub fn new(
        world_width: f32,
        world_height: f32,
        rows: u32,
        cols: u32,
    ) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }

        let whole =
            |v: f32| v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f32;
        if !whole(world_width) || !whole(world_height) {
            return Err(ConfigError::InvalidWorldSize {
                width: world_width,
                height: world_height,
            });
        }

        if (world_width as u64) % cols as u64 != 0 || (world_height as u64) % rows as u64 != 0 {
            return Err(ConfigError::NonDividingGrid {
                width: world_width,
                height: world_height,
                rows,
                cols,
            });
        }

        Ok(Self {
            rows,
            cols,
            cell_size: Vec2::new(world_width / cols as f32, world_height / rows as f32),
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.world_size.x,
            config.world_size.y,
            config.grid_rows,
            config.grid_cols,
        )
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    #[inline]
    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// `(row, col)` of the cell containing `(x, y)`.
    ///
    /// Always in range: coordinates on or past the far edge land in the last
    /// row/column, negative ones (and NaN) in the first. Boundary clamping in
    /// the integrator does not make this clamp optional, since resolution can
    /// push particles outside the world before the next integration.
    #[inline]
    pub fn cell_coords(&self, x: f32, y: f32) -> (u32, u32) {
        // `max` maps NaN to 0.0; the float-to-int cast saturates.
        let row = ((y / self.cell_size.y).floor().max(0.0) as u32).min(self.rows - 1);
        let col = ((x / self.cell_size.x).floor().max(0.0) as u32).min(self.cols - 1);
        (row, col)
    }

    #[inline]
    pub fn cell_id(&self, x: f32, y: f32) -> usize {
        let (row, col) = self.cell_coords(x, y);
        row as usize * self.cols as usize + col as usize
    }

    /// Whether a (possibly negative) flat id addresses a cell.
    #[inline]
    pub fn is_valid_cell(&self, id: i64) -> bool {
        id >= 0 && (id as u64) < self.cell_count() as u64
    }

    /// Valid ids of the 3x3 block centred on `id`, home cell first.
    ///
    /// Offsets that would leave the grid, including horizontal ones that would
    /// wrap onto the neighbouring row, are skipped, so edge cells have fewer
    /// than nine neighbours.
    pub fn neighbors(&self, id: usize) -> NeighborIds {
        let mut out = NeighborIds::default();
        if !self.is_valid_cell(id as i64) {
            return out;
        }

        let cols = self.cols as i64;
        let row = id as i64 / cols;
        let col = id as i64 % cols;

        const OFFSETS: [(i64, i64); 9] = [
            (0, 0),
            (0, -1),
            (0, 1),
            (1, 0),
            (1, -1),
            (1, 1),
            (-1, 0),
            (-1, -1),
            (-1, 1),
        ];

        for (dr, dc) in OFFSETS {
            let (r, c) = (row + dr, col + dc);
            if r < 0 || r >= self.rows as i64 || c < 0 || c >= cols {
                continue;
            }
            let neighbor = r * cols + c;
            if self.is_valid_cell(neighbor) {
                out.push(neighbor as usize);
            }
        }
        out
    }
}

/// Fixed-capacity list of up to nine neighbour cell ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborIds {
    ids: [usize; 9],
    len: usize,
}

impl NeighborIds {
    #[inline]
    fn push(&mut self, id: usize) {
        self.ids[self.len] = id;
        self.len += 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.ids[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'a> IntoIterator for &'a NeighborIds {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

/// Particle indices assigned to one cell during the current rebuild.
///
/// The indices are only meaningful until the next [`SpatialGrid::populate`].
#[derive(Debug, Clone, Default)]
pub struct Cell {
    members: Vec<u32>,
}

impl Cell {
    #[inline]
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Uniform grid mapping cell id to the indices of the particles inside it.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    layout: GridLayout,
    cells: Vec<Cell>,
}

impl SpatialGrid {
    pub fn new(
        world_width: f32,
        world_height: f32,
        rows: u32,
        cols: u32,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_layout(GridLayout::new(
            world_width,
            world_height,
            rows,
            cols,
        )?))
    }

    pub fn with_layout(layout: GridLayout) -> Self {
        Self {
            cells: vec![Cell::default(); layout.cell_count()],
            layout,
        }
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.layout.rows()
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.layout.cols()
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.layout.cell_count()
    }

    #[inline]
    pub fn cell_size(&self) -> Vec2 {
        self.layout.cell_size()
    }

    #[inline]
    pub fn cell_id(&self, x: f32, y: f32) -> usize {
        self.layout.cell_id(x, y)
    }

    #[inline]
    pub fn is_valid_cell(&self, id: i64) -> bool {
        self.layout.is_valid_cell(id)
    }

    #[inline]
    pub fn neighbors(&self, id: usize) -> NeighborIds {
        self.layout.neighbors(id)
    }

    pub fn cell(&self, id: usize) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Total number of indices stored across all cells.
    pub fn member_count(&self) -> usize {
        self.cells.iter().map(Cell::len).sum()
    }

    /// Empties every cell, keeping their allocations.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.members.clear();
        }
    }

    /// Rebuilds the grid from the current particle positions, appending each
    /// index (in insertion order) to the cell containing it.
    pub fn populate<S: ParticleStore + ?Sized>(&mut self, particles: &S) {
        self.clear();
        for index in 0..particles.len() {
            let position = particles.position_at(index);
            let id = self.layout.cell_id(position.x, position.y);
            self.cells[id].members.push(index as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::Particle;

    fn grid_10x10() -> SpatialGrid {
        SpatialGrid::new(100.0, 100.0, 10, 10).expect("valid grid")
    }

    #[test]
    fn cell_id_is_row_major() {
        let grid = grid_10x10();
        assert_eq!(grid.cell_id(0.0, 0.0), 0);
        assert_eq!(grid.cell_id(15.0, 0.0), 1);
        assert_eq!(grid.cell_id(0.0, 15.0), 10);
        assert_eq!(grid.cell_id(12.0, 64.0), 61);
    }

    #[test]
    fn far_edge_maps_to_last_cell() {
        let grid = grid_10x10();
        assert_eq!(grid.cell_id(100.0, 100.0), 99);
        assert_eq!(grid.cell_id(100.0, 0.0), 9);
        assert_eq!(grid.cell_id(1.0e9, 1.0e9), 99);
    }

    #[test]
    fn out_of_world_positions_are_clamped() {
        let grid = grid_10x10();
        assert_eq!(grid.cell_id(-5.0, -0.1), 0);
        assert_eq!(grid.cell_id(f32::NAN, 55.0), 50);
        assert_eq!(grid.cell_id(f32::NEG_INFINITY, f32::INFINITY), 90);
    }

    #[test]
    fn validity_rejects_negative_and_overflowing_ids() {
        let grid = grid_10x10();
        assert!(grid.is_valid_cell(0));
        assert!(grid.is_valid_cell(99));
        assert!(!grid.is_valid_cell(-1));
        assert!(!grid.is_valid_cell(100));
    }

    #[test]
    fn neighbor_counts_depend_on_position() {
        let grid = grid_10x10();
        assert_eq!(grid.neighbors(0).len(), 4);
        assert_eq!(grid.neighbors(5).len(), 6);
        assert_eq!(grid.neighbors(55).len(), 9);
        assert_eq!(grid.neighbors(99).len(), 4);
        assert_eq!(grid.neighbors(100).len(), 0);
        assert_eq!(grid.neighbors(55).as_slice()[0], 55);
    }

    #[test]
    fn right_edge_does_not_wrap_to_next_row() {
        let grid = grid_10x10();
        let ids = grid.neighbors(19);
        assert!(!ids.as_slice().contains(&20));
        assert!(!ids.as_slice().contains(&10));
        assert!(ids.as_slice().contains(&8));
        assert!(ids.as_slice().contains(&29));
    }

    #[test]
    fn rejects_invalid_layouts() {
        assert!(matches!(
            SpatialGrid::new(100.0, 100.0, 0, 10),
            Err(ConfigError::EmptyGrid { .. })
        ));
        assert!(matches!(
            SpatialGrid::new(0.0, 100.0, 10, 10),
            Err(ConfigError::InvalidWorldSize { .. })
        ));
        assert!(matches!(
            SpatialGrid::new(100.5, 100.0, 10, 10),
            Err(ConfigError::InvalidWorldSize { .. })
        ));
        assert!(matches!(
            SpatialGrid::new(100.0, 100.0, 10, 7),
            Err(ConfigError::NonDividingGrid { .. })
        ));
    }

    #[test]
    fn populate_is_a_full_rebuild() {
        let mut grid = grid_10x10();
        let mut particles = vec![Particle::new(Vec2::new(5.0, 5.0), 1.0)];
        grid.populate(&particles);
        assert_eq!(grid.cell(0).map(Cell::len), Some(1));

        particles[0].position = Vec2::new(95.0, 95.0);
        grid.populate(&particles);
        assert_eq!(grid.cell(0).map(Cell::len), Some(0));
        assert_eq!(grid.cell(99).map(Cell::members), Some(&[0u32][..]));
        assert_eq!(grid.member_count(), 1);
    }
}
