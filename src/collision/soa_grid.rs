//! Grid whose cells carry their members as padded structure-of-arrays lanes.
//!
//! Populating copies each particle's position, radius and id into its cell.
//! The vectorized resolver then works on those contiguous buffers in place,
//! and [`SoaGrid::scatter`] writes the corrected positions back.

use glam::BVec4A;

use crate::core::{soa::ParticleSoa, store::ParticleStore};

use super::grid::GridLayout;

/// Lane width of the vectorized path.
pub const LANES: usize = 4;

/// Id stored in padding lanes.
pub const PAD_ID: u32 = u32::MAX;

/// One cell's members as parallel arrays, padded to a multiple of [`LANES`].
#[derive(Debug, Clone, Default)]
pub struct SoaCell {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub radii: Vec<f32>,
    pub ids: Vec<u32>,
    len: usize,
}

impl SoaCell {
    /// Number of real members (padding excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the lane buffers, a multiple of [`LANES`].
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.xs.len()
    }

    /// Lanes of the chunk starting at `offset` that hold real members.
    #[inline]
    pub fn lane_mask(&self, offset: usize) -> BVec4A {
        BVec4A::new(
            offset < self.len,
            offset + 1 < self.len,
            offset + 2 < self.len,
            offset + 3 < self.len,
        )
    }

    fn clear(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.radii.clear();
        self.ids.clear();
        self.len = 0;
    }

    fn push(&mut self, x: f32, y: f32, radius: f32, id: u32) {
        self.xs.push(x);
        self.ys.push(y);
        self.radii.push(radius);
        self.ids.push(id);
        self.len += 1;
    }

    fn pad(&mut self) {
        let padded = self.len.next_multiple_of(LANES);
        self.xs.resize(padded, 0.0);
        self.ys.resize(padded, 0.0);
        self.radii.resize(padded, 0.0);
        self.ids.resize(padded, PAD_ID);
    }
}

/// Uniform grid holding SoA copies of its members.
#[derive(Debug, Clone)]
pub struct SoaGrid {
    layout: GridLayout,
    cells: Vec<SoaCell>,
}

impl SoaGrid {
    pub fn with_layout(layout: GridLayout) -> Self {
        Self {
            cells: vec![SoaCell::default(); layout.cell_count()],
            layout,
        }
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn cell(&self, id: usize) -> Option<&SoaCell> {
        self.cells.get(id)
    }

    pub fn cells(&self) -> &[SoaCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [SoaCell] {
        &mut self.cells
    }

    pub fn member_count(&self) -> usize {
        self.cells.iter().map(SoaCell::len).sum()
    }

    /// Empties every cell, keeping the lane buffers' capacity.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Rebuilds every cell from the current positions, in insertion order.
    pub fn populate(&mut self, particles: &ParticleSoa) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for index in 0..particles.len() {
            let (x, y) = (particles.xs[index], particles.ys[index]);
            let id = self.layout.cell_id(x, y);
            self.cells[id].push(x, y, particles.radii[index], index as u32);
        }
        for cell in &mut self.cells {
            cell.pad();
        }
    }

    /// Copies the (possibly corrected) cell positions back into `particles`.
    pub fn scatter(&self, particles: &mut ParticleSoa) {
        for cell in &self.cells {
            for lane in 0..cell.len {
                let index = cell.ids[lane] as usize;
                particles.xs[index] = cell.xs[lane];
                particles.ys[index] = cell.ys[lane];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::Particle;
    use glam::Vec2;

    fn soa_of(points: &[(f32, f32)]) -> ParticleSoa {
        let mut soa = ParticleSoa::new();
        for &(x, y) in points {
            soa.push(Particle::new(Vec2::new(x, y), 1.0));
        }
        soa
    }

    #[test]
    fn cells_are_padded_to_lane_width() {
        let layout = GridLayout::new(100.0, 100.0, 10, 10).expect("valid grid");
        let mut grid = SoaGrid::with_layout(layout);
        grid.populate(&soa_of(&[(5.0, 5.0), (6.0, 5.0), (7.0, 5.0), (8.0, 5.0), (9.0, 5.0)]));

        let cell = grid.cell(0).expect("cell 0");
        assert_eq!(cell.len(), 5);
        assert_eq!(cell.padded_len(), 8);
        assert_eq!(cell.ids[5..], [PAD_ID; 3]);
        assert_eq!(cell.lane_mask(4).bitmask(), 0b0001);
        assert_eq!(grid.cell(1).map(SoaCell::padded_len), Some(0));
    }

    #[test]
    fn scatter_writes_back_by_id() {
        let layout = GridLayout::new(100.0, 100.0, 10, 10).expect("valid grid");
        let mut grid = SoaGrid::with_layout(layout);
        let mut soa = soa_of(&[(5.0, 5.0), (55.0, 55.0)]);
        grid.populate(&soa);

        grid.cells_mut()[55].xs[0] = 56.0;
        grid.scatter(&mut soa);
        assert_eq!(soa.xs, vec![5.0, 56.0]);
    }
}
