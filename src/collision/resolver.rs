//! Scalar penetration resolver over array-of-structures storage.
//!
//! Every occupied cell tests its members against the members of its 3x3
//! neighbourhood. Overlapping pairs are pushed apart along the line between
//! their centres, each side moving in proportion to the other's radius.
//! Corrections are applied immediately, so results depend on scan order.

use std::{marker::PhantomData, ops::Range};

use glam::Vec2;

use crate::{
    config::{PairMode, SimulationConfig},
    core::particle::Particle,
};

use super::grid::SpatialGrid;

/// Position corrections for one overlapping pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCorrection {
    pub a: Vec2,
    pub b: Vec2,
}

/// Computes the corrections that separate `a` and `b`, or `None` when they do
/// not overlap or their centres are closer than `sqrt(epsilon)`.
///
/// `a` moves by `dir * delta * rb / (ra + rb)` and `b` by the opposite
/// direction scaled with `ra / (ra + rb)`, where `dir` points from `b` to `a`.
#[inline]
pub fn pair_correction(
    pos_a: Vec2,
    radius_a: f32,
    pos_b: Vec2,
    radius_b: f32,
    response_coef: f32,
    epsilon: f32,
) -> Option<PairCorrection> {
    let combined = radius_a + radius_b;
    let offset = pos_a - pos_b;
    let dist_sq = offset.length_squared();
    if dist_sq >= combined * combined || dist_sq <= epsilon {
        return None;
    }

    let dist = dist_sq.sqrt();
    let delta = response_coef * (combined - dist) / combined;
    let dir = offset / dist;
    Some(PairCorrection {
        a: dir * (delta * (radius_b / combined)),
        b: -dir * (delta * (radius_a / combined)),
    })
}

/// Raw view of the particle slice shared by resolver tasks.
///
/// Handing this to several threads is only sound when no two of them touch
/// the same particle, which the caller guarantees through
/// [`super::partition::PartitionPlan`].
#[derive(Clone, Copy)]
pub struct SharedParticles<'a> {
    ptr: *mut Particle,
    len: usize,
    _marker: PhantomData<&'a mut [Particle]>,
}

// SAFETY: access is restricted to disjoint particle sets per thread by the
// partition plan; see `CollisionResolver::resolve_range_shared`.
unsafe impl Send for SharedParticles<'_> {}
unsafe impl Sync for SharedParticles<'_> {}

impl<'a> SharedParticles<'a> {
    pub fn new(particles: &'a mut [Particle]) -> Self {
        Self {
            ptr: particles.as_mut_ptr(),
            len: particles.len(),
            _marker: PhantomData,
        }
    }

    /// Panics when either index is out of range, which happens when the grid
    /// was populated from a different collection.
    ///
    /// # Safety
    /// `a != b` and no other live reference to either particle.
    #[inline]
    unsafe fn pair_mut(&self, a: usize, b: usize) -> (&mut Particle, &mut Particle) {
        assert!(a < self.len && b < self.len, "grid is stale for this particle slice");
        debug_assert!(a != b);
        (&mut *self.ptr.add(a), &mut *self.ptr.add(b))
    }
}

/// Cell-by-cell penetration resolver for `Vec<Particle>` storage.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    pub response_coef: f32,
    pub epsilon: f32,
    pub pair_mode: PairMode,
}

impl CollisionResolver {
    pub fn new(response_coef: f32, epsilon: f32, pair_mode: PairMode) -> Self {
        Self {
            response_coef,
            epsilon,
            pair_mode,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.response_coef, config.epsilon, config.pair_mode)
    }

    /// Separates two particles in place. Returns whether they overlapped.
    #[inline]
    pub fn resolve_pair(&self, a: &mut Particle, b: &mut Particle) -> bool {
        match pair_correction(
            a.position,
            a.radius,
            b.position,
            b.radius,
            self.response_coef,
            self.epsilon,
        ) {
            Some(correction) => {
                a.position += correction.a;
                b.position += correction.b;
                true
            }
            None => false,
        }
    }

    /// Resolves every cell in `cells` against its neighbourhood.
    /// Returns the number of corrected pairs.
    pub fn resolve_range(
        &self,
        grid: &SpatialGrid,
        particles: &mut [Particle],
        cells: Range<usize>,
    ) -> usize {
        let shared = SharedParticles::new(particles);
        // SAFETY: `particles` is exclusively borrowed for this call and the
        // range is processed on the current thread only.
        unsafe { self.resolve_range_shared(grid, shared, cells) }
    }

    /// Resolves the whole grid on the calling thread.
    pub fn resolve_all(&self, grid: &SpatialGrid, particles: &mut [Particle]) -> usize {
        self.resolve_range(grid, particles, 0..grid.cell_count())
    }

    /// Resolves `cells` through a shared view.
    ///
    /// # Safety
    /// While this runs, no other thread may read or write any particle whose
    /// cell lies within one row and one column of a cell in `cells`. The grid
    /// must have been populated from the same particles.
    pub unsafe fn resolve_range_shared(
        &self,
        grid: &SpatialGrid,
        particles: SharedParticles<'_>,
        cells: Range<usize>,
    ) -> usize {
        let end = cells.end.min(grid.cell_count());
        let mut contacts = 0;
        for cell_id in cells.start..end {
            if grid.cells()[cell_id].is_empty() {
                continue;
            }
            for &other_id in &grid.neighbors(cell_id) {
                contacts += self.resolve_cell_pair(grid, particles, cell_id, other_id);
            }
        }
        contacts
    }

    /// # Safety
    /// Same contract as [`Self::resolve_range_shared`].
    unsafe fn resolve_cell_pair(
        &self,
        grid: &SpatialGrid,
        particles: SharedParticles<'_>,
        cell_id: usize,
        other_id: usize,
    ) -> usize {
        let dedup = self.pair_mode == PairMode::Deduplicated;
        if dedup && other_id < cell_id {
            return 0;
        }

        let home = grid.cells()[cell_id].members();
        let other = grid.cells()[other_id].members();
        let same_cell = cell_id == other_id;
        let mut contacts = 0;

        for (slot, &a) in home.iter().enumerate() {
            let others = if dedup && same_cell {
                &other[slot + 1..]
            } else {
                other
            };
            for &b in others {
                if a == b {
                    continue;
                }
                let (pa, pb) = particles.pair_mut(a as usize, b as usize);
                if self.resolve_pair(pa, pb) {
                    contacts += 1;
                }
            }
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_EPSILON, DEFAULT_RESPONSE_COEF};

    fn resolver(pair_mode: PairMode) -> CollisionResolver {
        CollisionResolver::new(DEFAULT_RESPONSE_COEF, DEFAULT_EPSILON, pair_mode)
    }

    #[test]
    fn separated_pair_has_no_correction() {
        assert!(pair_correction(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0, 4.0, 0.001).is_none());
        assert!(pair_correction(Vec2::ZERO, 1.0, Vec2::new(5.0, 0.0), 1.0, 4.0, 0.001).is_none());
    }

    #[test]
    fn coincident_centres_are_skipped() {
        assert!(pair_correction(Vec2::ONE, 1.0, Vec2::ONE, 1.0, 4.0, 0.001).is_none());
    }

    #[test]
    fn correction_is_weighted_by_opposite_radius() {
        let c = pair_correction(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 3.0, 1.0, 0.001)
            .expect("overlapping");
        // delta = (4 - 2) / 4 = 0.5; a moves 0.5 * 3/4, b moves 0.5 * 1/4.
        assert!((c.a.x + 0.375).abs() < 1e-6);
        assert!((c.b.x - 0.125).abs() < 1e-6);
        assert_eq!(c.a.y, 0.0);
        assert_eq!(c.b.y, 0.0);
    }

    #[test]
    fn resolve_range_skips_self_pairs() {
        let grid_particles = vec![Particle::new(Vec2::new(50.0, 50.0), 1.5)];
        let mut grid = SpatialGrid::new(100.0, 100.0, 10, 10).expect("valid grid");
        grid.populate(&grid_particles);

        let mut particles = grid_particles.clone();
        let contacts = resolver(PairMode::Symmetric).resolve_all(&grid, &mut particles);
        assert_eq!(contacts, 0);
        assert_eq!(particles, grid_particles);
    }

    #[test]
    fn symmetric_mode_visits_cross_cell_pairs_from_both_cells() {
        let mut particles = vec![
            Particle::new(Vec2::new(19.9, 50.0), 1.0),
            Particle::new(Vec2::new(20.1, 50.0), 1.0),
        ];
        let mut grid = SpatialGrid::new(100.0, 100.0, 10, 10).expect("valid grid");
        grid.populate(&particles);

        let weak = CollisionResolver::new(0.1, DEFAULT_EPSILON, PairMode::Symmetric);
        assert_eq!(weak.resolve_all(&grid, &mut particles), 2);

        let mut particles = vec![
            Particle::new(Vec2::new(19.9, 50.0), 1.0),
            Particle::new(Vec2::new(20.1, 50.0), 1.0),
        ];
        let weak = CollisionResolver::new(0.1, DEFAULT_EPSILON, PairMode::Deduplicated);
        assert_eq!(weak.resolve_all(&grid, &mut particles), 1);
    }
}
