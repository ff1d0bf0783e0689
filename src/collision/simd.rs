//! Vectorized penetration resolver.
//!
//! One "home" particle is broadcast into 4-wide registers and tested against
//! four neighbour lanes at a time. Overlapping lanes are selected with a mask
//! `dist² < (r_home + r_other)² && dist² > ε && id != home && lane in use`,
//! corrected in place, and their reaction on the home particle is summed and
//! applied once after the whole 3x3 block has been scanned.
//!
//! Numerics: compares, selects and reciprocals run 4-wide on `Vec4`. Square
//! roots are taken lane by lane with scalar `f32::sqrt` (see `sqrt4`), since
//! `glam` has no 4-wide square root. Both are exact IEEE results; no
//! approximate `rsqrt` is used. The result differs from
//! [`super::resolver::CollisionResolver`] only through evaluation order: the
//! home correction is deferred to the end of its scan, and reciprocals are
//! multiplied instead of divided (at most 1 ulp per operation). For isolated
//! pairs both paths agree to within `1e-5` world units.

use glam::{BVec4A, Vec2, Vec4};

use crate::config::{PairMode, SimulationConfig};

use super::soa_grid::{SoaCell, SoaGrid, LANES};

/// Structure-of-Arrays SIMD vector holding 4 2D vectors.
///
/// x: [v0.x, v1.x, v2.x, v3.x]
/// y: [v0.y, v1.y, v2.y, v3.y]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2x4 {
    pub x: Vec4,
    pub y: Vec4,
}

impl Vec2x4 {
    pub const ZERO: Self = Self {
        x: Vec4::ZERO,
        y: Vec4::ZERO,
    };

    #[inline]
    pub fn splat(v: Vec2) -> Self {
        Self {
            x: Vec4::splat(v.x),
            y: Vec4::splat(v.y),
        }
    }

    /// Loads lanes `offset..offset + 4` of two coordinate slices.
    #[inline]
    pub fn load(xs: &[f32], ys: &[f32], offset: usize) -> Self {
        Self {
            x: Vec4::from_slice(&xs[offset..offset + LANES]),
            y: Vec4::from_slice(&ys[offset..offset + LANES]),
        }
    }

    #[inline]
    pub fn store(self, xs: &mut [f32], ys: &mut [f32], offset: usize) {
        self.x.write_to_slice(&mut xs[offset..offset + LANES]);
        self.y.write_to_slice(&mut ys[offset..offset + LANES]);
    }

    #[inline]
    pub fn length_squared(self) -> Vec4 {
        self.x * self.x + self.y * self.y
    }

    /// Per-lane scale.
    #[inline]
    pub fn scale(self, s: Vec4) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    /// Horizontal sum of the four lanes.
    #[inline]
    pub fn sum(self) -> Vec2 {
        Vec2::new(self.x.element_sum(), self.y.element_sum())
    }
}

impl std::ops::Sub for Vec2x4 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Add for Vec2x4 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Lane-wise exact square root.
#[inline]
fn sqrt4(v: Vec4) -> Vec4 {
    Vec4::from_array(v.to_array().map(f32::sqrt))
}

/// Mask of lanes whose id differs from `home`.
#[inline]
fn id_mask(ids: &[u32], offset: usize, home: u32) -> BVec4A {
    BVec4A::new(
        ids[offset] != home,
        ids[offset + 1] != home,
        ids[offset + 2] != home,
        ids[offset + 3] != home,
    )
}

/// Mask of lanes strictly after `slot` (same-cell deduplication).
#[inline]
fn after_slot_mask(offset: usize, slot: usize) -> BVec4A {
    BVec4A::new(offset > slot, offset + 1 > slot, offset + 2 > slot, offset + 3 > slot)
}

/// Home particle broadcast into registers.
#[derive(Debug, Clone, Copy)]
struct Home {
    position: Vec2x4,
    radius: Vec4,
    id: u32,
    slot: usize,
}

/// Vectorized resolver over [`SoaGrid`] cells.
#[derive(Debug, Clone, Copy)]
pub struct SimdResolver {
    pub response_coef: f32,
    pub epsilon: f32,
    pub pair_mode: PairMode,
}

impl SimdResolver {
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

    /// Resolves every member of every cell against its 3x3 neighbourhood.
    /// Returns the number of corrected (home, other) pairs.
    pub fn resolve_all(&self, grid: &mut SoaGrid) -> usize {
        let layout = *grid.layout();
        let cells = grid.cells_mut();
        let mut contacts = 0;
        for cell_id in 0..cells.len() {
            for slot in 0..cells[cell_id].len() {
                contacts += self.resolve_home(cells, &layout, cell_id, slot);
            }
        }
        contacts
    }

    /// Resolves the member at `slot` of `cell_id` against its neighbourhood.
    pub fn resolve_home(
        &self,
        cells: &mut [SoaCell],
        layout: &super::grid::GridLayout,
        cell_id: usize,
        slot: usize,
    ) -> usize {
        let home = {
            let cell = &cells[cell_id];
            Home {
                position: Vec2x4::splat(Vec2::new(cell.xs[slot], cell.ys[slot])),
                radius: Vec4::splat(cell.radii[slot]),
                id: cell.ids[slot],
                slot,
            }
        };

        let dedup = self.pair_mode == PairMode::Deduplicated;
        let mut home_delta = Vec2::ZERO;
        let mut contacts = 0;

        for &other_id in &layout.neighbors(cell_id) {
            if dedup && other_id < cell_id {
                continue;
            }
            let same_cell = other_id == cell_id;
            let (delta, hits) =
                self.resolve_against_cell(&home, &mut cells[other_id], dedup && same_cell);
            home_delta += delta;
            contacts += hits;
        }

        let cell = &mut cells[cell_id];
        cell.xs[slot] += home_delta.x;
        cell.ys[slot] += home_delta.y;
        contacts
    }

    /// Tests `home` against every lane chunk of `other`, correcting the other
    /// lanes in place. Returns the summed home correction and the hit count.
    fn resolve_against_cell(
        &self,
        home: &Home,
        other: &mut SoaCell,
        only_after_home: bool,
    ) -> (Vec2, usize) {
        let eps = Vec4::splat(self.epsilon);
        let response = Vec4::splat(self.response_coef);
        let mut home_delta = Vec2x4::ZERO;
        let mut contacts = 0;

        for offset in (0..other.padded_len()).step_by(LANES) {
            let position = Vec2x4::load(&other.xs, &other.ys, offset);
            let radius = Vec4::from_slice(&other.radii[offset..offset + LANES]);

            let offset_vec = home.position - position;
            let dist_sq = offset_vec.length_squared();
            let combined = home.radius + radius;

            let mut mask = dist_sq.cmplt(combined * combined)
                & dist_sq.cmpgt(eps)
                & id_mask(&other.ids, offset, home.id)
                & other.lane_mask(offset);
            if only_after_home {
                mask = mask & after_slot_mask(offset, home.slot);
            }
            if !mask.any() {
                continue;
            }

            // Masked-out lanes may hold zero distances; keep them finite.
            let dist = sqrt4(Vec4::select(mask, dist_sq, Vec4::ONE));
            let combined = Vec4::select(mask, combined, Vec4::ONE);
            let inv_combined = combined.recip();
            let delta = response * (combined - dist) * inv_combined;
            let dir = offset_vec.scale(dist.recip());

            let home_scale = Vec4::select(mask, delta * radius * inv_combined, Vec4::ZERO);
            let other_scale = Vec4::select(mask, delta * home.radius * inv_combined, Vec4::ZERO);

            home_delta = home_delta + dir.scale(home_scale);
            (position - dir.scale(other_scale)).store(&mut other.xs, &mut other.ys, offset);
            contacts += mask.bitmask().count_ones() as usize;
        }

        (home_delta.sum(), contacts)
    }
}
