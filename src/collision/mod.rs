//! Collision modules: uniform grid broad-phase, cell partitioning, and the
//! scalar and vectorized penetration resolvers.

pub mod grid;
pub mod partition;
pub mod resolver;
pub mod simd;
pub mod soa_grid;

pub use grid::{Cell, GridLayout, NeighborIds, SpatialGrid};
pub use partition::{PartitionPlan, Phase};
pub use resolver::{pair_correction, CollisionResolver, PairCorrection, SharedParticles};
pub use simd::{SimdResolver, Vec2x4};
pub use soa_grid::{SoaCell, SoaGrid};
