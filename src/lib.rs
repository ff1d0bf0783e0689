//! Particle Collider – uniform-grid collision core for 2D particle simulations.
//!
//! Particles are circles advanced with damped Verlet integration. Each
//! sub-step rebuilds a uniform spatial grid, pushes overlapping neighbours
//! apart, and integrates. Resolution runs either on a worker pool over
//! conflict-free cell ranges or through a 4-lane vectorized path over
//! structure-of-arrays storage.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use collision::{
    grid::{GridLayout, SpatialGrid},
    partition::{PartitionPlan, Phase},
    resolver::CollisionResolver,
    simd::SimdResolver,
    soa_grid::SoaGrid,
};
pub use config::{PairMode, ResolverKind, SimulationConfig};
pub use core::{particle::Particle, soa::ParticleSoa, store::ParticleStore};
pub use dynamics::integrator::Integrator;
pub use error::ConfigError;
pub use utils::{
    pool::{PoolStats, WorkerPool},
    profiling::StepProfiler,
};
pub use world::ParticleWorld;
