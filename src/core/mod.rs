//! Particle state and the two storage layouts it lives in.

pub mod particle;
pub mod soa;
pub mod store;

pub use particle::Particle;
pub use soa::ParticleSoa;
pub use store::{ParticleIter, ParticleStore};
