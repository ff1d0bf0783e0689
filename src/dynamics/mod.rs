//! Simulation dynamics: gravity, damped Verlet integration, boundary clamping.

pub mod integrator;

pub use integrator::Integrator;
