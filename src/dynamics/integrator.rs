//! Damped Verlet integration under gravity, clamped to the world bounds.
//! Runs per particle (optionally through rayon) or four lanes at a time over
//! [`ParticleSoa`] columns.

use glam::{Vec2, Vec4};

use crate::{
    config::SimulationConfig,
    core::{particle::Particle, soa::ParticleSoa},
};

/// Applies gravity, the damped Verlet update, and the world boundary clamp.
///
/// Each particle only touches its own state, so the scalar path can run in
/// parallel without coordination.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub gravity: Vec2,
    pub damping: f32,
    min_bound: Vec2,
    max_bound: Vec2,
    parallel: bool,
}

impl Integrator {
    /// `margin` is kept between particle centres and the world edges.
    pub fn new(gravity: Vec2, damping: f32, world_size: Vec2, margin: f32) -> Self {
        Self {
            gravity,
            damping,
            min_bound: Vec2::splat(margin),
            max_bound: world_size - Vec2::splat(margin),
            parallel: false,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut integrator = Self::new(
            config.gravity,
            config.damping,
            config.world_size,
            config.margin,
        );
        integrator.set_parallel(config.parallel);
        integrator
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    #[inline]
    pub fn integrate_particle(&self, particle: &mut Particle, dt: f32) {
        particle.accelerate(self.gravity);
        particle.verlet_step(dt, self.damping);
        particle.clamp_position(self.min_bound, self.max_bound);
    }

    /// Advances every particle by `dt`.
    pub fn step(&self, particles: &mut [Particle], dt: f32) {
        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;
            particles
                .par_iter_mut()
                .for_each(|particle| self.integrate_particle(particle, dt));
            return;
        }

        for particle in particles.iter_mut() {
            self.integrate_particle(particle, dt);
        }
    }

    /// Advances a SoA collection by `dt`, four lanes at a time.
    ///
    /// Lane arithmetic follows [`Particle::verlet_step`] operation for
    /// operation, so both layouts produce the same positions.
    pub fn step_soa(&self, particles: &mut ParticleSoa, dt: f32) {
        let len = particles.xs.len();
        let vector_len = len - len % 4;
        let dt_sq = dt * dt;

        let axis = |cur: &mut [f32],
                    prev: &mut [f32],
                    accel: &mut [f32],
                    g: f32,
                    lo: f32,
                    hi: f32| {
            let g4 = Vec4::splat(g);
            let damping = Vec4::splat(self.damping);
            let dt_sq4 = Vec4::splat(dt_sq);
            let (lo4, hi4) = (Vec4::splat(lo), Vec4::splat(hi));

            for offset in (0..vector_len).step_by(4) {
                let lanes = offset..offset + 4;
                let c = Vec4::from_slice(&cur[lanes.clone()]);
                let p = Vec4::from_slice(&prev[lanes.clone()]);
                let a = Vec4::from_slice(&accel[lanes.clone()]) + g4;

                let d = c - p;
                let next = c + d + (a - d * damping) * dt_sq4;

                c.write_to_slice(&mut prev[lanes.clone()]);
                next.max(lo4).min(hi4).write_to_slice(&mut cur[lanes.clone()]);
                Vec4::ZERO.write_to_slice(&mut accel[lanes]);
            }

            for i in vector_len..cur.len() {
                let a = accel[i] + g;
                let d = cur[i] - prev[i];
                let next = cur[i] + d + (a - d * self.damping) * dt_sq;
                prev[i] = cur[i];
                cur[i] = next.max(lo).min(hi);
                accel[i] = 0.0;
            }
        };

        axis(
            particles.xs.as_mut_slice(),
            particles.prev_xs.as_mut_slice(),
            particles.accel_xs.as_mut_slice(),
            self.gravity.x,
            self.min_bound.x,
            self.max_bound.x,
        );
        axis(
            particles.ys.as_mut_slice(),
            particles.prev_ys.as_mut_slice(),
            particles.accel_ys.as_mut_slice(),
            self.gravity.y,
            self.min_bound.y,
            self.max_bound.y,
        );
    }
}
