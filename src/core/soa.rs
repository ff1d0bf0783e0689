use glam::Vec2;

use super::{particle::Particle, store::ParticleStore};

/// Structure-of-Arrays storage for particles.
/// Replaces `Vec<Particle>` on the vectorized path so every attribute can be
/// loaded four lanes at a time.
///
/// All vectors always have the same length; index `i` across them is one particle.
#[derive(Debug, Clone, Default)]
pub struct ParticleSoa {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub prev_xs: Vec<f32>,
    pub prev_ys: Vec<f32>,
    pub accel_xs: Vec<f32>,
    pub accel_ys: Vec<f32>,
    pub masses: Vec<f32>,
    pub radii: Vec<f32>,
}

impl ParticleSoa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
            prev_xs: Vec::with_capacity(capacity),
            prev_ys: Vec::with_capacity(capacity),
            accel_xs: Vec::with_capacity(capacity),
            accel_ys: Vec::with_capacity(capacity),
            masses: Vec::with_capacity(capacity),
            radii: Vec::with_capacity(capacity),
        }
    }
}

impl ParticleStore for ParticleSoa {
    fn len(&self) -> usize {
        self.xs.len()
    }

    fn push(&mut self, particle: Particle) -> usize {
        let index = self.xs.len();
        self.xs.push(particle.position.x);
        self.ys.push(particle.position.y);
        self.prev_xs.push(particle.previous_position.x);
        self.prev_ys.push(particle.previous_position.y);
        self.accel_xs.push(particle.acceleration.x);
        self.accel_ys.push(particle.acceleration.y);
        self.masses.push(particle.mass);
        self.radii.push(particle.radius);
        index
    }

    fn get(&self, index: usize) -> Option<Particle> {
        if index >= self.xs.len() {
            return None;
        }
        Some(Particle {
            position: Vec2::new(self.xs[index], self.ys[index]),
            previous_position: Vec2::new(self.prev_xs[index], self.prev_ys[index]),
            acceleration: Vec2::new(self.accel_xs[index], self.accel_ys[index]),
            mass: self.masses[index],
            radius: self.radii[index],
        })
    }

    #[inline]
    fn position_at(&self, index: usize) -> Vec2 {
        Vec2::new(self.xs[index], self.ys[index])
    }

    #[inline]
    fn radius_at(&self, index: usize) -> f32 {
        self.radii[index]
    }

    fn swap_remove(&mut self, index: usize) -> Option<Particle> {
        let removed = self.get(index)?;
        self.xs.swap_remove(index);
        self.ys.swap_remove(index);
        self.prev_xs.swap_remove(index);
        self.prev_ys.swap_remove(index);
        self.accel_xs.swap_remove(index);
        self.accel_ys.swap_remove(index);
        self.masses.swap_remove(index);
        self.radii.swap_remove(index);
        Some(removed)
    }

    fn positions(&self) -> Vec<Vec2> {
        self.xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| Vec2::new(x, y))
            .collect()
    }

    fn radii(&self) -> Vec<f32> {
        self.radii.clone()
    }
}
