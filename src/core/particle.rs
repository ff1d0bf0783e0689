use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A circular particle integrated with position Verlet.
///
/// Velocity is never stored. It is implied by `position - previous_position`
/// over the last step length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: Vec2,
    pub previous_position: Vec2,
    /// Accumulated acceleration, cleared after every integration.
    pub acceleration: Vec2,
    pub mass: f32,
    pub radius: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            previous_position: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            mass: 1.0,
            radius: 1.0,
        }
    }
}

impl Particle {
    /// Creates a particle at rest.
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            previous_position: position,
            radius,
            ..Self::default()
        }
    }

    /// Sets the per-step displacement the particle starts with.
    pub fn with_displacement(mut self, displacement: Vec2) -> Self {
        self.previous_position = self.position - displacement;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    #[inline]
    pub fn displacement(&self) -> Vec2 {
        self.position - self.previous_position
    }

    /// Velocity implied by the last step of length `dt`.
    pub fn velocity(&self, dt: f32) -> Vec2 {
        if dt <= 0.0 {
            return Vec2::ZERO;
        }
        self.displacement() / dt
    }

    #[inline]
    pub fn accelerate(&mut self, acceleration: Vec2) {
        self.acceleration += acceleration;
    }

    /// Damped Verlet update. Consumes the accumulated acceleration.
    #[inline]
    pub fn verlet_step(&mut self, dt: f32, damping: f32) {
        let displacement = self.displacement();
        let next =
            self.position + displacement + (self.acceleration - displacement * damping) * (dt * dt);
        self.previous_position = self.position;
        self.position = next;
        self.acceleration = Vec2::ZERO;
    }

    /// Hard clamp of the position into `[min, max]` per axis. The previous
    /// position is left alone, so a clamped particle loses the clipped motion
    /// on its next step instead of bouncing.
    #[inline]
    pub fn clamp_position(&mut self, min: Vec2, max: Vec2) {
        self.position = self.position.clamp(min, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_particle_is_at_rest() {
        let particle = Particle::new(Vec2::new(3.0, 4.0), 1.5);
        assert_eq!(particle.displacement(), Vec2::ZERO);
        assert_eq!(particle.velocity(0.1), Vec2::ZERO);
    }

    #[test]
    fn verlet_step_matches_closed_form() {
        let mut particle = Particle::new(Vec2::splat(2.0), 1.0).with_displacement(Vec2::splat(2.0));
        particle.accelerate(Vec2::new(0.0, 98.1));
        particle.verlet_step(0.1, 40.0);

        assert!((particle.position.x - 3.2).abs() < 1e-4);
        assert!((particle.position.y - 4.181).abs() < 1e-4);
        assert_eq!(particle.previous_position, Vec2::splat(2.0));
        assert_eq!(particle.acceleration, Vec2::ZERO);
    }

    #[test]
    fn clamp_keeps_previous_position() {
        let mut particle = Particle::new(Vec2::new(120.0, -3.0), 1.0);
        particle.clamp_position(Vec2::splat(4.0), Vec2::splat(96.0));
        assert_eq!(particle.position, Vec2::new(96.0, 4.0));
        assert_eq!(particle.previous_position, Vec2::new(120.0, -3.0));
    }
}
