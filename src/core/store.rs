//! Layout-independent access to a particle collection.
//!
//! Particles live either as an array of structures (`Vec<Particle>`) for the
//! scalar backend or as a structure of arrays ([`super::soa::ParticleSoa`])
//! for the vectorized backend. Grid population and the world's read-only
//! views are written against [`ParticleStore`] so they work on both.

use glam::Vec2;

use super::particle::Particle;

/// Dense, index-addressed particle collection.
///
/// Indices are assigned in insertion order and stay stable until a
/// [`ParticleStore::swap_remove`], which moves the last particle into the
/// removed slot.
pub trait ParticleStore {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a particle and returns its index.
    fn push(&mut self, particle: Particle) -> usize;

    /// Copy of the particle at `index`.
    fn get(&self, index: usize) -> Option<Particle>;

    /// Position of the particle at `index`. Panics when out of range.
    fn position_at(&self, index: usize) -> Vec2;

    /// Radius of the particle at `index`. Panics when out of range.
    fn radius_at(&self, index: usize) -> f32;

    /// Removes the particle at `index`, filling the hole with the last one.
    fn swap_remove(&mut self, index: usize) -> Option<Particle>;

    fn iter(&self) -> ParticleIter<'_, Self>
    where
        Self: Sized,
    {
        ParticleIter::new(self)
    }

    fn positions(&self) -> Vec<Vec2> {
        (0..self.len()).map(|i| self.position_at(i)).collect()
    }

    fn radii(&self) -> Vec<f32> {
        (0..self.len()).map(|i| self.radius_at(i)).collect()
    }
}

/// Ordered iterator over copies of the particles in a store.
pub struct ParticleIter<'a, S: ParticleStore + ?Sized> {
    store: &'a S,
    next: usize,
}

impl<'a, S: ParticleStore + ?Sized> ParticleIter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, next: 0 }
    }
}

impl<S: ParticleStore + ?Sized> Iterator for ParticleIter<'_, S> {
    type Item = Particle;

    fn next(&mut self) -> Option<Self::Item> {
        let particle = self.store.get(self.next)?;
        self.next += 1;
        Some(particle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.store.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<S: ParticleStore + ?Sized> ExactSizeIterator for ParticleIter<'_, S> {}

impl ParticleStore for Vec<Particle> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn push(&mut self, particle: Particle) -> usize {
        Vec::push(self, particle);
        self.as_slice().len() - 1
    }

    fn get(&self, index: usize) -> Option<Particle> {
        self.as_slice().get(index).copied()
    }

    #[inline]
    fn position_at(&self, index: usize) -> Vec2 {
        self[index].position
    }

    #[inline]
    fn radius_at(&self, index: usize) -> f32 {
        self[index].radius
    }

    fn swap_remove(&mut self, index: usize) -> Option<Particle> {
        if index >= self.as_slice().len() {
            return None;
        }
        Some(Vec::swap_remove(self, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_store_swap_remove_moves_last_particle() {
        let mut store: Vec<Particle> = Vec::new();
        for i in 0..3 {
            ParticleStore::push(&mut store, Particle::new(Vec2::splat(i as f32), 1.0));
        }

        let removed = ParticleStore::swap_remove(&mut store, 0).expect("index 0 exists");
        assert_eq!(removed.position, Vec2::ZERO);
        assert_eq!(ParticleStore::len(&store), 2);
        assert_eq!(store.position_at(0), Vec2::splat(2.0));
        assert!(ParticleStore::swap_remove(&mut store, 5).is_none());
    }

    #[test]
    fn iter_yields_insertion_order() {
        let mut store: Vec<Particle> = Vec::new();
        for i in 0..4 {
            ParticleStore::push(&mut store, Particle::new(Vec2::new(i as f32, 0.0), 1.0));
        }
        let xs: Vec<f32> = ParticleStore::iter(&store).map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
