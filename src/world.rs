//! Simulation environment. [`ParticleWorld`] owns the particles together with
//! the grid and workers of its backend, and advances them in sub-steps.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use glam::Vec2;
use log::{debug, warn};

use crate::{
    collision::{
        grid::{GridLayout, SpatialGrid},
        partition::{PartitionPlan, Phase},
        resolver::{CollisionResolver, SharedParticles},
        simd::SimdResolver,
        soa_grid::SoaGrid,
    },
    config::{ResolverKind, SimulationConfig},
    core::{
        particle::Particle,
        soa::ParticleSoa,
        store::{ParticleIter, ParticleStore},
    },
    dynamics::integrator::Integrator,
    error::ConfigError,
    utils::{
        logging::{warn_if_frame_budget_exceeded, ScopedTimer},
        pool::{PoolStats, Task, WorkerPool},
        profiling::StepProfiler,
    },
};

/// Array-of-structures storage resolved on the worker pool.
struct ScalarBackend {
    particles: Vec<Particle>,
    grid: SpatialGrid,
    resolver: CollisionResolver,
    pool: Option<WorkerPool>,
    partition: PartitionPlan,
}

impl ScalarBackend {
    fn new(config: &SimulationConfig, layout: GridLayout) -> Self {
        Self {
            particles: Vec::new(),
            grid: SpatialGrid::with_layout(layout),
            resolver: CollisionResolver::from_config(config),
            pool: None,
            partition: PartitionPlan::new(layout.cell_count(), layout.cols() as usize, 1),
        }
    }

    fn start_pool(&mut self, threads: usize) -> Result<(), ConfigError> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = WorkerPool::new(threads)?;
        self.partition = PartitionPlan::new(
            self.grid.cell_count(),
            self.grid.cols() as usize,
            pool.thread_count(),
        );
        debug!(
            "cell ranges of {} over {} workers",
            self.partition.chunk_len(),
            pool.thread_count()
        );
        self.pool = Some(pool);
        Ok(())
    }

    fn resolve(&mut self, parallel: bool) -> usize {
        match &self.pool {
            Some(pool) if parallel => resolve_partitioned(
                pool,
                &self.partition,
                &self.grid,
                &self.resolver,
                &mut self.particles,
            ),
            _ => self.resolver.resolve_all(&self.grid, &mut self.particles),
        }
    }
}

/// Runs the even ranges of `plan`, waits, then the odd ranges, and waits again.
fn resolve_partitioned(
    pool: &WorkerPool,
    plan: &PartitionPlan,
    grid: &SpatialGrid,
    resolver: &CollisionResolver,
    particles: &mut [Particle],
) -> usize {
    debug_assert!(plan.is_race_free());
    let shared = SharedParticles::new(particles);
    let contacts = AtomicUsize::new(0);

    for phase in Phase::ALL {
        let tasks: Vec<Task<'_>> = plan
            .phase(phase)
            .map(|cells| {
                let contacts = &contacts;
                Box::new(move || {
                    // SAFETY: ranges of one phase have disjoint reaches, and
                    // `submit_and_wait` finishes them all before the next phase.
                    let hits = unsafe { resolver.resolve_range_shared(grid, shared, cells) };
                    contacts.fetch_add(hits, Ordering::Relaxed);
                }) as Task<'_>
            })
            .collect();
        pool.submit_and_wait(tasks);
    }

    contacts.into_inner()
}

/// Structure-of-arrays storage resolved with 4-lane vector tests.
struct SimdBackend {
    particles: ParticleSoa,
    grid: SoaGrid,
    resolver: SimdResolver,
}

enum Backend {
    Scalar(ScalarBackend),
    Simd(SimdBackend),
}

/// Owns the particles, the grid and the worker pool, and advances them.
///
/// One [`ParticleWorld::step`] runs `sub_steps` passes of
/// populate → resolve → integrate with `dt / sub_steps` each.
pub struct ParticleWorld {
    config: SimulationConfig,
    layout: GridLayout,
    backend: Backend,
    integrator: Integrator,
    parallel_enabled: bool,
    profiler: StepProfiler,
}

impl ParticleWorld {
    /// Validates `config` and builds the backend it selects.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = GridLayout::from_config(&config)?;

        let mut parallel_enabled = false;
        let backend = match config.resolver {
            ResolverKind::Scalar => {
                let mut backend = ScalarBackend::new(&config, layout);
                if config.parallel && cfg!(feature = "parallel") {
                    backend.start_pool(config.worker_threads)?;
                    parallel_enabled = true;
                }
                Backend::Scalar(backend)
            }
            ResolverKind::Simd => Backend::Simd(SimdBackend {
                particles: ParticleSoa::new(),
                grid: SoaGrid::with_layout(layout),
                resolver: SimdResolver::from_config(&config),
            }),
        };

        let mut integrator = Integrator::from_config(&config);
        integrator.set_parallel(parallel_enabled);

        debug!(
            "particle world {}x{}, grid {}x{}, {:?} backend, {} sub-steps",
            config.world_size.x,
            config.world_size.y,
            config.grid_rows,
            config.grid_cols,
            config.resolver,
            config.sub_steps
        );

        Ok(Self {
            config,
            layout,
            backend,
            integrator,
            parallel_enabled,
            profiler: StepProfiler::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn resolver_kind(&self) -> ResolverKind {
        match self.backend {
            Backend::Scalar(_) => ResolverKind::Scalar,
            Backend::Simd(_) => ResolverKind::Simd,
        }
    }

    pub fn grid_layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Turns worker-pool resolution and parallel integration on or off.
    /// Only the scalar backend runs in parallel; the pool is started on first use.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        let enabled = match &mut self.backend {
            Backend::Scalar(backend) if enabled && cfg!(feature = "parallel") => {
                match backend.start_pool(self.config.worker_threads) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!("staying sequential: {err}");
                        false
                    }
                }
            }
            _ => false,
        };
        self.parallel_enabled = enabled;
        self.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    fn store(&self) -> &dyn ParticleStore {
        match &self.backend {
            Backend::Scalar(backend) => &backend.particles,
            Backend::Simd(backend) => &backend.particles,
        }
    }

    /// Registers a particle and returns its index.
    ///
    /// Invalidates the current grid contents; the next resolution pass needs a
    /// fresh [`ParticleWorld::populate_grid`].
    pub fn add_particle(&mut self, particle: Particle) -> usize {
        debug_assert!(particle.radius > 0.0, "particle radius must be positive");
        self.invalidate_grid();
        match &mut self.backend {
            Backend::Scalar(backend) => ParticleStore::push(&mut backend.particles, particle),
            Backend::Simd(backend) => backend.particles.push(particle),
        }
    }

    /// Removes the particle at `index` by swap-remove: the last particle takes
    /// over `index`, every other index is unchanged. Callers holding the old
    /// index of the last particle must remap it.
    pub fn remove_particle(&mut self, index: usize) -> Option<Particle> {
        self.invalidate_grid();
        match &mut self.backend {
            Backend::Scalar(backend) => ParticleStore::swap_remove(&mut backend.particles, index),
            Backend::Simd(backend) => backend.particles.swap_remove(index),
        }
    }

    fn invalidate_grid(&mut self) {
        match &mut self.backend {
            Backend::Scalar(backend) => backend.grid.clear(),
            Backend::Simd(backend) => backend.grid.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn particle(&self, index: usize) -> Option<Particle> {
        self.store().get(index)
    }

    /// Particles in index order.
    pub fn particles(&self) -> ParticleIter<'_, dyn ParticleStore + '_> {
        ParticleIter::new(self.store())
    }

    /// Particle centres in index order, for rendering.
    pub fn positions(&self) -> Vec<Vec2> {
        self.store().positions()
    }

    /// Particle radii in index order, for rendering.
    pub fn radii(&self) -> Vec<f32> {
        self.store().radii()
    }

    pub fn spatial_grid(&self) -> Option<&SpatialGrid> {
        match &self.backend {
            Backend::Scalar(backend) => Some(&backend.grid),
            Backend::Simd(_) => None,
        }
    }

    pub fn soa_grid(&self) -> Option<&SoaGrid> {
        match &self.backend {
            Backend::Scalar(_) => None,
            Backend::Simd(backend) => Some(&backend.grid),
        }
    }

    /// Number of particles the last populate put in cell `id`.
    pub fn cell_population(&self, id: usize) -> Option<usize> {
        match &self.backend {
            Backend::Scalar(backend) => backend.grid.cell(id).map(|cell| cell.len()),
            Backend::Simd(backend) => backend.grid.cell(id).map(|cell| cell.len()),
        }
    }

    pub fn partition_plan(&self) -> Option<&PartitionPlan> {
        match &self.backend {
            Backend::Scalar(backend) if backend.pool.is_some() => Some(&backend.partition),
            _ => None,
        }
    }

    pub fn worker_count(&self) -> Option<usize> {
        match &self.backend {
            Backend::Scalar(backend) => backend.pool.as_ref().map(WorkerPool::thread_count),
            Backend::Simd(_) => None,
        }
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        match &self.backend {
            Backend::Scalar(backend) => backend.pool.as_ref().map(WorkerPool::stats),
            Backend::Simd(_) => None,
        }
    }

    /// Timings and counters of the most recent [`ParticleWorld::step`].
    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    /// Rebuilds the grid from the current positions.
    pub fn populate_grid(&mut self) {
        let _timer = ScopedTimer::accumulate("grid::populate", &mut self.profiler.populate_time);
        match &mut self.backend {
            Backend::Scalar(backend) => backend.grid.populate(&backend.particles),
            Backend::Simd(backend) => backend.grid.populate(&backend.particles),
        }
    }

    /// Runs one resolution pass over the current grid and returns the number
    /// of corrected pairs.
    pub fn resolve_collisions(&mut self) -> usize {
        let label = match (&self.backend, self.parallel_enabled) {
            (Backend::Scalar(_), true) => "resolve::partitioned",
            (Backend::Scalar(_), false) => "resolve::sequential",
            (Backend::Simd(_), _) => "resolve::simd",
        };
        let _timer = ScopedTimer::accumulate(label, &mut self.profiler.resolve_time);

        let contacts = match &mut self.backend {
            Backend::Scalar(backend) => backend.resolve(self.parallel_enabled),
            Backend::Simd(backend) => {
                let contacts = backend.resolver.resolve_all(&mut backend.grid);
                backend.grid.scatter(&mut backend.particles);
                contacts
            }
        };
        self.profiler.contact_count += contacts;
        contacts
    }

    /// Applies gravity, the Verlet update and the boundary clamp with step `dt`.
    ///
    /// Moving particles invalidates the grid: until the next
    /// [`ParticleWorld::populate_grid`], resolution is a no-op. The SoA grid
    /// holds position copies that would otherwise be scattered back over the
    /// integrated positions.
    pub fn integrate(&mut self, dt: f32) {
        self.invalidate_grid();
        let _timer = ScopedTimer::accumulate("integrate", &mut self.profiler.integrate_time);
        match &mut self.backend {
            Backend::Scalar(backend) => self.integrator.step(&mut backend.particles, dt),
            Backend::Simd(backend) => self.integrator.step_soa(&mut backend.particles, dt),
        }
    }

    /// Advances the simulation by `dt`, split into `sub_steps` passes.
    ///
    /// Non-finite or non-positive `dt` is ignored.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            warn!("ignoring step with dt = {dt}");
            return;
        }

        self.profiler.reset();
        let start = Instant::now();
        let sub_steps = self.config.sub_steps;
        let sub_dt = dt / sub_steps as f32;

        for _ in 0..sub_steps {
            self.populate_grid();
            self.resolve_collisions();
            self.integrate(sub_dt);
        }

        self.profiler.total_frame_time = start.elapsed();
        self.profiler.particle_count = self.len();
        self.profiler.sub_steps = sub_steps;
        warn_if_frame_budget_exceeded(self.profiler.total_frame_time, self.config.frame_budget_ms);
    }
}
