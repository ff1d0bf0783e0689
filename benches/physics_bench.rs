use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use particle_collider::*;
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

fn prepare_world(particle_count: usize, kind: ResolverKind, parallel: bool) -> ParticleWorld {
    let config = SimulationConfig::new(1280.0, 1280.0, 128, 128)
        .with_resolver(kind)
        .with_parallel(parallel);
    let mut world = ParticleWorld::new(config).expect("valid config");
    let per_row = 250;
    for i in 0..particle_count {
        let x = 10.0 + (i % per_row) as f32 * 5.0;
        let y = 10.0 + (i / per_row) as f32 * 5.0;
        world.add_particle(Particle::new(Vec2::new(x, y), 2.0));
    }
    world
}

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    for &count in &[1_000usize, 10_000, 40_000] {
        let variants = [
            ("sequential", ResolverKind::Scalar, false),
            ("partitioned", ResolverKind::Scalar, true),
            ("simd", ResolverKind::Simd, false),
        ];
        for (name, kind, parallel) in variants {
            group.bench_with_input(BenchmarkId::new(name, count), &count, |b, &count| {
                let mut world = prepare_world(count, kind, parallel);
                b.iter(|| world.step(black_box(DT)))
            });
        }
    }
    group.finish();
}

fn bench_grid_populate(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_populate");
    for &count in &[10_000usize, 40_000] {
        group.bench_with_input(BenchmarkId::new("spatial_grid", count), &count, |b, &count| {
            let world = prepare_world(count, ResolverKind::Scalar, false);
            let particles: Vec<Particle> = world.particles().collect();
            let mut grid = SpatialGrid::new(1280.0, 1280.0, 128, 128).expect("valid grid");
            b.iter(|| {
                grid.populate(&particles);
                black_box(grid.member_count())
            })
        });
    }
    group.finish();
}

fn bench_partition_plan(c: &mut Criterion) {
    c.bench_function("partition_plan_128x128", |b| {
        b.iter(|| black_box(PartitionPlan::new(black_box(128 * 128), 128, 8)))
    });
}

criterion_group!(benches, bench_world_step, bench_grid_populate, bench_partition_plan);
criterion_main!(benches);
