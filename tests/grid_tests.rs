use particle_collider::*;

fn one_per_cell() -> Vec<Particle> {
    (0..10)
        .flat_map(|row| {
            (0..10).map(move |col| {
                Particle::new(Vec2::new(col as f32 * 10.0 + 5.0, row as f32 * 10.0 + 5.0), 1.0)
            })
        })
        .collect()
}

#[test]
fn grid_aligned_particles_map_one_to_one() {
    let mut grid = SpatialGrid::new(100.0, 100.0, 10, 10).expect("valid grid");
    let particles: Vec<Particle> = (0..10)
        .flat_map(|row| {
            (0..10).map(move |col| {
                Particle::new(Vec2::new(col as f32 * 10.0, row as f32 * 10.0), 1.0)
            })
        })
        .collect();
    grid.populate(&particles);

    for (index, particle) in particles.iter().enumerate() {
        let id = grid.cell_id(particle.position.x, particle.position.y);
        assert_eq!(id, index);
        assert_eq!(grid.cell(id).map(|cell| cell.members()), Some(&[index as u32][..]));
    }
}

#[test]
fn particles_on_the_far_edge_stay_in_range() {
    let grid = SpatialGrid::new(100.0, 100.0, 10, 10).expect("valid grid");
    assert_eq!(grid.cell_id(100.0, 45.0), 49);
    assert_eq!(grid.cell_id(45.0, 100.0), 94);
    assert!(grid.is_valid_cell(grid.cell_id(100.0, 100.0) as i64));
}

#[test]
fn crowded_cell_holds_every_member() {
    let config = SimulationConfig::new(100.0, 100.0, 10, 10).with_parallel(false);
    let mut world = ParticleWorld::new(config).expect("valid config");
    for particle in one_per_cell() {
        world.add_particle(particle);
    }
    for _ in 0..10 {
        world.add_particle(Particle::new(Vec2::new(12.0, 64.0), 1.0));
    }

    world.populate_grid();
    assert_eq!(world.cell_population(61), Some(11));
    for id in (0..100).filter(|&id| id != 61) {
        assert_eq!(world.cell_population(id), Some(1), "cell {id}");
    }

    let before = world.positions();
    assert_eq!(world.resolve_collisions(), 0);
    assert_eq!(world.positions(), before);
}

#[test]
fn crowded_cell_scenario_holds_for_simd_backend() {
    let config = SimulationConfig::new(100.0, 100.0, 10, 10).with_resolver(ResolverKind::Simd);
    let mut world = ParticleWorld::new(config).expect("valid config");
    for particle in one_per_cell() {
        world.add_particle(particle);
    }
    for _ in 0..10 {
        world.add_particle(Particle::new(Vec2::new(12.0, 64.0), 1.0));
    }

    world.populate_grid();
    assert_eq!(world.cell_population(61), Some(11));
    let grid = world.soa_grid().expect("simd backend");
    assert_eq!(grid.member_count(), 110);

    let before = world.positions();
    assert_eq!(world.resolve_collisions(), 0);
    assert_eq!(world.positions(), before);
}

#[test]
fn invalid_configurations_are_rejected_at_construction() {
    assert!(matches!(
        ParticleWorld::new(SimulationConfig::new(100.0, 100.0, 0, 10)),
        Err(ConfigError::EmptyGrid { .. })
    ));
    assert!(matches!(
        ParticleWorld::new(SimulationConfig::new(0.0, 0.0, 10, 10)),
        Err(ConfigError::InvalidWorldSize { .. })
    ));
    assert!(matches!(
        ParticleWorld::new(SimulationConfig::new(100.0, 100.0, 10, 3)),
        Err(ConfigError::NonDividingGrid { .. })
    ));
}

#[test]
fn layout_reports_its_geometry() {
    let config = SimulationConfig::new(1280.0, 720.0, 72, 128).with_parallel(false);
    let world = ParticleWorld::new(config).expect("valid config");

    let layout = world.grid_layout();
    assert_eq!((layout.rows(), layout.cols()), (72, 128));
    assert_eq!(layout.cell_count(), 72 * 128);
    assert_eq!(layout.cell_size(), Vec2::splat(10.0));

    let grid = world.spatial_grid().expect("scalar backend");
    assert_eq!((grid.rows(), grid.cols()), (72, 128));
    assert_eq!(grid.cell_size(), layout.cell_size());
    assert_eq!(grid.layout(), layout);
    assert_eq!(grid.cell_id(1279.0, 719.0), 72 * 128 - 1);
}
