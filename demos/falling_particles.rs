use particle_collider::*;

fn main() -> Result<(), ConfigError> {
    let config = SimulationConfig::default().with_resolver(ResolverKind::Scalar);
    let mut world = ParticleWorld::new(config)?;

    for i in 0..2_000 {
        let x = 100.0 + (i % 100) as f32 * 6.0;
        let y = 50.0 + (i / 100) as f32 * 6.0;
        let particle = Particle::new(Vec2::new(x, y), 2.5).with_displacement(Vec2::new(0.2, 0.0));
        world.add_particle(particle);
    }

    for frame in 0..120 {
        world.step(1.0 / 60.0);
        if frame % 30 == 0 {
            world.profiler().report();
        }
    }

    let lowest = world.positions().into_iter().map(|p| p.y).fold(f32::MIN, f32::max);
    println!(
        "{} particles after 2 s, lowest at y = {lowest:.1}, {} contacts in the last step",
        world.len(),
        world.profiler().contact_count
    );
    Ok(())
}
