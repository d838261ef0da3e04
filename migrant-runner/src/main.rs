use clap::Parser;
use hdrhistogram::Histogram;
use log::{error, info, warn};
use migrant_config::{load_config, Config, ConfigError};
use migrant_core::{wrap_periodic, CellId, DVec3, ParticleRecord};
use migrant_simulation::{Simulation, SimulationError};
use migrant_transfer::TransferPhase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration file (.toml or .json)
    #[arg(short, long, default_value = "sim.toml")]
    config: PathBuf,

    /// Override the number of steps to run
    #[arg(short, long)]
    steps: Option<u64>,

    /// Override the worker count
    #[arg(short, long)]
    workers: Option<usize>,
}

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("Failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Failed to create timing histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let mut config = load_config(&args.config)?;
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;
    info!("Using configuration from {}", args.config.display());

    let mut simulation = Simulation::new(&config)?;
    let mut rng = StdRng::seed_from_u64(config.run.seed);
    let seeded = seed_bodies(&mut simulation, &config, &mut rng)?;
    info!("Seeded {} particles in {} bodies", seeded, config.run.bodies);
    if config.preinlet.is_some() {
        let reservoir = seed_preinlet(&mut simulation, &config, &mut rng)?;
        info!("Seeded {} particles in the pre-inlet", reservoir);
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    // Step times in microseconds, up to one minute.
    let mut timings = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?;
    let started = Instant::now();

    for step in 0..config.run.steps {
        if !running.load(Ordering::SeqCst) {
            warn!("Interrupted after {} steps", step);
            break;
        }

        let step_start = Instant::now();
        let report = simulation.step()?;
        timings.saturating_record(step_start.elapsed().as_micros() as u64);

        if config.run.report_every > 0 && (step + 1) % config.run.report_every == 0 {
            info!(
                "Step {}: {} particles, {} local / {} sent / {} received, {} dropped, {} fed",
                step + 1,
                simulation.total_particles(),
                report.exchanged.local,
                report.exchanged.sent,
                report.exchanged.received,
                report.removed,
                report.fed
            );
        }
    }

    print_summary(&simulation, &timings, started.elapsed().as_secs_f64());
    Ok(())
}

/// Scatters `run.bodies` bodies of `particles_per_body` particles around
/// random centres. Every particle of a body shares its velocity.
fn seed_bodies(simulation: &mut Simulation, config: &Config, rng: &mut StdRng) -> Result<usize, SimulationError> {
    let extent = config.domain.extent().map(|n| n as f64);
    let run = &config.run;
    let mut seeded = 0;

    for body in 0..run.bodies {
        let centre = DVec3::new(
            rng.gen_range(0.0..extent[0]),
            rng.gen_range(0.0..extent[1]),
            rng.gen_range(0.0..extent[2]),
        );
        let velocity = random_velocity(rng, run.max_speed);
        for vertex in 0..run.particles_per_body {
            let scatter = random_velocity(rng, run.body_radius);
            let position = wrap(centre + scatter, extent);
            simulation.insert(ParticleRecord::new(position, body as CellId, vertex).with_velocity(velocity))?;
            seeded += 1;
        }
    }
    Ok(seeded)
}

/// Fills the reservoir slab with bodies drifting towards the inlet.
fn seed_preinlet(simulation: &mut Simulation, config: &Config, rng: &mut StdRng) -> Result<usize, SimulationError> {
    let Some(settings) = &config.preinlet else {
        return Ok(0);
    };
    let thickness = settings.thickness as f64;
    let (ny, nz) = (config.domain.ny as f64, config.domain.nz as f64);
    let velocity = DVec3::new(settings.inflow_speed, 0.0, 0.0);
    let mut seeded = 0;

    for body in 0..settings.bodies {
        let id = (config.run.bodies + body) as CellId;
        let centre = DVec3::new(rng.gen_range(-thickness..0.0), rng.gen_range(0.0..ny), rng.gen_range(0.0..nz));
        for vertex in 0..config.run.particles_per_body {
            let scatter = random_velocity(rng, config.run.body_radius);
            let mut position = centre + scatter;
            position.x = wrap_periodic(position.x, thickness).0 - thickness;
            position.y = wrap_periodic(position.y, ny).0;
            position.z = wrap_periodic(position.z, nz).0;
            simulation.insert_preinlet(ParticleRecord::new(position, id, vertex).with_velocity(velocity))?;
            seeded += 1;
        }
    }
    Ok(seeded)
}

fn random_velocity(rng: &mut StdRng, bound: f64) -> DVec3 {
    if bound <= 0.0 {
        return DVec3::ZERO;
    }
    DVec3::new(
        rng.gen_range(-bound..bound),
        rng.gen_range(-bound..bound),
        rng.gen_range(-bound..bound),
    )
}

fn wrap(position: DVec3, extent: [f64; 3]) -> DVec3 {
    DVec3::new(
        wrap_periodic(position.x, extent[0]).0,
        wrap_periodic(position.y, extent[1]).0,
        wrap_periodic(position.z, extent[2]).0,
    )
}

fn print_summary(simulation: &Simulation, timings: &Histogram<u64>, elapsed: f64) {
    info!(
        "Ran {} steps in {:.2}s, {} particles remain",
        simulation.steps_taken(),
        elapsed,
        simulation.total_particles()
    );
    if !timings.is_empty() {
        info!(
            "Step time (us): p50 {} | p90 {} | p99 {} | max {}",
            timings.value_at_quantile(0.5),
            timings.value_at_quantile(0.9),
            timings.value_at_quantile(0.99),
            timings.max()
        );
    }

    let stats = simulation.stats();
    for phase in TransferPhase::ALL {
        info!(
            "{:>20}: {} calls, {} particles",
            phase.name(),
            stats.calls(phase),
            stats.records(phase)
        );
    }
    if stats.identity_overflows() > 0 {
        warn!("{} identity shifts fell back to canonical ids", stats.identity_overflows());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_toml_str(
            r#"
            workers = 2

            [replica]
            bodies_per_replica = 10

            [domain]
            nx = 8
            ny = 8
            nz = 8
            periodic = [false, true, true]
            blocks = [2, 1, 1]

            [run]
            steps = 3
            bodies = 4
            particles_per_body = 3
            body_radius = 2.0

            [preinlet]
            thickness = 2
            bodies = 2
            "#,
        )
        .unwrap()
    }

    #[test]
    fn seeds_every_particle_inside_the_domain() {
        let config = config();
        let mut simulation = Simulation::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(seed_bodies(&mut simulation, &config, &mut rng).unwrap(), 12);
        assert_eq!(simulation.total_particles(), 12);
        assert_eq!(seed_preinlet(&mut simulation, &config, &mut rng).unwrap(), 6);
        assert_eq!(simulation.preinlet().unwrap().len(), 6);
    }

    #[test]
    fn wrap_keeps_boundary_values_inside() {
        let extent = [8.0, 8.0, 8.0];
        let wrapped = wrap(DVec3::new(-1e-17, 8.0, -3.0), extent);
        assert!(wrapped.x < 8.0);
        assert_eq!(wrapped.y, 0.0);
        assert_eq!(wrapped.z, 5.0);

        let config = config();
        let mut simulation = Simulation::new(&config).unwrap();
        assert!(simulation.insert(ParticleRecord::new(wrapped, 0, 0)).is_ok());
    }

    #[test]
    fn seeded_run_completes() {
        let config = config();
        let mut simulation = Simulation::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(config.run.seed);
        seed_bodies(&mut simulation, &config, &mut rng).unwrap();
        seed_preinlet(&mut simulation, &config, &mut rng).unwrap();

        for _ in 0..config.run.steps {
            simulation.step().unwrap();
        }
        assert_eq!(simulation.steps_taken(), 3);
    }
}
