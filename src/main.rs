//! Gatekeeper - demo driver
//!
//! Builds an in-memory world with a grid of doors and a handful of
//! wandering actors, attaches a mix of predicates and runs the scheduler
//! for a number of cycles.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use gatekeeper::core::calendar::{format_clock, Calendar};
use gatekeeper::core::config::GateConfig;
use gatekeeper::core::error::Result;
use gatekeeper::core::types::{Actor, ActorId, DoorId};
use gatekeeper::door::{DoorRegistry, EvaluationMode};
use gatekeeper::host::memory::MemoryHost;
use gatekeeper::host::ClimateSource;
use gatekeeper::predicate::Interaction;
use gatekeeper::scheduler::DoorScheduler;

const WORLD: &str = "overworld";
/// Distance between neighbouring doors
const SPACING: f64 = 40.0;
/// Simulated wall-clock time per cycle
const CYCLE: Duration = Duration::from_millis(50);

/// Gatekeeper demo - drive conditional doors in a simulated world
#[derive(Parser, Debug)]
#[command(name = "gatekeeper")]
#[command(about = "Simulate conditional doors with wandering actors")]
struct Args {
    /// Number of doors
    #[arg(long, default_value_t = 40)]
    doors: u64,

    /// Number of wandering actors
    #[arg(long, default_value_t = 12)]
    actors: usize,

    /// Scheduler cycles to run
    #[arg(long, default_value_t = 400)]
    cycles: u64,

    /// World ticks that pass per cycle
    #[arg(long, default_value_t = 60)]
    ticks_per_cycle: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file with scheduler configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the configuration of every door before running
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gatekeeper=debug")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => GateConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => GateConfig::default(),
    };
    tracing::info!("Gatekeeper demo starting with seed {}", seed);

    let mut host = MemoryHost::new();
    host.add_world(WORLD);
    let mut registry = DoorRegistry::new(config);

    let columns = (args.doors as f64).sqrt().ceil().max(1.0) as u64;
    for i in 0..args.doors {
        let position = DVec3::new((i % columns) as f64 * SPACING, 64.0, (i / columns) as f64 * SPACING);
        host.add_door(DoorId(i), WORLD, position);
        registry.get_or_register(DoorId(i), WORLD, position);
        configure_door(&mut registry, DoorId(i))?;
    }

    let extent = columns as f64 * SPACING;
    let actors = spawn_actors(&mut host, &mut rng, args.actors, extent);

    if args.verbose {
        for door in registry.doors() {
            for line in door.describe() {
                println!("{}", line);
            }
            println!();
        }
    }

    let mut scheduler = DoorScheduler::new(&registry);
    let start = Instant::now();
    let (mut opened, mut closed) = (0usize, 0usize);

    for cycle in 0..args.cycles {
        let now = start + CYCLE * cycle as u32;
        host.advance_time(args.ticks_per_cycle);
        wander(&mut host, &mut rng, &actors, extent);

        if rng.gen_bool(0.01) {
            let raining = rng.gen_bool(0.5);
            host.set_downfall(WORLD, raining);
            tracing::info!("Weather changed, raining: {}", raining);
        }
        if rng.gen_bool(0.05) {
            registry.record_mob_kill("zombie");
        }
        if rng.gen_bool(0.1) {
            let actor = actors[rng.gen_range(0..actors.len())];
            registry.record_interaction(&Interaction::click(actor, WORLD, "key"));
        }

        // Toggles started last cycle complete now
        for (door, kind) in host.finish_toggles() {
            scheduler.on_toggle_finished(&mut registry, door, kind, now);
        }

        let report = scheduler.tick(&mut registry, &mut host, now);
        opened += report.opened.len();
        closed += report.closed.len();
        if !report.opened.is_empty() || !report.closed.is_empty() {
            let clock = Calendar::new(host.full_time(WORLD).unwrap_or_default());
            println!(
                "cycle {:>4} [day {} {} {:?}]: evaluated {:>2}, opened {:?}, closed {:?}",
                report.cycle,
                clock.current_day(),
                format_clock(clock.time_of_day()),
                clock.current_time_period(),
                report.evaluated.len(),
                report.opened,
                report.closed
            );
        }
    }

    println!();
    println!(
        "Ran {} cycles over {} doors: {} opened, {} closed, {} cached expressions",
        args.cycles,
        registry.len(),
        opened,
        closed,
        registry.engine().cached_entries()
    );
    Ok(())
}

/// Attach one of five predicate mixes, chosen by door id
fn configure_door(registry: &mut DoorRegistry, id: DoorId) -> Result<()> {
    match id.0 % 5 {
        0 => {
            registry.set_predicate_from_args(id, "time", &["08:00", "20:00"])?;
        }
        1 => {
            registry.set_predicate_from_args(id, "proximity", &["4"])?;
            registry.set_predicate_from_args(id, "permissionNode", &["demo.doors"])?;
            registry.set_stay_open(id, 2)?;
        }
        2 => {
            registry.set_predicate_from_args(id, "weather", &["downfall", "true"])?;
            registry.set_predicate_from_args(id, "mobKill", &["zombie"])?;
            registry.set_evaluation_mode(id, EvaluationMode::Or)?;
        }
        3 => {
            registry.set_predicate_from_args(id, "time", &["06:00", "22:00", "true"])?;
            registry.set_predicate_from_args(id, "proximity", &["6", "ellipsoid"])?;
            registry.set_predicate_from_args(id, "itemHolding", &["key", "1"])?;
            let validation = registry.set_custom_expression(id, "time and (location or item)")?;
            if !validation.is_fine() {
                tracing::warn!("{}: {}", id, validation);
            }
        }
        _ => {
            registry.set_predicate_from_args(id, "itemClick", &["key", "1", "true"])?;
            registry.set_invert_open(id, true)?;
            registry.set_stay_open(id, 1)?;
        }
    }
    Ok(())
}

fn spawn_actors(host: &mut MemoryHost, rng: &mut ChaCha8Rng, count: usize, extent: f64) -> Vec<ActorId> {
    let mut ids = Vec::with_capacity(count.max(1));
    for _ in 0..count.max(1) {
        let id = ActorId::new();
        let position = DVec3::new(rng.gen_range(0.0..extent), 64.0, rng.gen_range(0.0..extent));
        host.add_actor(Actor::new(id, WORLD, position));
        if rng.gen_bool(0.5) {
            host.grant_permission(id, "demo.doors");
        }
        if rng.gen_bool(0.3) {
            host.set_hand(id, "key", rng.gen_range(1..=5));
        }
        ids.push(id);
    }
    ids
}

/// Random walk, clamped to the door grid
fn wander(host: &mut MemoryHost, rng: &mut ChaCha8Rng, actors: &[ActorId], extent: f64) {
    for &id in actors {
        let Some(current) = host.actor_mut(id).map(|a| a.actor.position) else {
            continue;
        };
        let step = DVec3::new(rng.gen_range(-1.5..1.5), 0.0, rng.gen_range(-1.5..1.5));
        let next = (current + step).clamp(DVec3::new(0.0, 64.0, 0.0), DVec3::new(extent, 64.0, extent));
        host.move_actor(id, next);
    }
}
