use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec2;
use lightcone_common::EntityId;
use lightcone_kernel::{Event, ManualClock, World, WorldConfig};
use lightcone_persist::{SnapshotStore, WorldStore, decode_events};
use lightcone_tools::WorldInspector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lightcone-cli", about = "CLI tool for lightcone worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// World configuration (YAML); defaults apply to missing keys
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured speed of light
    #[arg(long, global = true)]
    speed_of_light: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and effective configuration
    Info,
    /// Run a seeded session of random players and print the result
    Demo {
        /// Number of players to spawn
        #[arg(short, long, default_value = "4")]
        players: usize,
        /// Number of movement rounds
        #[arg(short, long, default_value = "10")]
        rounds: usize,
        /// RNG seed for team assignment and steering
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Validate and apply a JSON array of events
    Replay {
        /// Event file
        events: PathBuf,
        /// Persist the applied events and a final snapshot here
        #[arg(long)]
        store: Option<PathBuf>,
        /// Time at which to sample entities (defaults to the last event)
        #[arg(long)]
        at: Option<f64>,
    },
    /// Verify and load a world store
    Inspect {
        store: PathBuf,
        /// Time at which to sample entities (defaults to the stored clock)
        #[arg(long)]
        at: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(c) = cli.speed_of_light {
        config.speed_of_light = c;
        config.validate()?;
    }

    match cli.command {
        Commands::Info => {
            println!("lightcone-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "c={} maxRTT={} playerSpeed={} bulletSpeed={}",
                config.speed_of_light,
                config.max_rtt,
                config.player_speed(),
                config.bullet_speed()
            );
        }
        Commands::Demo {
            players,
            rounds,
            seed,
        } => run_demo(&config, players, rounds, seed)?,
        Commands::Replay { events, store, at } => {
            run_replay(&config, &events, store.as_deref(), at)?
        }
        Commands::Inspect { store, at } => {
            let store = WorldStore::open(&store)?;
            store
                .verify_integrity()
                .context("store failed integrity verification")?;
            let world = store.load_latest()?;
            print_world(&world, at.unwrap_or_else(|| world.now()));
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorldConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => WorldConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run_demo(config: &WorldConfig, players: usize, rounds: usize, seed: u64) -> anyhow::Result<()> {
    println!("Demo session: players={players} rounds={rounds} seed={seed}");

    let clock = Arc::new(ManualClock::new(0.0));
    let mut world = World::new(config, clock.clone())?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut log = SnapshotStore::new();

    let mut ids = Vec::with_capacity(players);
    for _ in 0..players {
        let player = world.create_player(&mut rng)?;
        ids.push(player.id().clone());
    }
    log.take_snapshot(&world);

    let mut rejected = 0usize;
    for round in 0..rounds {
        clock.advance(1.0);
        let t = world.now() + world.max_rtt();
        for id in &ids {
            let event = steer(&world, &mut rng, id, t);
            if world.validate_event(&event) {
                log.submit(&mut world, event)?;
            } else {
                rejected += 1;
            }
        }
        info!(round, t, "round applied");
    }

    let replayed = log.replay_latest()?;
    let sample_t = world.now() + world.max_rtt();
    let consistent = ids.iter().all(|id| {
        let live = world.get(id).and_then(|e| e.trajectory().position_at(sample_t));
        let copy = replayed.get(id).and_then(|e| e.trajectory().position_at(sample_t));
        live == copy
    });

    println!(
        "Applied {} events, rejected {rejected}; replay {}",
        log.event_log().len(),
        if consistent { "OK" } else { "MISMATCH" }
    );
    print_world(&world, sample_t);
    Ok(())
}

/// Pick a random admissible heading below the player cap.
fn steer<R: Rng>(world: &World, rng: &mut R, id: &EntityId, t: f64) -> Event {
    let angle = rng.random_range(0.0..std::f64::consts::TAU);
    let speed = world.player_speed() * rng.random::<f64>();
    let x = world
        .get(id)
        .and_then(|e| e.trajectory().position_at(t))
        .unwrap_or(DVec2::ZERO);
    Event::Move {
        id: id.clone(),
        t,
        x,
        v: DVec2::from_angle(angle) * speed,
    }
}

fn run_replay(
    config: &WorldConfig,
    path: &Path,
    store_path: Option<&Path>,
    at: Option<f64>,
) -> anyhow::Result<()> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let events = decode_events(&text)?;

    let clock = Arc::new(ManualClock::new(0.0));
    let mut world = World::new(config, clock.clone())?;
    let mut applied = Vec::with_capacity(events.len());
    for event in events {
        clock.set(event.t());
        // Arrivals and departures come from the session layer; only
        // player-issued events need admission.
        let admitted = match event {
            Event::Join { .. } | Event::Leave { .. } => true,
            Event::Move { .. } | Event::Shoot { .. } => world.validate_event(&event),
        };
        if !admitted {
            continue;
        }
        match world.handle_event(&event) {
            Ok(()) => applied.push(event),
            Err(e) => warn!(error = %e, "skipping event"),
        }
    }

    println!("Applied {} events", applied.len());
    if let Some(store_path) = store_path {
        let mut store = WorldStore::open(store_path)?;
        store.append_events(&applied)?;
        store.take_snapshot(&world)?;
        println!(
            "Stored in {} (snapshots={})",
            store.root().display(),
            store.meta().snapshot_count
        );
    }
    print_world(&world, at.unwrap_or_else(|| world.now()));
    Ok(())
}

fn print_world(world: &World, t: f64) {
    println!("{}", WorldInspector::summary(world));
    for id in WorldInspector::list_entities(world) {
        if let Some(info) = WorldInspector::inspect_entity(world, &id, t) {
            println!("  {info}");
        }
    }
    let grid = WorldInspector::horizon_grid(world, DVec2::splat(-10.0), DVec2::splat(10.0), 5);
    println!("Horizon over [-10, 10]²:");
    print!("{grid}");
}
