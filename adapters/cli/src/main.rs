#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Nova Defence session.
//!
//! The adapter plays the session with a simple shopping policy so balancing
//! files can be exercised without a renderer.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use nova_defence_core::{Balancing, Credits, Event, GamePhase, UpgradeTarget, WELCOME_BANNER};
use nova_defence_session::Session;
use nova_defence_system_phases::Stage;
use nova_defence_world::query;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nova-defence")]
#[command(about = "Run a headless Nova Defence session with an automatic player")]
struct Args {
    /// TOML balancing file. Missing keys fall back to the built-in values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the balancing random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Stops after this many completed waves.
    #[arg(long, default_value_t = 3)]
    waves: u32,
    /// Shops wait for the ready signal instead of closing on a timer.
    #[arg(long)]
    timeless: bool,
    /// Simulation step in milliseconds.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,
    /// Upper bound on simulated time in seconds.
    #[arg(long, default_value_t = 1800)]
    time_limit: u64,
    /// Log filter overriding `RUST_LOG`, for example `info` or `nova_defence_world=debug`.
    #[arg(long)]
    log: Option<String>,
    /// Credits kept spendable when banking the rest at the end of a shop.
    #[arg(long, default_value_t = 150)]
    reserve: u32,
}

/// Entry point for the Nova Defence command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`"))?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let balancing = load_balancing(&args)?;

    println!("{WELCOME_BANNER}");
    let summary = autoplay(&balancing, &args);
    summary.print();
    Ok(())
}

fn load_balancing(args: &Args) -> Result<Balancing> {
    let mut balancing = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read balancing file {}", path.display()))?;
            toml::from_str::<Balancing>(&source)
                .with_context(|| format!("failed to parse balancing file {}", path.display()))?
        }
        None => Balancing::default(),
    };

    if let Some(seed) = args.seed {
        balancing.rng_seed = seed;
    }
    if args.timeless {
        balancing.phases.timeless = true;
    }
    Ok(balancing)
}

#[derive(Debug)]
struct Summary {
    waves_completed: u32,
    kills: u32,
    spawned: u32,
    stored: Credits,
    current: Credits,
    station_destroyed: bool,
    elapsed: Duration,
}

impl Summary {
    fn print(&self) {
        println!();
        println!("=== SESSION SUMMARY ===");
        println!("  Waves completed: {}", self.waves_completed);
        println!("  Enemies spawned: {}", self.spawned);
        println!("  Enemies killed:  {}", self.kills);
        println!("  Stored credits:  {}", self.stored.get());
        println!("  Spendable:       {}", self.current.get());
        println!("  Simulated time:  {:.1}s", self.elapsed.as_secs_f64());
        if self.station_destroyed {
            println!("  The station was destroyed.");
        }
    }
}

fn autoplay(balancing: &Balancing, args: &Args) -> Summary {
    let mut session = Session::new(balancing);
    let dt = Duration::from_millis(args.dt_ms.max(1));
    let limit = Duration::from_secs(args.time_limit);
    let shopping_list = shopping_list(balancing);
    let reserve = Credits::new(args.reserve);
    let mut elapsed = Duration::ZERO;
    let mut station_destroyed = false;

    while elapsed < limit && !session.is_over() {
        for event in session.tick(dt) {
            match event {
                Event::WaveCompleted { wave } => info!(wave, "wave cleared"),
                Event::StationDestroyed => station_destroyed = true,
                Event::UpgradeRejected { .. } | Event::RepairRejected { .. } => {
                    debug!(?event, "player action rejected")
                }
                _ => {}
            }
        }
        elapsed += dt;

        if query::waves_completed(session.world()) >= args.waves {
            break;
        }
        if session.current_phase() == GamePhase::Shop
            && matches!(session.phases().stage(), Stage::Shop { .. })
        {
            shop(&mut session, &shopping_list, reserve);
            session.declare_ready();
        }
    }

    let world = session.world();
    Summary {
        waves_completed: query::waves_completed(world),
        kills: query::kills(world),
        spawned: query::enemies_spawned(world),
        stored: session.stored_credits(),
        current: session.current_credits(),
        station_destroyed,
        elapsed,
    }
}

fn shopping_list(balancing: &Balancing) -> Vec<UpgradeTarget> {
    let mut list = vec![UpgradeTarget::SmallShield, UpgradeTarget::LargeShield];
    list.extend((0..balancing.mounts.defense_orbs.len() as u32).map(UpgradeTarget::DefenseOrb));
    list.push(UpgradeTarget::Station);
    list.extend((0..balancing.mounts.pulsars.len() as u32).map(UpgradeTarget::Pulsar));
    list.extend((0..balancing.mounts.complexities.len() as u32).map(UpgradeTarget::Complexity));
    list
}

fn shop(session: &mut Session, shopping_list: &[UpgradeTarget], reserve: Credits) {
    let health = session.station_health();
    if health.current() < health.max() * 0.5 && session.attempt_station_repair() {
        info!(health = session.station_health().current(), "station repaired");
    }

    for &target in shopping_list {
        let affordable = session
            .next_price(target)
            .is_some_and(|price| price <= session.current_credits());
        if affordable && session.attempt_upgrade(target) {
            info!(?target, level = ?session.level(target), "upgrade purchased");
        }
    }

    let current = session.current_credits();
    if let Some(surplus) = current.checked_sub(reserve).filter(|surplus| !surplus.is_zero()) {
        if session.store_credits(Some(surplus)) {
            debug!(stored = surplus.get(), "surplus banked");
        }
    }
}
