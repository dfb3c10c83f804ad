//! ring: a closed square road with traffic kept alive around a player car.
//!
//! The player circles the ring at a fixed speed; the traffic manager spawns
//! and culls vehicles around it and drives them on a kinematic world.
//!
//! ```text
//! cargo run -p ring [config.json] [roads.csv]
//! RUST_LOG=ut_sim=debug cargo run -p ring
//! ```

mod ring;
mod world;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ut_core::{AgentId, NodeId, Tick, TrafficConfig};
use ut_road::RoadGraphCompiler;
use ut_sim::{RemovalReason, TrafficManagerBuilder, TrafficObserver};

use world::RingWorld;

// ── Constants ─────────────────────────────────────────────────────────────────

const SIM_SECONDS: f32 = 300.0;
const DT:          f32 = 1.0 / 30.0;
const PLAYER_SPEED: f32 = 40.0;
/// Log a status line every this many control ticks.
const REPORT_EVERY: u64 = 15;

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Stats {
    spawned: usize,
    out_of_volume: usize,
    exhausted: usize,
    other: usize,
    last_volume: usize,
}

impl TrafficObserver for Stats {
    fn on_control_tick(&mut self, tick: Tick, volume: usize, vehicles: usize) {
        self.last_volume = volume;
        if tick.0 % REPORT_EVERY == 0 {
            info!(%tick, volume, vehicles, spawned = self.spawned, "status");
        }
    }

    fn on_vehicle_spawned(&mut self, _agent: AgentId, _node: NodeId) {
        self.spawned += 1;
    }

    fn on_vehicle_removed(&mut self, _agent: AgentId, reason: RemovalReason) {
        match reason {
            RemovalReason::OutOfVolume => self.out_of_volume += 1,
            RemovalReason::PathExhausted => self.exhausted += 1,
            RemovalReason::Vanished | RemovalReason::Rebuild => self.other += 1,
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn load_config(path: Option<&str>) -> Result<TrafficConfig> {
    let Some(path) = path else {
        return Ok(TrafficConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {path}"))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing config {path}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;

    // 1. Road network.
    let mut compiler = RoadGraphCompiler::new(config.road.clone());
    match args.get(2) {
        Some(path) => compiler
            .read_file(Path::new(path))
            .with_context(|| format!("reading roads {path}"))?,
        None => ring::push_ring(&mut compiler)?,
    }
    let (network, report) = compiler.compile();
    if !report.is_clean() {
        warn!(discarded = report.discarded.len(), "some road segments were dropped");
    }

    // 2. Traffic.
    let mut traffic = TrafficManagerBuilder::new(config, RingWorld::new(PLAYER_SPEED))
        .network(network)
        .build()?;
    let mut stats = Stats::default();
    traffic.begin(&mut stats);

    // 3. Run.
    let steps = (SIM_SECONDS / DT) as u64;
    for _ in 0..steps {
        traffic.host_mut().integrate(DT);
        traffic.step(DT, &mut stats);
    }

    println!();
    println!("=== ring: {SIM_SECONDS} s simulated ===");
    println!("Control ticks:    {}", traffic.clock.current_tick.0);
    println!("Spawn volume:     {} nodes", stats.last_volume);
    println!("Vehicles alive:   {}", traffic.vehicle_count());
    println!("Mean speed:       {:.1}", traffic.host().mean_speed());
    println!("Spawned:          {}", stats.spawned);
    println!("Culled:           {}", stats.out_of_volume);
    println!("Path exhausted:   {}", stats.exhausted);
    println!("Other removals:   {}", stats.other);
    debug_assert_eq!(traffic.vehicle_count(), traffic.host().car_count());
    Ok(())
}
