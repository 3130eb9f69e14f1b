#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the traffic grid simulation over a map file.

mod settings;

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use traffic_grid_core::{AgentSnapshot, Event};
use traffic_grid_world::{query, World};

use crate::settings::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "traffic-grid",
    version,
    about = "Simulate agents travelling across a constrained traffic grid"
)]
struct Cli {
    /// Map file holding one row of glyphs per line.
    #[arg(long)]
    map: PathBuf,
    /// Agents spawned when the world is built.
    #[arg(long)]
    agents: Option<u32>,
    /// Grid width; defaults to the map's longest row.
    #[arg(long)]
    width: Option<u32>,
    /// Grid height; defaults to the map's row count.
    #[arg(long)]
    height: Option<u32>,
    /// Seed of the simulation's random source.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 100)]
    steps: u64,
    /// TOML file with world configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print one JSON report per tick instead of text.
    #[arg(long)]
    json: bool,
    /// Extra agents spawned on free corners before the first tick.
    #[arg(long, default_value_t = 0)]
    spawn: u32,
    /// Log per-agent decisions.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct TickReport<'a> {
    tick: u64,
    active_agents: usize,
    completed: u64,
    agents: Vec<AgentSnapshot>,
    events: &'a [Event],
}

/// Entry point for the traffic grid command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let map = settings::load_map(&cli.map)?;
    let file = cli
        .config
        .as_deref()
        .map(settings::load_config)
        .transpose()?;
    let config = settings::resolve(
        file,
        &map,
        Overrides {
            population: cli.agents,
            columns: cli.width,
            rows: cli.height,
            seed: cli.seed,
        },
    );

    let mut world = World::new(config, map).context("failed to build the simulation")?;
    let mut events = Vec::new();
    for _ in 0..cli.spawn {
        let id = world
            .spawn_agent(&mut events)
            .context("failed to spawn a requested agent")?;
        info!(agent = %id, "spawned requested agent");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for _ in 0..cli.steps {
        events.clear();
        world.step(&mut events);
        if cli.json {
            let report = TickReport {
                tick: query::tick(&world),
                active_agents: query::population(&world),
                completed: query::completed(&world),
                agents: query::agent_view(&world).into_vec(),
                events: &events,
            };
            serde_json::to_writer(&mut out, &report).context("failed to encode tick report")?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "tick {:>4}: {} active, {} completed",
                query::tick(&world),
                query::population(&world),
                query::completed(&world)
            )?;
        }
    }

    if !cli.json {
        for agent in query::agent_view(&world).iter() {
            writeln!(
                out,
                "{} at {} -> {} ({} hops left)",
                agent.id,
                agent.cell,
                agent.destination,
                agent.path.len()
            )?;
        }
    }

    info!(
        ticks = query::tick(&world),
        completed = query::completed(&world),
        seed = query::config(&world).seed(),
        "simulation finished"
    );
    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the tracing subscriber")
}
