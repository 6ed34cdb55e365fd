use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tinycity::{
    engine::{EngineBuilder, EngineSettings},
    power::FloodFillPower,
    save,
    scenario::ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Tile city growth simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/river_sandbox.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in months (0 disables snapshots)
    #[arg(long)]
    snapshot_interval: Option<u32>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Resume from a saved city instead of building the scenario map
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the final city to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Roll months over at the fast-forward step
    #[arg(long)]
    fast: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = match &cli.load {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read save file {}", path.display()))?;
            save::load(&bytes, &mut FloodFillPower::new())
                .with_context(|| format!("Failed to decode {}", path.display()))?
        }
        None => scenario.build_world()?,
    };
    if cli.fast {
        world.set_fast(true);
    }

    let ticks = scenario.ticks(cli.ticks);
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        goals: scenario.goals(),
        snapshot_interval_months: cli
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_months),
        snapshot_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_power(FloodFillPower::new())
        .build();

    info!(scenario = %scenario.name, ticks, "starting simulation");
    // no one is watching the screens, so dismiss them as soon as allowed
    for _ in 0..ticks {
        engine.run(&mut world, 1)?;
        let mode = world.mode;
        if mode.blocks_simulation() && world.acknowledge() {
            info!(?mode, year = world.year, "screen dismissed");
        }
    }

    if let Some(path) = &cli.save {
        fs::write(path, save::encode(&world))
            .with_context(|| format!("Failed to write save file {}", path.display()))?;
    }

    println!(
        "Scenario '{}' ran {} ticks to {}-{:02}. Funds: {}, population: {} (R {} / C {} / I {}), mode: {:?}",
        scenario.name,
        ticks,
        world.year,
        world.month + 1,
        world.funds,
        world.total_population(),
        world.populations.residential,
        world.populations.commercial,
        world.populations.industrial,
        world.mode,
    );
    Ok(())
}
