use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    building::Building,
    world::{Ledger, Mode, Populations, ScenarioStatus, World},
};

/// Month-end view of a city, written as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct CitySnapshot {
    pub year: u16,
    pub month: u8,
    pub funds: i32,
    pub tax_rate: u8,
    pub populations: Populations,
    pub ledger: Ledger,
    pub scenario: ScenarioStatus,
    pub mode: Mode,
    pub disaster_countdown: u16,
    pub rng_state: u16,
    pub road_tiles: u32,
    pub buildings: Vec<Building>,
}

impl CitySnapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            year: world.year,
            month: world.month,
            funds: world.funds,
            tax_rate: world.tax_rate,
            populations: world.populations,
            ledger: world.ledger,
            scenario: world.scenario,
            mode: world.mode,
            disaster_countdown: world.disaster_countdown,
            rng_state: world.rng.state(),
            road_tiles: world.connections.road_tile_count(),
            buildings: world.buildings.occupied().copied().collect(),
        }
    }
}

pub struct SnapshotWriter {
    dir: PathBuf,
    interval_months: u32,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval_months: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_months,
        }
    }

    /// Writes `dir/<scenario>/month_NNNNNN.json` when `months_elapsed` lands
    /// on the interval. An interval of zero disables snapshots.
    pub fn maybe_write(
        &self,
        world: &World,
        scenario_name: &str,
        months_elapsed: u64,
    ) -> Result<Option<PathBuf>> {
        if self.interval_months == 0 || months_elapsed % self.interval_months as u64 != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(file_stem(scenario_name));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("month_{months_elapsed:06}.json"));
        let json = serde_json::to_string_pretty(&CitySnapshot::capture(world))?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
