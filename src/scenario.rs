use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    building::{BuildingKind, MAX_FIRE_INTENSITY, MAX_POPULATION_DENSITY},
    power::FloodFillPower,
    rng::SimRng,
    systems::{
        disaster::{MAX_TIME_BETWEEN_DISASTERS, MIN_TIME_BETWEEN_DISASTERS},
        population,
    },
    world::{
        ScenarioStatus, World, MAP_HEIGHT, MAP_WIDTH, POWERLINE_MASK, ROAD_MASK, STARTING_FUNDS,
        STARTING_TAX_RATE, STARTING_YEAR,
    },
};

pub const MAX_BUILDING_GOALS: usize = 6;

fn default_snapshot_interval_months() -> u32 {
    12
}

fn default_tax_rate() -> u8 {
    STARTING_TAX_RATE
}

fn default_auto_budget() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingGoal {
    pub kind: BuildingKind,
    pub count: u8,
}

/// Targets checked at the end of the goal year. Zero population targets
/// mean no requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioGoals {
    pub year: u16,
    #[serde(default)]
    pub funds: i32,
    #[serde(default)]
    pub residential: u32,
    #[serde(default)]
    pub commercial: u32,
    #[serde(default)]
    pub industrial: u32,
    #[serde(default)]
    pub buildings: Vec<BuildingGoal>,
}

/// Straight run of road or power line, inclusive of both ends.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Segment {
    pub from: [u8; 2],
    pub to: [u8; 2],
}

impl Segment {
    fn tiles(&self) -> Result<Vec<(u8, u8)>> {
        let [x1, y1] = self.from;
        let [x2, y2] = self.to;
        if x1 == x2 {
            Ok((y1.min(y2)..=y1.max(y2)).map(|y| (x1, y)).collect())
        } else if y1 == y2 {
            Ok((x1.min(x2)..=x1.max(x2)).map(|x| (x, y1)).collect())
        } else {
            bail!("segment ({x1}, {y1})-({x2}, {y2}) is not straight")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioBuilding {
    pub kind: BuildingKind,
    pub x: u8,
    pub y: u8,
    #[serde(default)]
    pub density: u8,
    #[serde(default)]
    pub on_fire: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    /// Catalog index; 0 is a free-play sandbox.
    #[serde(default)]
    pub id: u8,
    pub seed: u64,
    #[serde(default)]
    pub start_year: Option<u16>,
    #[serde(default)]
    pub start_funds: Option<i32>,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: u8,
    #[serde(default = "default_auto_budget")]
    pub auto_budget: bool,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_months")]
    pub snapshot_interval_months: u32,
    #[serde(default)]
    pub roads: Vec<Segment>,
    #[serde(default)]
    pub power_lines: Vec<Segment>,
    #[serde(default)]
    pub buildings: Vec<ScenarioBuilding>,
    #[serde(default)]
    pub goals: Option<ScenarioGoals>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    fn validate(&self) -> Result<()> {
        ensure!(self.id < 64, "scenario id {} does not fit the status byte", self.id);
        if let Some(goals) = &self.goals {
            ensure!(
                !is_sandbox(self.id),
                "scenario id {} is a sandbox and cannot carry goals",
                self.id
            );
            ensure!(
                goals.buildings.len() <= MAX_BUILDING_GOALS,
                "at most {MAX_BUILDING_GOALS} building goals are supported"
            );
        }
        for building in &self.buildings {
            ensure!(
                building.density <= MAX_POPULATION_DENSITY,
                "density {} at ({}, {}) exceeds {MAX_POPULATION_DENSITY}",
                building.density,
                building.x,
                building.y
            );
        }
        Ok(())
    }

    /// Explicit goals win over the built-in catalog row for `id`.
    pub fn goals(&self) -> Option<ScenarioGoals> {
        self.goals.clone().or_else(|| builtin_goals(self.id))
    }

    pub fn start_year(&self) -> u16 {
        self.start_year
            .or_else(|| catalog_entry(self.id).and_then(|entry| entry.start_year))
            .unwrap_or(STARTING_YEAR)
    }

    pub fn start_funds(&self) -> i32 {
        self.start_funds
            .or_else(|| catalog_entry(self.id).and_then(|entry| entry.start_funds))
            .unwrap_or(STARTING_FUNDS)
    }

    pub fn build_world(&self) -> Result<World> {
        let mut seeder = ChaCha8Rng::seed_from_u64(self.seed);
        let rng = SimRng::from_expander(&mut seeder);
        let mut world = World::new(rng);
        world.disaster_countdown =
            seeder.gen_range(MIN_TIME_BETWEEN_DISASTERS..MAX_TIME_BETWEEN_DISASTERS);
        world.year = self.start_year();
        world.funds = self.start_funds();
        world.set_tax_rate(self.tax_rate)?;
        world.set_auto_budget(self.auto_budget);
        world.scenario = ScenarioStatus {
            id: self.id,
            ..ScenarioStatus::default()
        };

        let layers = [(&self.roads, ROAD_MASK), (&self.power_lines, POWERLINE_MASK)];
        for (segments, mask) in layers {
            for segment in segments {
                for (x, y) in segment.tiles()? {
                    ensure!(
                        x < MAP_WIDTH && y < MAP_HEIGHT,
                        "connection at ({x}, {y}) is off the map"
                    );
                    world.connections.set(x, y, world.connections.get(x, y) | mask);
                }
            }
        }
        for entry in &self.buildings {
            let slot = world
                .insert_building(entry.kind, entry.x, entry.y)
                .with_context(|| {
                    format!("Cannot place {:?} at ({}, {})", entry.kind, entry.x, entry.y)
                })?;
            if let Some(building) = world.buildings.get_mut(slot) {
                if entry.kind.is_zone() {
                    building.population_density = entry.density;
                }
                building.on_fire = entry.on_fire.min(MAX_FIRE_INTENSITY);
            }
        }

        population::recount(&mut world);
        world.refresh_derived(&mut FloodFillPower::new());
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(3_600)
    }
}

struct CatalogEntry {
    title: &'static str,
    start_year: Option<u16>,
    start_funds: Option<i32>,
    goal_year: u16,
    goal_funds: i32,
    goal_populations: [u32; 3],
    goal_buildings: &'static [(BuildingKind, u8)],
}

const fn sandbox(title: &'static str) -> CatalogEntry {
    CatalogEntry {
        title,
        start_year: None,
        start_funds: None,
        goal_year: 0,
        goal_funds: 0,
        goal_populations: [0; 3],
        goal_buildings: &[],
    }
}

const CATALOG: [CatalogEntry; 10] = [
    sandbox("River"),
    sandbox("Island"),
    sandbox("Lake"),
    sandbox("Plains"),
    sandbox("Seaside"),
    sandbox("Random"),
    CatalogEntry {
        title: "Coastal Rescue",
        start_year: Some(1970),
        start_funds: Some(10_000),
        goal_year: 2000,
        goal_funds: 30_000,
        goal_populations: [400, 350, 300],
        goal_buildings: &[],
    },
    CatalogEntry {
        title: "Rural Growth",
        start_year: Some(1900),
        start_funds: Some(3_000),
        goal_year: 1950,
        goal_funds: 25_000,
        goal_populations: [550, 400, 400],
        goal_buildings: &[
            (BuildingKind::Stadium, 1),
            (BuildingKind::FireDept, 1),
            (BuildingKind::PoliceDept, 1),
        ],
    },
    CatalogEntry {
        title: "Urban Revitalization",
        start_year: Some(1980),
        start_funds: Some(7_500),
        goal_year: 2010,
        goal_funds: 70_000,
        goal_populations: [500, 500, 500],
        goal_buildings: &[
            (BuildingKind::Stadium, 1),
            (BuildingKind::Park, 5),
            (BuildingKind::FireDept, 2),
            (BuildingKind::PoliceDept, 2),
        ],
    },
    CatalogEntry {
        title: "Island Paradise",
        start_year: Some(2000),
        start_funds: Some(5_000),
        goal_year: 2020,
        goal_funds: 20_000,
        goal_populations: [400, 300, 300],
        goal_buildings: &[],
    },
];

fn catalog_entry(id: u8) -> Option<&'static CatalogEntry> {
    CATALOG.get(id as usize)
}

/// Free-play ids: 0 and every catalog row without a goal year.
pub fn is_sandbox(id: u8) -> bool {
    id == 0 || catalog_entry(id).is_some_and(|entry| entry.goal_year == 0)
}

pub fn builtin_title(id: u8) -> Option<&'static str> {
    catalog_entry(id).map(|entry| entry.title)
}

/// Goal row of a built-in scenario; sandboxes have none.
pub fn builtin_goals(id: u8) -> Option<ScenarioGoals> {
    let entry = catalog_entry(id)?;
    if entry.goal_year == 0 {
        return None;
    }
    let [residential, commercial, industrial] = entry.goal_populations;
    Some(ScenarioGoals {
        year: entry.goal_year,
        funds: entry.goal_funds,
        residential,
        commercial,
        industrial,
        buildings: entry
            .goal_buildings
            .iter()
            .map(|&(kind, count)| BuildingGoal { kind, count })
            .collect(),
    })
}
