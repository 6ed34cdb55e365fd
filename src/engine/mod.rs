use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::{
    hooks::{NoopHooks, SimHooks},
    power::{FloodFillPower, PowerGrid},
    rng::RandomSource,
    scenario::ScenarioGoals,
    snapshot::SnapshotWriter,
    systems::{BuildingSystem, CalendarSystem, DisasterSystem, PopulationSystem, PowerSystem},
    world::{Mode, World, MAX_BUILDINGS},
};

pub const POWER_STEP: u32 = MAX_BUILDINGS as u32;
pub const POPULATION_STEP: u32 = POWER_STEP + 1;
pub const FAST_ROLLOVER_STEP: u32 = POPULATION_STEP + 1;
pub const ROLLOVER_STEP: u32 = 360;

pub struct EngineSettings {
    pub scenario_name: String,
    pub goals: Option<ScenarioGoals>,
    pub snapshot_interval_months: u32,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    power: Box<dyn PowerGrid>,
    hooks: Box<dyn SimHooks>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            power: Box::new(FloodFillPower::new()),
            hooks: Box::new(NoopHooks),
        }
    }

    pub fn with_power(mut self, power: impl PowerGrid + 'static) -> Self {
        self.power = Box::new(power);
        self
    }

    pub fn with_hooks(mut self, hooks: impl SimHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_months,
            ),
            settings: self.settings,
            power: self.power,
            hooks: self.hooks,
            buildings: BuildingSystem::new(),
            power_system: PowerSystem::new(),
            population: PopulationSystem::new(),
            calendar: CalendarSystem::new(),
            disasters: DisasterSystem::new(),
            ticks: 0,
            months: 0,
        }
    }
}

/// What a single call to [`Engine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    Paused,
    Blocked,
    Building(usize),
    PowerRecompute,
    PopulationRecompute,
    Idle,
    MonthRollover { year_end: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub outcome: TickOutcome,
    pub year: u16,
    pub month: u8,
    pub funds: i32,
    pub population: u32,
}

pub struct Engine {
    settings: EngineSettings,
    power: Box<dyn PowerGrid>,
    hooks: Box<dyn SimHooks>,
    buildings: BuildingSystem,
    power_system: PowerSystem,
    population: PopulationSystem,
    calendar: CalendarSystem,
    disasters: DisasterSystem,
    snapshot_writer: SnapshotWriter,
    ticks: u64,
    months: u64,
}

impl Engine {
    /// Advances the city by one phase.
    pub fn tick(&mut self, world: &mut World) -> TickOutcome {
        if world.paused() {
            return TickOutcome::Paused;
        }
        self.ticks += 1;
        if world.mode.blocks_simulation() {
            if let Mode::BudgetReview { shown } = &mut world.mode {
                *shown = shown.saturating_add(1);
            }
            return TickOutcome::Blocked;
        }
        if let Mode::DisasterNotice { remaining } = world.mode {
            world.mode = match remaining {
                0 | 1 => Mode::Running,
                n => Mode::DisasterNotice { remaining: n - 1 },
            };
        }

        let mut rng = world.rng;
        let cursor = world.cursor;
        let mut ctx = SystemContext {
            cursor,
            goals: self.settings.goals.as_ref(),
            hooks: self.hooks.as_mut(),
            power: self.power.as_mut(),
        };

        let outcome = match cursor {
            c if c < POWER_STEP => {
                self.buildings.run(&mut ctx, world, &mut rng);
                TickOutcome::Building(c as usize)
            }
            POWER_STEP => {
                self.power_system.run(&mut ctx, world, &mut rng);
                TickOutcome::PowerRecompute
            }
            POPULATION_STEP => {
                self.population.run(&mut ctx, world, &mut rng);
                TickOutcome::PopulationRecompute
            }
            FAST_ROLLOVER_STEP if world.fast() => {
                self.calendar.run(&mut ctx, world, &mut rng);
                TickOutcome::MonthRollover {
                    year_end: world.month == 0,
                }
            }
            ROLLOVER_STEP => {
                self.calendar.run(&mut ctx, world, &mut rng);
                TickOutcome::MonthRollover {
                    year_end: world.month == 0,
                }
            }
            _ => TickOutcome::Idle,
        };

        if !matches!(outcome, TickOutcome::MonthRollover { .. }) {
            world.cursor = world.cursor.saturating_add(1);
        }
        self.disasters.run(&mut ctx, world, &mut rng);
        world.rng = rng;
        outcome
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    /// Runs `ticks` ticks, handing a report to `hook` after each one and
    /// writing a snapshot whenever the configured number of months passed.
    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(TickReport),
    {
        for tick in 1..=ticks {
            let outcome = self.tick(world);
            if matches!(outcome, TickOutcome::MonthRollover { .. }) {
                self.months += 1;
                self.snapshot_writer
                    .maybe_write(world, &self.settings.scenario_name, self.months)?;
            }
            hook(TickReport {
                tick,
                outcome,
                year: world.year,
                month: world.month,
                funds: world.funds,
                population: world.total_population(),
            });
        }
        Ok(())
    }

    /// Ticks that were not paused.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn months(&self) -> u64 {
        self.months
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

pub struct SystemContext<'a> {
    pub cursor: u32,
    pub goals: Option<&'a ScenarioGoals>,
    pub hooks: &'a mut dyn SimHooks,
    pub power: &'a mut dyn PowerGrid,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &mut SystemContext<'_>, world: &mut World, rng: &mut dyn RandomSource);
}
