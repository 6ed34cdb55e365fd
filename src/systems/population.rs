use crate::{
    engine::{System, SystemContext},
    rng::RandomSource,
    world::{Populations, World},
};

pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(&mut self, _ctx: &mut SystemContext<'_>, world: &mut World, _rng: &mut dyn RandomSource) {
        recount(world);
    }
}

/// Rebuilds the sector counters from the roster. The result replaces
/// whatever the incremental updates accumulated.
pub fn recount(world: &mut World) {
    let mut totals = Populations::default();
    for building in world.buildings.iter() {
        if let Some(counter) = totals.counter_mut(building.kind) {
            *counter = counter.saturating_add(building.population_density as u16);
        }
    }
    world.populations = totals;
}
