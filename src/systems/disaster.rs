use tracing::info;

use crate::{
    building::BuildingKind,
    engine::{System, SystemContext},
    hooks::SimHooks,
    rng::RandomSource,
    world::{Mode, World, DISASTER_MESSAGE_DISPLAY_TIME, MAX_BUILDINGS},
};

pub const FRAMES_PER_YEAR: u16 = MAX_BUILDINGS as u16 * 30;
pub const MIN_TIME_BETWEEN_DISASTERS: u16 = 2 * FRAMES_PER_YEAR;
pub const MAX_TIME_BETWEEN_DISASTERS: u16 = 6 * FRAMES_PER_YEAR;
pub const MIN_FRAMES_BETWEEN_DISASTER: u16 = 2500;

/// Draws the number of ticks until the next disaster.
pub fn next_interval(rng: &mut dyn RandomSource) -> u16 {
    let span = MAX_TIME_BETWEEN_DISASTERS - MIN_TIME_BETWEEN_DISASTERS;
    (rng.next_u16() % span + MIN_TIME_BETWEEN_DISASTERS).max(MIN_FRAMES_BETWEEN_DISASTER)
}

/// Tries up to [`MAX_BUILDINGS`] random slots and sets the first eligible
/// building alight. Returns the slot that caught fire.
pub fn start_random_fire(
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) -> Option<usize> {
    for _ in 0..MAX_BUILDINGS {
        let slot = (rng.next_u16() & 0xff) as usize;
        let Some(building) = world.buildings.get_mut(slot) else {
            continue;
        };
        if !building.exists()
            || building.on_fire > 0
            || building.kind.is_rubble()
            || building.kind == BuildingKind::Park
        {
            continue;
        }
        building.on_fire = 1;
        building.heavy_traffic = false;
        let (x, y, kind) = (building.x, building.y, building.kind);
        hooks.refresh_building(building);
        hooks.focus_tile(x + 1, y + 1);
        // a budget or verdict screen raised on the same tick stays up
        if !world.mode.blocks_simulation() {
            world.mode = Mode::DisasterNotice {
                remaining: DISASTER_MESSAGE_DISPLAY_TIME,
            };
        }
        info!(slot, ?kind, x, y, year = world.year, month = world.month, "fire broke out");
        return Some(slot);
    }
    None
}

/// Counts the disaster timer down by one tick; at zero starts a fire and
/// draws the next interval.
pub fn tick_countdown(
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) -> Option<usize> {
    world.disaster_countdown = world.disaster_countdown.saturating_sub(1);
    if world.disaster_countdown > 0 {
        return None;
    }
    let ignited = start_random_fire(world, rng, hooks);
    world.disaster_countdown = next_interval(rng);
    ignited
}

pub struct DisasterSystem;

impl DisasterSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DisasterSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disaster"
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>, world: &mut World, rng: &mut dyn RandomSource) {
        tick_countdown(world, rng, &mut *ctx.hooks);
    }
}
