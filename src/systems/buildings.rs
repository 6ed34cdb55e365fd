use crate::{
    building::FireState,
    engine::{System, SystemContext},
    rng::RandomSource,
    world::World,
};

use super::{fire, growth};

/// Simulates the roster slot under the cursor: fire and rubble first, then
/// zone growth for healthy lots.
pub struct BuildingSystem;

impl BuildingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuildingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BuildingSystem {
    fn name(&self) -> &str {
        "buildings"
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>, world: &mut World, rng: &mut dyn RandomSource) {
        let slot = ctx.cursor as usize;
        let Some(before) = world.building(slot).copied() else {
            return;
        };
        if !before.exists() {
            return;
        }

        match before.fire_state() {
            FireState::Burning(_) => fire::burn(slot, world, rng, &mut *ctx.hooks),
            FireState::Rubble(_) => fire::decay_rubble(slot, world, rng, &mut *ctx.hooks),
            FireState::Healthy(_) if before.kind.is_zone() => {
                growth::simulate_zone(slot, world, rng);
            }
            FireState::Healthy(_) => {}
        }

        if let Some(after) = world.building(slot) {
            if !after.exists() {
                // cleared lots report their last footprint
                ctx.hooks.refresh_building(&before);
            } else if *after != before {
                ctx.hooks.refresh_building(after);
            }
        }
    }
}
