use crate::{
    engine::{System, SystemContext},
    rng::RandomSource,
    world::World,
};

/// Hands the connection map and roster to the power collaborator.
pub struct PowerSystem;

impl PowerSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PowerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PowerSystem {
    fn name(&self) -> &str {
        "power"
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>, world: &mut World, _rng: &mut dyn RandomSource) {
        ctx.power
            .recompute(&world.connections, world.buildings.as_mut_slice());
    }
}
