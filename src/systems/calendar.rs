use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::RandomSource,
    world::World,
};

use super::{budget, evaluation};

const MONTHS_PER_YEAR: u8 = 12;

/// Month rollover: accrue taxes, and at year end settle the budget and judge
/// the scenario before the year advances.
pub struct CalendarSystem;

impl CalendarSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalendarSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CalendarSystem {
    fn name(&self) -> &str {
        "calendar"
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>, world: &mut World, _rng: &mut dyn RandomSource) {
        budget::month_end(world);
        world.cursor = 0;
        world.month += 1;
        debug!(
            year = world.year,
            month = world.month,
            accumulated = world.ledger.accumulated_tax,
            population = world.total_population(),
            "month closed"
        );
        if world.month < MONTHS_PER_YEAR {
            return;
        }

        budget::year_end(world);
        evaluation::evaluate(world, ctx.goals);
        world.month = 0;
        world.year += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hooks::NoopHooks,
        power::FrozenPower,
        rng::SimRng,
        scenario::ScenarioGoals,
        world::Mode,
    };

    fn close_month(world: &mut World, goals: Option<&ScenarioGoals>) {
        let (mut hooks, mut power) = (NoopHooks, FrozenPower);
        let mut ctx = SystemContext {
            cursor: 360,
            goals,
            hooks: &mut hooks,
            power: &mut power,
        };
        CalendarSystem::new().run(&mut ctx, world, &mut SimRng::default());
    }

    #[test]
    fn taxes_accrue_monthly_and_land_at_year_end() {
        let mut world = World::default();
        world.populations.residential = 100;
        let funds = world.funds;
        for _ in 0..11 {
            close_month(&mut world, None);
        }
        assert_eq!(world.ledger.accumulated_tax, 110);
        assert_eq!(world.funds, funds);

        close_month(&mut world, None);
        assert_eq!(world.funds, funds + 120);
        assert_eq!(world.ledger.taxes_collected, 120);
        assert_eq!((world.year, world.month), (1901, 0));
    }

    #[test]
    fn scenario_verdict_replaces_budget_review() {
        let mut world = World::default();
        world.scenario.id = 9;
        world.month = 11;
        world.set_auto_budget(false);
        let goals = ScenarioGoals {
            year: 1900,
            funds: 1_000_000,
            residential: 0,
            commercial: 0,
            industrial: 0,
            buildings: Vec::new(),
        };
        close_month(&mut world, Some(&goals));
        assert_eq!(world.mode, Mode::ScenarioLost);
        assert_eq!(world.year, 1901);
    }
}
