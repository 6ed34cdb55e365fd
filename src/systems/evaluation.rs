use serde::Serialize;
use tracing::info;

use crate::{
    scenario::{is_sandbox, ScenarioGoals},
    world::{Mode, World},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Won,
    Lost,
}

/// Whether every target in `goals` is met right now.
pub fn goals_met(world: &World, goals: &ScenarioGoals) -> bool {
    let sectors = world.populations;
    if world.funds < goals.funds
        || (sectors.residential as u32) < goals.residential
        || (sectors.commercial as u32) < goals.commercial
        || (sectors.industrial as u32) < goals.industrial
    {
        return false;
    }
    goals
        .buildings
        .iter()
        .filter(|goal| goal.count > 0)
        .all(|goal| world.buildings.count(goal.kind) >= goal.count as usize)
}

/// Year-end scenario check. Runs before the year advances and only in the
/// goal year; a recorded verdict is never revisited.
pub fn evaluate(world: &mut World, goals: Option<&ScenarioGoals>) -> Option<Verdict> {
    let goals = goals?;
    if is_sandbox(world.scenario.id) || world.scenario.decided() || goals.year == 0 {
        return None;
    }
    if world.year != goals.year {
        return None;
    }

    let verdict = if goals_met(world, goals) {
        world.scenario.won = true;
        world.mode = Mode::ScenarioWon;
        Verdict::Won
    } else {
        world.scenario.lost = true;
        world.mode = Mode::ScenarioLost;
        Verdict::Lost
    };
    info!(
        scenario = world.scenario.id,
        year = world.year,
        funds = world.funds,
        ?verdict,
        "scenario decided"
    );
    Some(verdict)
}
