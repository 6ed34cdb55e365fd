//! Monthly tax accrual and year-end settlement.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    building::BuildingKind,
    world::{Mode, World},
};

pub const POPULATION_MULTIPLIER: i32 = 17;
pub const FIRE_AND_POLICE_MAINTENANCE_COST: i32 = 100;
pub const ROAD_MAINTENANCE_COST: i32 = 10;
const MONTHS_PER_YEAR: i32 = 12;
const TAX_DIVISOR: i32 = 100 * MONTHS_PER_YEAR;

/// Taxable units: every inhabitant of every sector weighted by the
/// population multiplier.
pub fn population_units(world: &World) -> i32 {
    world.populations.total() as i32 * POPULATION_MULTIPLIER
}

/// One month of taxes, rounded half up.
pub fn monthly_tax(world: &World) -> i32 {
    let owed = population_units(world) * world.tax_rate as i32;
    (owed + TAX_DIVISOR / 2) / TAX_DIVISOR
}

/// Taxes collected so far plus the unrounded projection for the rest of the
/// year.
pub fn estimated_year_taxes(world: &World) -> i32 {
    let remaining = (MONTHS_PER_YEAR - world.month as i32).max(0);
    let owed = population_units(world) * world.tax_rate as i32;
    world.ledger.accumulated_tax + remaining * owed / TAX_DIVISOR
}

pub fn month_end(world: &mut World) {
    world.ledger.accumulated_tax += monthly_tax(world);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetReport {
    pub year: u16,
    pub taxes_collected: i32,
    pub police_departments: u8,
    pub fire_departments: u8,
    pub road_tiles: u32,
    pub road_budget: u16,
    pub cash_flow: i32,
    pub funds: i32,
    pub review_required: bool,
}

/// Collects the year's taxes and pays upkeep. Opens the budget review when
/// the player has to look at the numbers.
pub fn year_end(world: &mut World) -> BudgetReport {
    let collected = world.ledger.accumulated_tax;
    world.ledger.taxes_collected = collected;
    world.ledger.accumulated_tax = 0;
    world.funds += collected;

    let police = world.buildings.count(BuildingKind::PoliceDept).min(u8::MAX as usize) as u8;
    let fire = world.buildings.count(BuildingKind::FireDept).min(u8::MAX as usize) as u8;
    world.ledger.police_budget = police;
    world.ledger.fire_budget = fire;
    let department_upkeep = FIRE_AND_POLICE_MAINTENANCE_COST * (police as i32 + fire as i32);
    world.funds -= department_upkeep;

    let road_tiles = world.connections.road_tile_count();
    let road_budget = (road_tiles as i32 * ROAD_MAINTENANCE_COST / 100) as u16;
    world.ledger.road_budget = road_budget;
    world.funds -= road_budget as i32;

    let cash_flow = collected - road_budget as i32 - department_upkeep;
    let review_required = !world.auto_budget() || cash_flow <= 0 || world.funds <= 0;
    if review_required {
        world.mode = Mode::BudgetReview { shown: 0 };
    }

    let report = BudgetReport {
        year: world.year,
        taxes_collected: collected,
        police_departments: police,
        fire_departments: fire,
        road_tiles,
        road_budget,
        cash_flow,
        funds: world.funds,
        review_required,
    };
    info!(
        year = report.year,
        collected,
        police,
        fire,
        road_budget,
        cash_flow,
        funds = report.funds,
        "year-end budget settled"
    );
    if review_required && world.auto_budget() {
        warn!(cash_flow, funds = report.funds, "budget needs attention");
    }
    report
}
