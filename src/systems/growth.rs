use tracing::trace;

use crate::{
    building::{
        manhattan_distance, Building, BuildingKind, HEAVY_TRAFFIC_THRESHOLD,
        MAX_POPULATION_DENSITY,
    },
    rng::RandomSource,
    world::World,
};

pub const INCREMENT_THRESHOLD: i32 = 20;
pub const DECREMENT_THRESHOLD: i32 = -30;

const BASE_SCORE: i32 = 15;
const RANDOM_STRENGTH_MASK: u16 = 31;
const IDEAL_TAX_RATE: i32 = 6;
const TAX_RATE_PENALTY: i32 = 10;
const EMPLOYMENT_BOOST: i32 = 10;
const UNEMPLOYMENT_PENALTY: i32 = 100;
const INDUSTRIAL_OPPORTUNITY_BOOST: i32 = 10;
const COMMERCIAL_OPPORTUNITY_BOOST: i32 = 10;
const MIN_ROAD_CONNECTIONS: u8 = 3;
const LOCAL_BUILDING_DISTANCE: u8 = 32;
const LOCAL_BUILDING_INFLUENCE: i32 = 4;
const STADIUM_BOOST: i32 = 100;
const PARK_BOOST: i32 = 5;
const INDUSTRIAL_BASE_POLLUTION: i32 = 8;
const POWERPLANT_BASE_POLLUTION: i32 = 32;
const TRAFFIC_BASE_POLLUTION: i32 = 8;
const MAX_POLLUTION: i32 = 50;
const POLLUTION_INFLUENCE: i32 = 2;
const NO_POLICE_DISTANCE: u8 = 24;
const CRIME_FREE_DISTANCE: i32 = 16;
const MAX_CRIME: i32 = 50;

/// Breakdown of one desirability evaluation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZoneScore {
    pub random: i32,
    pub tax: i32,
    pub population_effect: i32,
    pub base: i32,
    pub local_influence: i32,
    pub pollution: i32,
    pub crime: i32,
    pub road_connected: bool,
}

impl ZoneScore {
    pub fn total(&self) -> i32 {
        self.random + self.tax + self.population_effect + self.base + self.local_influence
            - self.pollution
            - self.crime
    }
}

fn population_effect(kind: BuildingKind, world: &World) -> i32 {
    let res = world.populations.residential as u32;
    let com = world.populations.commercial as u32;
    let ind = world.populations.industrial as u32;
    match kind {
        BuildingKind::Residential if res < ind => EMPLOYMENT_BOOST,
        BuildingKind::Residential if res > ind + com => -UNEMPLOYMENT_PENALTY,
        BuildingKind::Industrial if ind < res || ind < com => INDUSTRIAL_OPPORTUNITY_BOOST,
        BuildingKind::Commercial if com < res || com < ind => COMMERCIAL_OPPORTUNITY_BOOST,
        _ => 0,
    }
}

/// Influence of one road-connected neighbour within the local radius.
fn neighbour_influence(this: &Building, other: &Building) -> i32 {
    let denser = other.population_density > this.population_density;
    let at_least = other.population_density >= this.population_density;
    match (other.kind, this.kind) {
        (BuildingKind::Industrial, BuildingKind::Residential) if at_least => {
            LOCAL_BUILDING_INFLUENCE
        }
        (BuildingKind::Industrial, BuildingKind::Commercial) if denser => LOCAL_BUILDING_INFLUENCE,
        (BuildingKind::Residential, BuildingKind::Commercial | BuildingKind::Industrial)
            if denser =>
        {
            LOCAL_BUILDING_INFLUENCE
        }
        (BuildingKind::Commercial, BuildingKind::Residential) if at_least => {
            LOCAL_BUILDING_INFLUENCE
        }
        (BuildingKind::Stadium, BuildingKind::Residential | BuildingKind::Commercial) => {
            STADIUM_BOOST
        }
        (BuildingKind::Park, BuildingKind::Residential) => PARK_BOOST,
        _ => 0,
    }
}

fn emitted_pollution(other: &Building, distance: u8) -> i32 {
    let distance = distance as i32;
    let emitted = match other.kind {
        BuildingKind::Industrial => {
            INDUSTRIAL_BASE_POLLUTION + other.population_density as i32 - distance
        }
        BuildingKind::Powerplant => POWERPLANT_BASE_POLLUTION - distance,
        _ if other.heavy_traffic => TRAFFIC_BASE_POLLUTION - distance,
        _ => 0,
    };
    emitted.max(0)
}

/// Scores the zone in `slot`. Consumes exactly one random draw.
pub fn score_zone(slot: usize, world: &World, rng: &mut dyn RandomSource) -> ZoneScore {
    let roster = world.buildings.as_slice();
    let building = &roster[slot];
    let mut score = ZoneScore {
        random: (rng.next_u16() & RANDOM_STRENGTH_MASK) as i32 - (RANDOM_STRENGTH_MASK / 2) as i32,
        tax: -(world.tax_rate as i32 - IDEAL_TAX_RATE) * TAX_RATE_PENALTY,
        population_effect: population_effect(building.kind, world),
        ..ZoneScore::default()
    };

    score.road_connected =
        world.connections.adjacent_road_count(building) >= MIN_ROAD_CONNECTIONS;
    let mut nearest_police = NO_POLICE_DISTANCE;
    let mut pollution = 0;

    if score.road_connected {
        if building.population_density == 0 {
            score.base = BASE_SCORE;
        }
        for (other_slot, other) in roster.iter().enumerate() {
            if other_slot == slot
                || !other.exists()
                || other.kind.is_rubble()
                || other.on_fire > 0
                || !(other.has_power || other.kind == BuildingKind::Park)
            {
                continue;
            }
            let distance = manhattan_distance(building, other);
            if other.kind == BuildingKind::PoliceDept && distance < nearest_police {
                nearest_police = distance;
            }
            pollution += emitted_pollution(other, distance);
            if distance <= LOCAL_BUILDING_DISTANCE
                && world.connections.adjacent_road_count(other) >= MIN_ROAD_CONNECTIONS
            {
                score.local_influence += neighbour_influence(building, other);
            }
        }
    }

    if building.kind == BuildingKind::Residential {
        score.pollution = pollution.min(MAX_POLLUTION) * POLLUTION_INFLUENCE;
    }
    score.crime = (building.population_density as i32
        * (nearest_police as i32 - CRIME_FREE_DISTANCE))
        .clamp(0, MAX_CRIME);
    score
}

/// Runs one growth pass for a healthy zone and returns the density change.
/// The matching sector counter is adjusted in the same pass.
pub fn simulate_zone(slot: usize, world: &mut World, rng: &mut dyn RandomSource) -> i8 {
    let Some(building) = world.buildings.get(slot).copied() else {
        return 0;
    };
    if !building.kind.is_zone() || building.on_fire > 0 {
        return 0;
    }

    let density = building.population_density;
    let (delta, heavy_traffic) = if building.has_power {
        let score = score_zone(slot, world, rng);
        let total = score.total();
        trace!(
            slot,
            kind = ?building.kind,
            density,
            total,
            random = score.random,
            crime = score.crime,
            pollution = score.pollution,
            local = score.local_influence,
            population = score.population_effect,
            "zone scored"
        );
        let delta = if density < MAX_POPULATION_DENSITY && total >= INCREMENT_THRESHOLD {
            1
        } else if density > 0 && total <= DECREMENT_THRESHOLD {
            -1
        } else {
            0
        };
        (delta, density > HEAVY_TRAFFIC_THRESHOLD)
    } else {
        (if density > 0 { -1 } else { 0 }, false)
    };

    if let Some(target) = world.buildings.get_mut(slot) {
        target.population_density = (density as i8 + delta) as u8;
        target.heavy_traffic = heavy_traffic;
    }
    world.populations.apply_delta(building.kind, delta as i16);
    delta
}
