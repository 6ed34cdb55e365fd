//! Fire spread, suppression and rubble decay.
//!
//! Each pass draws from the generator in a fixed order: suppression roll
//! (only when a fire department is in range), spread roll, spread direction
//! (only when spreading), burn roll. Saved games depend on that order.

use tracing::debug;

use crate::{
    building::{manhattan_distance, BuildingKind, FireState, MAX_FIRE_INTENSITY},
    hooks::SimHooks,
    rng::RandomSource,
    world::{World, MAP_HEIGHT, MAP_WIDTH},
};

pub const SPREAD_CHANCE: u8 = 64;
pub const BURN_CHANCE: u8 = 64;
pub const FIRE_DEPT_BASE_INFLUENCE: u16 = 64;
pub const FIRE_DEPT_INFLUENCE_MULTIPLIER: u16 = 5;
const NO_FIRE_DEPT: u8 = 0xff;

/// Distance to the nearest powered fire department, or 255.
pub fn nearest_fire_department(slot: usize, world: &World) -> u8 {
    let roster = world.buildings.as_slice();
    let building = &roster[slot];
    roster
        .iter()
        .filter(|other| other.kind == BuildingKind::FireDept && other.has_power)
        .map(|other| manhattan_distance(building, other))
        .fold(NO_FIRE_DEPT, u8::min)
}

/// Higher means weaker suppression; above 255 there is no suppression roll.
pub fn fire_department_influence(distance: u8) -> u16 {
    FIRE_DEPT_BASE_INFLUENCE + distance as u16 * FIRE_DEPT_INFLUENCE_MULTIPLIER
}

/// Sets one neighbour across a randomly chosen edge alight. Returns the slot
/// that caught fire, if any. Consumes one draw for the direction.
pub fn spread_fire(
    slot: usize,
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) -> Option<usize> {
    let building = *world.buildings.get(slot)?;
    let (x, y) = (building.x as i16, building.y as i16);
    let (w, h) = (building.width() as i16, building.height() as i16);
    let direction = rng.next_u16() & 3;

    // one tile past the adjacent ring on every side, west and north included
    let probes: Vec<(i16, i16)> = if direction & 1 != 0 {
        let column = if direction & 2 != 0 { x - 2 } else { x + w + 1 };
        (y..y + h).map(|row| (column, row)).collect()
    } else {
        let row = if direction & 2 != 0 { y - 2 } else { y + h + 1 };
        (x..x + w).map(|column| (column, row)).collect()
    };

    for (tx, ty) in probes {
        if tx < 0 || ty < 0 || tx >= MAP_WIDTH as i16 || ty >= MAP_HEIGHT as i16 {
            continue;
        }
        let Some(target) = world.buildings.slot_at(tx as u8, ty as u8) else {
            continue;
        };
        let Some(neighbour) = world.buildings.get_mut(target) else {
            continue;
        };
        if neighbour.on_fire > 0
            || neighbour.kind == BuildingKind::Park
            || neighbour.kind.is_rubble()
        {
            continue;
        }
        neighbour.on_fire = 1;
        neighbour.heavy_traffic = false;
        hooks.refresh_building(neighbour);
        return Some(target);
    }
    None
}

/// Spread roll shared by burning buildings and rubble.
fn roll_spread(
    slot: usize,
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) -> bool {
    if rng.next_byte() > SPREAD_CHANCE {
        return false;
    }
    spread_fire(slot, world, rng, hooks).is_some()
}

/// One pass for a burning standing building.
pub fn burn(
    slot: usize,
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) {
    let Some(building) = world.buildings.get(slot).copied() else {
        return;
    };
    let FireState::Burning(intensity) = building.fire_state() else {
        return;
    };

    let influence = fire_department_influence(nearest_fire_department(slot, world));
    let suppressed = influence <= 0xff && rng.next_byte() as u16 > influence;

    if suppressed {
        if let Some(target) = world.buildings.get_mut(slot) {
            target.on_fire = intensity - 1;
        }
    } else if !roll_spread(slot, world, rng, hooks) && rng.next_byte() < BURN_CHANCE {
        if intensity >= MAX_FIRE_INTENSITY {
            world
                .populations
                .apply_delta(building.kind, -(building.population_density as i16));
            if let Some(target) = world.buildings.get_mut(slot) {
                target.destroy();
                target.on_fire = MAX_FIRE_INTENSITY;
            }
            debug!(slot, kind = ?building.kind, x = building.x, y = building.y, "building burnt down");
        } else if let Some(target) = world.buildings.get_mut(slot) {
            target.on_fire = intensity + 1;
        }
    }

    if let Some(target) = world.buildings.get_mut(slot) {
        target.heavy_traffic = false;
    }
}

/// One pass for rubble: count down, clear at zero, and keep spreading embers.
pub fn decay_rubble(
    slot: usize,
    world: &mut World,
    rng: &mut dyn RandomSource,
    hooks: &mut dyn SimHooks,
) {
    let Some(building) = world.buildings.get(slot).copied() else {
        return;
    };
    let FireState::Rubble(countdown) = building.fire_state() else {
        return;
    };
    if countdown == 0 {
        if let Some(target) = world.buildings.get_mut(slot) {
            target.clear();
        }
        return;
    }
    if let Some(target) = world.buildings.get_mut(slot) {
        target.on_fire = countdown - 1;
        target.heavy_traffic = false;
    }
    roll_spread(slot, world, rng, hooks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hooks::NoopHooks, rng::testing::ScriptedRng};

    fn burning(world: &mut World, kind: BuildingKind, x: u8, y: u8, intensity: u8) -> usize {
        let slot = world.insert_building(kind, x, y).unwrap();
        world.buildings.get_mut(slot).unwrap().on_fire = intensity;
        slot
    }

    #[test]
    fn influence_grows_with_distance() {
        assert_eq!(fire_department_influence(0), FIRE_DEPT_BASE_INFLUENCE);
        assert_eq!(fire_department_influence(10), 114);
        assert!(fire_department_influence(NO_FIRE_DEPT) > 0xff);
    }

    #[test]
    fn nearest_department_must_be_powered() {
        let mut world = World::default();
        let slot = burning(&mut world, BuildingKind::Residential, 0, 0, 1);
        let dept = world.insert_building(BuildingKind::FireDept, 6, 0).unwrap();
        assert_eq!(nearest_fire_department(slot, &world), NO_FIRE_DEPT);
        world.buildings.get_mut(dept).unwrap().has_power = true;
        assert_eq!(nearest_fire_department(slot, &world), 6);
    }

    #[test]
    fn covered_fire_climbs_one_level_per_pass_until_destroyed() {
        let mut world = World::default();
        let slot = burning(&mut world, BuildingKind::Industrial, 10, 10, 1);
        // department sharing the origin puts the fire at distance 0
        let dept = world.buildings.first_free().unwrap();
        let station = world.buildings.get_mut(dept).unwrap();
        *station = crate::building::Building::new(BuildingKind::FireDept, 10, 10);
        station.has_power = true;
        world.buildings.get_mut(slot).unwrap().population_density = 5;
        world.populations.industrial = 5;

        // suppression 0x10 (not above 64), spread roll 0xff (skipped), burn 0x00
        for expected in 2..=MAX_FIRE_INTENSITY {
            let mut rng = ScriptedRng::new(&[0x10, 0xff, 0x00], 0);
            burn(slot, &mut world, &mut rng, &mut NoopHooks);
            assert_eq!(rng.consumed, 3);
            assert_eq!(world.building(slot).unwrap().on_fire, expected);
            assert_eq!(world.building(slot).unwrap().kind, BuildingKind::Industrial);
        }

        let mut rng = ScriptedRng::new(&[0x10, 0xff, 0x00], 0);
        burn(slot, &mut world, &mut rng, &mut NoopHooks);
        let ruin = world.building(slot).unwrap();
        assert_eq!(ruin.kind, BuildingKind::Rubble);
        assert_eq!(ruin.on_fire, MAX_FIRE_INTENSITY);
        assert_eq!(world.populations.industrial, 0);
    }

    #[test]
    fn fire_without_department_skips_suppression_draw() {
        let mut world = World::default();
        let slot = burning(&mut world, BuildingKind::Commercial, 0, 0, 2);
        let mut rng = ScriptedRng::new(&[0xff, 0xff], 0);
        burn(slot, &mut world, &mut rng, &mut NoopHooks);
        assert_eq!(rng.consumed, 2, "spread roll then burn roll");
        assert_eq!(world.building(slot).unwrap().on_fire, 2);
    }

    #[test]
    fn strong_suppression_roll_puts_fire_out() {
        let mut world = World::default();
        let slot = burning(&mut world, BuildingKind::Residential, 0, 0, 1);
        let dept = world.insert_building(BuildingKind::FireDept, 3, 0).unwrap();
        world.buildings.get_mut(dept).unwrap().has_power = true;
        let mut rng = ScriptedRng::new(&[0xff], 0);
        burn(slot, &mut world, &mut rng, &mut NoopHooks);
        assert_eq!(rng.consumed, 1);
        assert_eq!(world.building(slot).unwrap().fire_state(), FireState::Healthy(0));
    }

    #[test]
    fn spread_ignites_exactly_one_eligible_neighbour() {
        let mut world = World::default();
        let slot = burning(&mut world, BuildingKind::Residential, 10, 10, 1);
        let park = world.insert_building(BuildingKind::Park, 15, 10).unwrap();
        let east = world.insert_building(BuildingKind::Commercial, 14, 13).unwrap();
        let other = world.insert_building(BuildingKind::Commercial, 14, 16).unwrap();
        // direction 1: east column x = 10 + 3 + 1 = 14
        let mut rng = ScriptedRng::new(&[0b01], 0);
        let lit = spread_fire(slot, &mut world, &mut rng, &mut NoopHooks);
        assert_eq!(lit, None, "park footprint starts at x=15 and the column misses");

        world.buildings.get_mut(park).unwrap().clear();
        let neighbour = world.insert_building(BuildingKind::Park, 14, 10).unwrap();
        let mut rng = ScriptedRng::new(&[0b01], 0);
        assert_eq!(spread_fire(slot, &mut world, &mut rng, &mut NoopHooks), None);

        world.buildings.get_mut(neighbour).unwrap().clear();
        world.insert_building(BuildingKind::Industrial, 14, 10).unwrap();
        let mut rng = ScriptedRng::new(&[0b01], 0);
        let lit = spread_fire(slot, &mut world, &mut rng, &mut NoopHooks).unwrap();
        assert_eq!(world.building(lit).unwrap().kind, BuildingKind::Industrial);
        assert_eq!(world.building(lit).unwrap().on_fire, 1);
        assert_eq!(world.building(east).unwrap().on_fire, 0);
        assert_eq!(world.building(other).unwrap().on_fire, 0);
    }

    #[test]
    fn rubble_counts_down_then_clears() {
        let mut world = World::default();
        let slot = world.insert_building(BuildingKind::Residential, 0, 0).unwrap();
        {
            let b = world.buildings.get_mut(slot).unwrap();
            b.destroy();
            b.on_fire = MAX_FIRE_INTENSITY;
        }
        for expected in (0..MAX_FIRE_INTENSITY).rev() {
            let mut rng = ScriptedRng::new(&[], 0xff);
            decay_rubble(slot, &mut world, &mut rng, &mut NoopHooks);
            assert_eq!(world.building(slot).unwrap().fire_state(), FireState::Rubble(expected));
        }
        let mut rng = ScriptedRng::new(&[], 0xff);
        decay_rubble(slot, &mut world, &mut rng, &mut NoopHooks);
        assert_eq!(rng.consumed, 0);
        assert!(!world.building(slot).unwrap().exists());
    }

    #[test]
    fn rubble_embers_spread_on_low_roll() {
        let mut world = World::default();
        let slot = world.insert_building(BuildingKind::Residential, 10, 10).unwrap();
        {
            let b = world.buildings.get_mut(slot).unwrap();
            b.destroy();
            b.on_fire = 2;
        }
        let target = world.insert_building(BuildingKind::Commercial, 10, 14).unwrap();
        // spread roll 0, direction 0: south row y = 10 + 3 + 1 = 14
        let mut rng = ScriptedRng::new(&[0x00, 0b00], 0);
        decay_rubble(slot, &mut world, &mut rng, &mut NoopHooks);
        assert_eq!(world.building(target).unwrap().on_fire, 1);
        assert_eq!(world.building(slot).unwrap().on_fire, 1);
    }
}
