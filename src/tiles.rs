//! Visual variation helpers for renderers.
//!
//! Nothing here draws from [`crate::rng::SimRng`]; the positional hash only
//! decides which sub-tiles of a footprint look busy or on fire.

use crate::building::{Building, MAX_POPULATION_DENSITY};

const FIRE_MAP: [u8; 16] = [1, 2, 3, 1, 2, 3, 1, 3, 1, 2, 3, 2, 2, 1, 3, 1];
const POPULACE_MAP: [u8; 16] = [1, 13, 5, 11, 7, 14, 3, 4, 1, 6, 12, 2, 10, 9, 11, 8];

/// Stable per-tile hash.
pub fn tile_hash(x: u8, y: u8) -> u8 {
    ((y as u32 * 359) ^ (x as u32 * 431)) as u8
}

fn footprint_index(building: &Building, dx: u8, dy: u8) -> usize {
    let local = dy as usize * building.width() as usize + dx as usize;
    (local + tile_hash(building.x, building.y) as usize) & 0xf
}

fn is_zone_centre(building: &Building, dx: u8, dy: u8) -> bool {
    building.kind.is_zone() && dx == 1 && dy == 1
}

/// Whether the sub-tile `(dx, dy)` of a burning footprint shows flames.
/// Zone centre tiles never burn visually so the lot type stays readable.
pub fn shows_flame(building: &Building, dx: u8, dy: u8) -> bool {
    if building.on_fire == 0 || is_zone_centre(building, dx, dy) {
        return false;
    }
    building.on_fire >= FIRE_MAP[footprint_index(building, dx, dy)]
}

/// Whether the sub-tile `(dx, dy)` of a zone shows a structure at the
/// building's current density.
pub fn shows_structure(building: &Building, dx: u8, dy: u8) -> bool {
    if !building.kind.is_zone() {
        return false;
    }
    if building.population_density >= MAX_POPULATION_DENSITY - 1 {
        return true;
    }
    if is_zone_centre(building, dx, dy) {
        return false;
    }
    building.population_density >= POPULACE_MAP[footprint_index(building, dx, dy)]
}
