//! Compact saved-city codec.
//!
//! A fixed big-endian scalar block is followed by the roster as a run of
//! 16-bit records sorted by raster index, each storing its offset from the
//! previous building. Offsets that do not fit in six bits are preceded by an
//! absolute escape record. `0xFFFF` ends the list.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::{
    building::{Building, BuildingKind},
    power::PowerGrid,
    rng::SimRng,
    world::{
        ConnectionMap, Ledger, Mode, Populations, Roster, ScenarioStatus, World, MAP_HEIGHT,
        MAP_WIDTH, MAX_BUILDINGS, MAX_TAX_RATE,
    },
};

pub const MAGIC: &[u8; 4] = b"CTY3";
pub const END_OF_BUILDINGS: u16 = 0xFFFF;
const MAX_OFFSET: u16 = 0x3F;
const MAX_CURSOR: u32 = 360;
const MONTHS_PER_YEAR: u8 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error("not a saved city")]
    BadMagic,
    #[error("save data ends early (need {needed} more bytes)")]
    Truncated { needed: usize },
    #[error("unknown building kind tag {0}")]
    UnknownKind(u8),
    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: u32 },
    #[error("save lists more than {max} buildings", max = MAX_BUILDINGS)]
    TooManyBuildings,
}

fn need(buf: &impl Buf, bytes: usize) -> Result<(), SaveError> {
    if buf.remaining() < bytes {
        return Err(SaveError::Truncated {
            needed: bytes - buf.remaining(),
        });
    }
    Ok(())
}

fn record(kind: u8, high: u8, low: u16) -> u16 {
    ((kind as u16 & 0xF) << 12) | ((high as u16 & 0xF) << 8) | (low & 0xFF)
}

pub fn encode(world: &World) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(640);
    out.put_slice(MAGIC);
    out.put_u16(world.year);
    out.put_u8(world.month);
    out.put_u8(world.flags);
    out.put_u32(world.cursor);
    out.put_u32(world.rng.state() as u32);
    out.put_i32(world.funds);
    out.put_slice(world.connections.as_bytes());
    out.put_u8(world.terrain);
    out.put_u8(world.tax_rate);
    out.put_u16(world.populations.residential);
    out.put_u16(world.populations.commercial);
    out.put_u16(world.populations.industrial);
    out.put_i32(world.ledger.accumulated_tax);
    out.put_i32(world.ledger.taxes_collected);
    out.put_u8(world.ledger.police_budget);
    out.put_u8(world.ledger.fire_budget);
    out.put_u16(world.ledger.road_budget);
    out.put_u16(world.disaster_countdown);
    out.put_u8(world.scenario.to_byte());

    let mut buildings: Vec<&Building> = world.buildings.occupied().collect();
    buildings.sort_by_key(|building| building.raster_index(MAP_WIDTH));
    let mut previous = 0u16;
    for building in buildings {
        let index = building.raster_index(MAP_WIDTH);
        let mut offset = index - previous;
        if offset > MAX_OFFSET {
            let escape = ((building.x as u16 & 0x3F) << 6) | (building.y as u16 & 0x3F);
            out.put_u16(escape);
            offset = 0;
        }
        let low = ((building.on_fire as u16 & 0b11) << 6) | offset;
        out.put_u16(record(
            building.kind.tag(),
            building.population_density,
            low,
        ));
        previous = index;
    }
    out.put_u16(END_OF_BUILDINGS);
    out.to_vec()
}

/// Decodes a saved city. Power and traffic are left cleared; use [`load`] to
/// recompute them.
pub fn decode(bytes: &[u8]) -> Result<World, SaveError> {
    let mut buf = bytes;
    need(&buf, MAGIC.len())?;
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(SaveError::BadMagic);
    }
    buf.advance(MAGIC.len());

    need(&buf, 16)?;
    let year = buf.get_u16();
    let month = buf.get_u8();
    let flags = buf.get_u8();
    let cursor = buf.get_u32();
    let rng_state = buf.get_u32();
    let funds = buf.get_i32();
    if month >= MONTHS_PER_YEAR {
        return Err(SaveError::OutOfRange { field: "month", value: month as u32 });
    }
    if cursor > MAX_CURSOR {
        return Err(SaveError::OutOfRange { field: "cursor", value: cursor });
    }
    if rng_state > u16::MAX as u32 {
        return Err(SaveError::OutOfRange { field: "rng state", value: rng_state });
    }

    need(&buf, ConnectionMap::BYTES)?;
    let connections = ConnectionMap::from_bytes(&buf[..ConnectionMap::BYTES]).ok_or(
        SaveError::Truncated {
            needed: ConnectionMap::BYTES,
        },
    )?;
    buf.advance(ConnectionMap::BYTES);

    need(&buf, 23)?;
    let terrain = buf.get_u8();
    let tax_rate = buf.get_u8();
    if tax_rate > MAX_TAX_RATE {
        return Err(SaveError::OutOfRange { field: "tax rate", value: tax_rate as u32 });
    }
    let populations = Populations {
        residential: buf.get_u16(),
        commercial: buf.get_u16(),
        industrial: buf.get_u16(),
    };
    let ledger = Ledger {
        accumulated_tax: buf.get_i32(),
        taxes_collected: buf.get_i32(),
        police_budget: buf.get_u8(),
        fire_budget: buf.get_u8(),
        road_budget: buf.get_u16(),
    };
    let disaster_countdown = buf.get_u16();
    let scenario = ScenarioStatus::from_byte(buf.get_u8());

    let buildings = decode_buildings(&mut buf)?;

    Ok(World {
        year,
        month,
        flags,
        cursor,
        rng: SimRng::new(rng_state as u16),
        funds,
        connections,
        terrain,
        tax_rate,
        populations,
        ledger,
        disaster_countdown,
        scenario,
        mode: Mode::Running,
        buildings,
    })
}

fn decode_buildings(buf: &mut &[u8]) -> Result<Roster, SaveError> {
    let mut roster = Roster::new();
    let mut slot = 0;
    let (mut x, mut y) = (0u16, 0u16);
    loop {
        need(buf, 2)?;
        let word = buf.get_u16();
        if word == END_OF_BUILDINGS {
            break;
        }
        let tag = (word >> 12) as u8;
        if tag == BuildingKind::None.tag() {
            x = (word >> 6) & 0x3F;
            y = word & 0x3F;
            continue;
        }
        let kind = BuildingKind::from_tag(tag).ok_or(SaveError::UnknownKind(tag))?;

        x += word & MAX_OFFSET;
        while x >= MAP_WIDTH as u16 {
            x -= MAP_WIDTH as u16;
            y += 1;
        }
        let info = kind.info();
        if x + info.width as u16 > MAP_WIDTH as u16 {
            return Err(SaveError::OutOfRange { field: "building x", value: x as u32 });
        }
        if y + info.height as u16 > MAP_HEIGHT as u16 {
            return Err(SaveError::OutOfRange { field: "building y", value: y as u32 });
        }

        let target = roster
            .get_mut(slot)
            .ok_or(SaveError::TooManyBuildings)?;
        *target = Building {
            kind,
            x: x as u8,
            y: y as u8,
            population_density: ((word >> 8) & 0xF) as u8,
            on_fire: ((word >> 6) & 0b11) as u8,
            has_power: false,
            heavy_traffic: false,
        };
        slot += 1;
    }
    Ok(roster)
}

/// Decodes a saved city and recomputes power and heavy traffic.
pub fn load(bytes: &[u8], power: &mut dyn PowerGrid) -> Result<World, SaveError> {
    let mut world = decode(bytes)?;
    world.refresh_derived(power);
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{power::FloodFillPower, world::ROAD_MASK};

    const HEADER_LEN: usize = 4 + 16 + ConnectionMap::BYTES + 23;

    fn sample_city() -> World {
        let mut world = World::new(SimRng::new(0x1234));
        world.year = 1937;
        world.month = 4;
        world.cursor = 77;
        world.funds = -250;
        world.tax_rate = 11;
        world.disaster_countdown = 4321;
        world.scenario = ScenarioStatus { id: 7, won: false, lost: true };
        world.ledger.accumulated_tax = 91;
        world.ledger.road_budget = 3;
        for x in 0..MAP_WIDTH {
            world.connections.set(x, 20, ROAD_MASK);
        }
        let plant = world.insert_building(BuildingKind::Powerplant, 0, 0).unwrap();
        let home = world.insert_building(BuildingKind::Residential, 4, 0).unwrap();
        let far = world.insert_building(BuildingKind::Industrial, 40, 40).unwrap();
        let ruin = world.insert_building(BuildingKind::Stadium, 10, 30).unwrap();
        world.buildings.get_mut(home).unwrap().population_density = 14;
        world.buildings.get_mut(far).unwrap().population_density = 5;
        world.buildings.get_mut(far).unwrap().on_fire = 2;
        world.buildings.get_mut(ruin).unwrap().destroy();
        world.buildings.get_mut(ruin).unwrap().on_fire = 3;
        world.populations.residential = 14;
        world.populations.industrial = 5;
        assert_eq!(plant, 0);
        world
    }

    #[test]
    fn city_survives_a_round_trip() {
        let world = sample_city();
        let bytes = encode(&world);
        let restored = decode(&bytes).unwrap();

        assert_eq!(restored.year, 1937);
        assert_eq!(restored.rng, world.rng);
        assert_eq!(restored.scenario, world.scenario);
        assert_eq!(restored.connections, world.connections);
        assert_eq!(restored.ledger, world.ledger);

        let mut original: Vec<Building> = world.buildings.occupied().copied().collect();
        original.sort_by_key(|b| b.raster_index(MAP_WIDTH));
        let decoded: Vec<Building> = restored.buildings.occupied().copied().collect();
        assert_eq!(decoded, original);

        // a second pass is byte-identical
        assert_eq!(encode(&restored), bytes);
    }

    #[test]
    fn distant_buildings_use_escape_records() {
        let mut world = World::default();
        world.insert_building(BuildingKind::Park, 0, 0).unwrap();
        world.insert_building(BuildingKind::Park, 3, 0).unwrap();
        world.insert_building(BuildingKind::Park, 1, 10).unwrap();
        let bytes = encode(&world);
        let records: Vec<u16> = bytes[HEADER_LEN..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let park = BuildingKind::Park.tag() as u16;
        assert_eq!(
            records,
            vec![park << 12, (park << 12) | 3, (1 << 6) | 10, park << 12, END_OF_BUILDINGS]
        );
    }

    #[test]
    fn empty_roster_is_just_the_sentinel() {
        let bytes = encode(&World::default());
        assert_eq!(bytes.len(), HEADER_LEN + 2);
        assert_eq!(&bytes[HEADER_LEN..], &END_OF_BUILDINGS.to_be_bytes());
        assert!(decode(&bytes).unwrap().buildings.occupied().next().is_none());
    }

    #[test]
    fn load_recomputes_power_and_traffic() {
        let world = sample_city();
        let restored = load(&encode(&world), &mut FloodFillPower::new()).unwrap();
        let home = restored.building_at(4, 0).unwrap();
        assert!(home.has_power);
        assert!(home.heavy_traffic);
        assert!(!restored.building_at(40, 40).unwrap().has_power);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(decode(b"CTY2").unwrap_err(), SaveError::BadMagic);
        assert!(matches!(decode(b"CTY3\x07"), Err(SaveError::Truncated { .. })));

        let mut bytes = encode(&World::default());
        bytes.truncate(HEADER_LEN);
        bytes.extend_from_slice(&0xB000u16.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap_err(), SaveError::UnknownKind(11));

        bytes.truncate(HEADER_LEN);
        assert!(matches!(decode(&bytes), Err(SaveError::Truncated { .. })));
    }

    #[test]
    fn oversized_roster_is_rejected() {
        let mut bytes = encode(&World::default());
        bytes.truncate(HEADER_LEN);
        let park = (BuildingKind::Park.tag() as u16) << 12;
        for i in 0..=MAX_BUILDINGS as u16 {
            let (x, y) = ((i % 15) * 3, (i / 15) * 3);
            bytes.extend_from_slice(&((x << 6) | y).to_be_bytes());
            bytes.extend_from_slice(&park.to_be_bytes());
        }
        bytes.extend_from_slice(&END_OF_BUILDINGS.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap_err(), SaveError::TooManyBuildings);
    }
}
