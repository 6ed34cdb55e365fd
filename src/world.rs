use serde::Serialize;
use thiserror::Error;

use crate::{
    building::{Building, BuildingKind, HEAVY_TRAFFIC_THRESHOLD},
    power::PowerGrid,
    rng::SimRng,
};

pub const MAP_WIDTH: u8 = 48;
pub const MAP_HEIGHT: u8 = 48;
pub const MAX_BUILDINGS: usize = 130;

pub const STARTING_FUNDS: i32 = 10_000;
pub const STARTING_TAX_RATE: u8 = 7;
pub const STARTING_YEAR: u16 = 1900;
pub const MAX_TAX_RATE: u8 = 99;

pub const BULLDOZER_COST: i32 = 1;
pub const ROAD_COST: i32 = 10;
pub const POWERLINE_COST: i32 = 5;

pub const MIN_BUDGET_DISPLAY_TIME: u8 = 16;
pub const DISASTER_MESSAGE_DISPLAY_TIME: u8 = 255;

pub const ROAD_MASK: u8 = 0b01;
pub const POWERLINE_MASK: u8 = 0b10;

pub const FLAG_PAUSE: u8 = 0b0000_0001;
pub const FLAG_FAST: u8 = 0b0000_0010;
pub const FLAG_AUTO_BUDGET: u8 = 0b0100_0000;

/// Road and power line bits for every tile, packed four tiles per byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMap {
    bits: Vec<u8>,
}

impl ConnectionMap {
    pub const BYTES: usize = MAP_WIDTH as usize * MAP_HEIGHT as usize / 4;

    pub fn new() -> Self {
        Self {
            bits: vec![0; Self::BYTES],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == Self::BYTES).then(|| Self {
            bits: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    fn slot(x: u8, y: u8) -> Option<(usize, u8)> {
        if x >= MAP_WIDTH || y >= MAP_HEIGHT {
            return None;
        }
        let index = y as usize * MAP_WIDTH as usize + x as usize;
        Some((index / 4, ((index % 4) * 2) as u8))
    }

    /// Out-of-map tiles have no connections.
    pub fn get(&self, x: u8, y: u8) -> u8 {
        match Self::slot(x, y) {
            Some((byte, shift)) => (self.bits[byte] >> shift) & 0b11,
            None => 0,
        }
    }

    pub fn set(&mut self, x: u8, y: u8, mask: u8) {
        if let Some((byte, shift)) = Self::slot(x, y) {
            self.bits[byte] &= !(0b11 << shift);
            self.bits[byte] |= (mask & 0b11) << shift;
        }
    }

    pub fn has_road(&self, x: u8, y: u8) -> bool {
        self.get(x, y) & ROAD_MASK != 0
    }

    pub fn has_power_line(&self, x: u8, y: u8) -> bool {
        self.get(x, y) & POWERLINE_MASK != 0
    }

    pub fn road_tile_count(&self) -> u32 {
        let mut count = 0;
        for y in 0..MAP_HEIGHT {
            for x in 0..MAP_WIDTH {
                if self.has_road(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Number of road tiles touching the outside edge of a footprint.
    pub fn adjacent_road_count(&self, building: &Building) -> u8 {
        let (x, y) = (building.x as i16, building.y as i16);
        let (w, h) = (building.width() as i16, building.height() as i16);
        let mut count = 0;
        let mut probe = |tx: i16, ty: i16| {
            if tx >= 0 && ty >= 0 && self.has_road(tx as u8, ty as u8) {
                count += 1;
            }
        };
        for i in 0..w {
            probe(x + i, y - 1);
            probe(x + i, y + h);
        }
        for i in 0..h {
            probe(x - 1, y + i);
            probe(x + w, y + i);
        }
        count
    }
}

impl Default for ConnectionMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity building roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    slots: [Building; MAX_BUILDINGS],
}

impl Roster {
    pub fn new() -> Self {
        Self {
            slots: [Building::default(); MAX_BUILDINGS],
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Building> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Building> {
        self.slots.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.slots.iter()
    }

    pub fn as_slice(&self) -> &[Building] {
        &self.slots
    }

    pub fn as_mut_slice(&mut self) -> &mut [Building] {
        &mut self.slots
    }

    pub fn occupied(&self) -> impl Iterator<Item = &Building> {
        self.slots.iter().filter(|b| b.exists())
    }

    pub fn slot_at(&self, x: u8, y: u8) -> Option<usize> {
        self.slots.iter().position(|b| b.covers(x, y))
    }

    pub fn at(&self, x: u8, y: u8) -> Option<&Building> {
        self.slot_at(x, y).map(|slot| &self.slots[slot])
    }

    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|b| !b.exists())
    }

    pub fn count(&self, kind: BuildingKind) -> usize {
        self.slots.iter().filter(|b| b.kind == kind).count()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

/// Sector population counters, each the sum of densities of one zone kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Populations {
    pub residential: u16,
    pub commercial: u16,
    pub industrial: u16,
}

impl Populations {
    pub fn total(&self) -> u32 {
        self.residential as u32 + self.commercial as u32 + self.industrial as u32
    }

    pub fn counter_mut(&mut self, kind: BuildingKind) -> Option<&mut u16> {
        match kind {
            BuildingKind::Residential => Some(&mut self.residential),
            BuildingKind::Commercial => Some(&mut self.commercial),
            BuildingKind::Industrial => Some(&mut self.industrial),
            _ => None,
        }
    }

    pub fn apply_delta(&mut self, kind: BuildingKind, delta: i16) {
        if let Some(counter) = self.counter_mut(kind) {
            *counter = counter.saturating_add_signed(delta);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ledger {
    pub accumulated_tax: i32,
    pub taxes_collected: i32,
    pub police_budget: u8,
    pub fire_budget: u8,
    pub road_budget: u16,
}

/// Scenario index plus verdict bits, packed as `id << 2 | won << 1 | lost`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioStatus {
    pub id: u8,
    pub won: bool,
    pub lost: bool,
}

impl ScenarioStatus {
    pub fn to_byte(self) -> u8 {
        (self.id << 2) | ((self.won as u8) << 1) | self.lost as u8
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            id: byte >> 2,
            won: byte & 0b10 != 0,
            lost: byte & 0b01 != 0,
        }
    }

    pub fn decided(&self) -> bool {
        self.won || self.lost
    }
}

/// Interaction mode the simulation asks the host to present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[default]
    Running,
    DisasterNotice {
        remaining: u8,
    },
    BudgetReview {
        shown: u8,
    },
    ScenarioWon,
    ScenarioLost,
}

impl Mode {
    /// Blocking modes hold the simulation until acknowledged.
    pub fn blocks_simulation(&self) -> bool {
        matches!(
            self,
            Mode::BudgetReview { .. } | Mode::ScenarioWon | Mode::ScenarioLost
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0:?} cannot be placed")]
    NotPlaceable(BuildingKind),
    #[error("footprint at ({x}, {y}) leaves the map")]
    OutOfBounds { x: u8, y: u8 },
    #[error("footprint at ({x}, {y}) is obstructed")]
    Obstructed { x: u8, y: u8 },
    #[error("not enough funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i32, available: i32 },
    #[error("all {max} building slots are in use", max = MAX_BUILDINGS)]
    RosterFull,
    #[error("nothing to bulldoze at ({x}, {y})")]
    NothingToClear { x: u8, y: u8 },
    #[error("tax rate {0} exceeds {max}", max = MAX_TAX_RATE)]
    TaxRateOutOfRange(u8),
}

/// The whole mutable game state. Collaborators receive it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    pub year: u16,
    pub month: u8,
    pub flags: u8,
    pub cursor: u32,
    pub rng: SimRng,
    pub funds: i32,
    pub connections: ConnectionMap,
    pub terrain: u8,
    pub tax_rate: u8,
    pub populations: Populations,
    pub ledger: Ledger,
    pub disaster_countdown: u16,
    pub scenario: ScenarioStatus,
    pub mode: Mode,
    pub buildings: Roster,
}

impl World {
    pub fn new(rng: SimRng) -> Self {
        Self {
            year: STARTING_YEAR,
            month: 0,
            flags: FLAG_AUTO_BUDGET,
            cursor: 0,
            rng,
            funds: STARTING_FUNDS,
            connections: ConnectionMap::new(),
            terrain: 0,
            tax_rate: STARTING_TAX_RATE,
            populations: Populations::default(),
            ledger: Ledger::default(),
            disaster_countdown: u16::MAX,
            scenario: ScenarioStatus::default(),
            mode: Mode::Running,
            buildings: Roster::new(),
        }
    }

    pub fn paused(&self) -> bool {
        self.flags & FLAG_PAUSE != 0
    }

    pub fn fast(&self) -> bool {
        self.flags & FLAG_FAST != 0
    }

    pub fn auto_budget(&self) -> bool {
        self.flags & FLAG_AUTO_BUDGET != 0
    }

    pub fn set_paused(&mut self, on: bool) {
        self.set_flag(FLAG_PAUSE, on);
    }

    pub fn set_fast(&mut self, on: bool) {
        self.set_flag(FLAG_FAST, on);
    }

    pub fn set_auto_budget(&mut self, on: bool) {
        self.set_flag(FLAG_AUTO_BUDGET, on);
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    pub fn set_tax_rate(&mut self, rate: u8) -> Result<(), CommandError> {
        if rate > MAX_TAX_RATE {
            return Err(CommandError::TaxRateOutOfRange(rate));
        }
        self.tax_rate = rate;
        Ok(())
    }

    /// Dismisses the current screen. A budget review must stay up for a
    /// minimum number of ticks first.
    pub fn acknowledge(&mut self) -> bool {
        match self.mode {
            Mode::Running => false,
            Mode::BudgetReview { shown } if shown < MIN_BUDGET_DISPLAY_TIME => false,
            _ => {
                self.mode = Mode::Running;
                true
            }
        }
    }

    pub fn building(&self, slot: usize) -> Option<&Building> {
        self.buildings.get(slot)
    }

    pub fn building_at(&self, x: u8, y: u8) -> Option<&Building> {
        self.buildings.at(x, y)
    }

    pub fn total_population(&self) -> u32 {
        self.populations.total()
    }

    /// Places a building without charging for it, clearing rubble under the
    /// footprint. Used by loaders and by [`World::place_building`].
    pub fn insert_building(
        &mut self,
        kind: BuildingKind,
        x: u8,
        y: u8,
    ) -> Result<usize, CommandError> {
        if kind == BuildingKind::None || kind.is_rubble() {
            return Err(CommandError::NotPlaceable(kind));
        }
        let info = kind.info();
        if x as u16 + info.width as u16 > MAP_WIDTH as u16
            || y as u16 + info.height as u16 > MAP_HEIGHT as u16
        {
            return Err(CommandError::OutOfBounds { x, y });
        }

        let mut rubble_slots = Vec::new();
        for ty in y..y + info.height {
            for tx in x..x + info.width {
                if self.connections.get(tx, ty) != 0 {
                    return Err(CommandError::Obstructed { x: tx, y: ty });
                }
                if let Some(slot) = self.buildings.slot_at(tx, ty) {
                    if !self.buildings.slots[slot].kind.is_rubble() {
                        return Err(CommandError::Obstructed { x: tx, y: ty });
                    }
                    if !rubble_slots.contains(&slot) {
                        rubble_slots.push(slot);
                    }
                }
            }
        }

        let free = rubble_slots
            .first()
            .copied()
            .or_else(|| self.buildings.first_free())
            .ok_or(CommandError::RosterFull)?;
        for slot in rubble_slots {
            self.buildings.slots[slot].clear();
        }
        self.buildings.slots[free] = Building::new(kind, x, y);
        Ok(free)
    }

    /// Player placement: charges the building cost.
    pub fn place_building(
        &mut self,
        kind: BuildingKind,
        x: u8,
        y: u8,
    ) -> Result<usize, CommandError> {
        let cost = kind.info().cost as i32;
        if self.funds < cost {
            return Err(CommandError::InsufficientFunds {
                needed: cost,
                available: self.funds,
            });
        }
        let slot = self.insert_building(kind, x, y)?;
        self.funds -= cost;
        Ok(slot)
    }

    /// Demolishes the building under a tile (leaving rubble), or clears a
    /// road/power line on an empty tile.
    pub fn bulldoze(&mut self, x: u8, y: u8) -> Result<(), CommandError> {
        if let Some(slot) = self.buildings.slot_at(x, y) {
            let building = self.buildings.slots[slot];
            if !building.kind.is_rubble() {
                let cost = building.width() as i32 * building.height() as i32 * BULLDOZER_COST;
                self.charge(cost)?;
                self.populations
                    .apply_delta(building.kind, -(building.population_density as i16));
                let target = &mut self.buildings.slots[slot];
                target.destroy();
                target.on_fire = 0;
                return Ok(());
            }
        }
        if self.connections.get(x, y) != 0 {
            self.charge(BULLDOZER_COST)?;
            self.connections.set(x, y, 0);
            return Ok(());
        }
        Err(CommandError::NothingToClear { x, y })
    }

    pub fn lay_road(&mut self, x: u8, y: u8) -> Result<(), CommandError> {
        self.lay_connection(x, y, ROAD_MASK, ROAD_COST)
    }

    pub fn lay_power_line(&mut self, x: u8, y: u8) -> Result<(), CommandError> {
        self.lay_connection(x, y, POWERLINE_MASK, POWERLINE_COST)
    }

    fn lay_connection(&mut self, x: u8, y: u8, mask: u8, cost: i32) -> Result<(), CommandError> {
        if x >= MAP_WIDTH || y >= MAP_HEIGHT {
            return Err(CommandError::OutOfBounds { x, y });
        }
        let rubble = match self.buildings.slot_at(x, y) {
            Some(slot) if !self.buildings.slots[slot].kind.is_rubble() => {
                return Err(CommandError::Obstructed { x, y });
            }
            other => other,
        };
        let current = self.connections.get(x, y);
        if current & mask != 0 {
            return Ok(());
        }
        self.charge(cost)?;
        self.connections.set(x, y, current | mask);
        if let Some(slot) = rubble {
            self.buildings.slots[slot].clear();
        }
        Ok(())
    }

    fn charge(&mut self, cost: i32) -> Result<(), CommandError> {
        if self.funds < cost {
            return Err(CommandError::InsufficientFunds {
                needed: cost,
                available: self.funds,
            });
        }
        self.funds -= cost;
        Ok(())
    }

    /// Recomputes state that is never persisted: power, then heavy traffic.
    pub fn refresh_derived(&mut self, power: &mut dyn PowerGrid) {
        power.recompute(&self.connections, self.buildings.as_mut_slice());
        for building in self.buildings.as_mut_slice() {
            building.heavy_traffic = building.exists()
                && building.on_fire == 0
                && building.has_power
                && building.population_density > HEAVY_TRAFFIC_THRESHOLD;
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimRng::default())
    }
}
