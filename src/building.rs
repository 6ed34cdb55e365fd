use serde::{Deserialize, Serialize};

pub const MAX_POPULATION_DENSITY: u8 = 15;
pub const MAX_FIRE_INTENSITY: u8 = 3;
pub const HEAVY_TRAFFIC_THRESHOLD: u8 = 12;

const FIRST_BUILDING_TILE: u8 = 128;
const RUBBLE_TILE: u8 = 51;

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    #[default]
    None,
    Residential,
    Commercial,
    Industrial,
    Powerplant,
    Park,
    PoliceDept,
    FireDept,
    Stadium,
    Rubble,
    RubbleLarge,
}

/// Static per-kind metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingInfo {
    pub width: u8,
    pub height: u8,
    pub cost: u16,
    pub draw_tile: u8,
}

const BUILDING_INFO: [BuildingInfo; 11] = [
    // None
    BuildingInfo { width: 0, height: 0, cost: 0, draw_tile: 0 },
    // Residential
    BuildingInfo { width: 3, height: 3, cost: 100, draw_tile: FIRST_BUILDING_TILE },
    // Commercial
    BuildingInfo { width: 3, height: 3, cost: 100, draw_tile: FIRST_BUILDING_TILE + 3 },
    // Industrial
    BuildingInfo { width: 3, height: 3, cost: 100, draw_tile: FIRST_BUILDING_TILE + 6 },
    // Powerplant
    BuildingInfo { width: 4, height: 4, cost: 3000, draw_tile: FIRST_BUILDING_TILE + 9 },
    // Park
    BuildingInfo { width: 3, height: 3, cost: 50, draw_tile: FIRST_BUILDING_TILE + 64 },
    // PoliceDept
    BuildingInfo { width: 3, height: 3, cost: 500, draw_tile: FIRST_BUILDING_TILE + 67 },
    // FireDept
    BuildingInfo { width: 3, height: 3, cost: 500, draw_tile: FIRST_BUILDING_TILE + 70 },
    // Stadium
    BuildingInfo { width: 4, height: 4, cost: 3000, draw_tile: FIRST_BUILDING_TILE + 73 },
    // Rubble
    BuildingInfo { width: 3, height: 3, cost: 0, draw_tile: RUBBLE_TILE },
    // RubbleLarge
    BuildingInfo { width: 4, height: 4, cost: 0, draw_tile: RUBBLE_TILE },
];

impl BuildingKind {
    pub const ALL: [BuildingKind; 11] = [
        BuildingKind::None,
        BuildingKind::Residential,
        BuildingKind::Commercial,
        BuildingKind::Industrial,
        BuildingKind::Powerplant,
        BuildingKind::Park,
        BuildingKind::PoliceDept,
        BuildingKind::FireDept,
        BuildingKind::Stadium,
        BuildingKind::Rubble,
        BuildingKind::RubbleLarge,
    ];

    /// 4-bit tag used by the save format.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn info(self) -> &'static BuildingInfo {
        &BUILDING_INFO[self as usize]
    }

    pub fn is_rubble(self) -> bool {
        matches!(self, BuildingKind::Rubble | BuildingKind::RubbleLarge)
    }

    /// Residential, commercial and industrial lots grow and shrink.
    pub fn is_zone(self) -> bool {
        matches!(
            self,
            BuildingKind::Residential | BuildingKind::Commercial | BuildingKind::Industrial
        )
    }

    /// The rubble left behind when a building of this kind is destroyed.
    pub fn rubble(self) -> BuildingKind {
        if self.info().width > 3 || self.info().height > 3 {
            BuildingKind::RubbleLarge
        } else {
            BuildingKind::Rubble
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Healthy(u8),
    Burning(u8),
    Rubble(u8),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub x: u8,
    pub y: u8,
    pub population_density: u8,
    pub on_fire: u8,
    pub has_power: bool,
    pub heavy_traffic: bool,
}

impl Building {
    pub fn new(kind: BuildingKind, x: u8, y: u8) -> Self {
        Self {
            kind,
            x,
            y,
            ..Self::default()
        }
    }

    pub fn exists(&self) -> bool {
        self.kind != BuildingKind::None
    }

    pub fn width(&self) -> u8 {
        self.kind.info().width
    }

    pub fn height(&self) -> u8 {
        self.kind.info().height
    }

    pub fn fire_state(&self) -> FireState {
        if self.kind.is_rubble() {
            FireState::Rubble(self.on_fire)
        } else if self.on_fire > 0 {
            FireState::Burning(self.on_fire)
        } else {
            FireState::Healthy(self.population_density)
        }
    }

    pub fn covers(&self, x: u8, y: u8) -> bool {
        self.exists()
            && x >= self.x
            && y >= self.y
            && (x as u16) < self.x as u16 + self.width() as u16
            && (y as u16) < self.y as u16 + self.height() as u16
    }

    /// Turns the building into rubble of the same footprint. The fire counter
    /// is left to the caller.
    pub fn destroy(&mut self) {
        if !self.exists() || self.kind.is_rubble() {
            return;
        }
        self.kind = self.kind.rubble();
        self.population_density = 0;
        self.has_power = false;
        self.heavy_traffic = false;
    }

    pub fn clear(&mut self) {
        *self = Building::default();
    }

    /// Raster index of the footprint origin on a map `map_width` tiles wide.
    pub fn raster_index(&self, map_width: u8) -> u16 {
        self.y as u16 * map_width as u16 + self.x as u16
    }
}

/// Manhattan distance between footprint origins, saturating at 255.
pub fn manhattan_distance(a: &Building, b: &Building) -> u8 {
    let dx = (a.x as i16 - b.x as i16).unsigned_abs();
    let dy = (a.y as i16 - b.y as i16).unsigned_abs();
    (dx + dy).min(u8::MAX as u16) as u8
}
