//! Power connectivity collaborator.
//!
//! The engine only asks for `has_power` to be refreshed once per month at the
//! power phase; how the network is solved is up to the implementation.

use std::collections::VecDeque;

use crate::{
    building::{Building, BuildingKind},
    world::{ConnectionMap, MAP_HEIGHT, MAP_WIDTH},
};

pub trait PowerGrid {
    fn recompute(&mut self, connections: &ConnectionMap, buildings: &mut [Building]);
}

/// Leaves `has_power` as the host set it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrozenPower;

impl PowerGrid for FrozenPower {
    fn recompute(&mut self, _connections: &ConnectionMap, _buildings: &mut [Building]) {}
}

/// Breadth-first fill from every power plant footprint through power lines
/// and standing building footprints.
#[derive(Debug, Default, Clone)]
pub struct FloodFillPower {
    visited: Vec<bool>,
    owner: Vec<Option<usize>>,
}

impl FloodFillPower {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(x: u8, y: u8) -> usize {
        y as usize * MAP_WIDTH as usize + x as usize
    }
}

impl PowerGrid for FloodFillPower {
    fn recompute(&mut self, connections: &ConnectionMap, buildings: &mut [Building]) {
        let tiles = MAP_WIDTH as usize * MAP_HEIGHT as usize;
        self.visited.clear();
        self.visited.resize(tiles, false);
        self.owner.clear();
        self.owner.resize(tiles, None);

        let mut queue = VecDeque::new();
        for (slot, building) in buildings.iter().enumerate() {
            if !building.exists() || building.kind.is_rubble() {
                continue;
            }
            for ty in building.y..building.y.saturating_add(building.height()) {
                for tx in building.x..building.x.saturating_add(building.width()) {
                    if tx < MAP_WIDTH && ty < MAP_HEIGHT {
                        self.owner[Self::index(tx, ty)] = Some(slot);
                        if building.kind == BuildingKind::Powerplant {
                            self.visited[Self::index(tx, ty)] = true;
                            queue.push_back((tx, ty));
                        }
                    }
                }
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            let neighbours = [
                (x.checked_sub(1), Some(y)),
                (x.checked_add(1), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), y.checked_add(1)),
            ];
            for (nx, ny) in neighbours {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                if nx >= MAP_WIDTH || ny >= MAP_HEIGHT {
                    continue;
                }
                let index = Self::index(nx, ny);
                if self.visited[index] {
                    continue;
                }
                if connections.has_power_line(nx, ny) || self.owner[index].is_some() {
                    self.visited[index] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        for building in buildings.iter_mut() {
            building.has_power = false;
        }
        for (index, visited) in self.visited.iter().enumerate() {
            if !*visited {
                continue;
            }
            if let Some(slot) = self.owner[index] {
                buildings[slot].has_power = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Roster, POWERLINE_MASK};

    #[test]
    fn power_flows_through_lines_and_touching_buildings() {
        let mut roster = Roster::new();
        let slots = roster.as_mut_slice();
        slots[0] = Building::new(BuildingKind::Powerplant, 0, 0);
        slots[1] = Building::new(BuildingKind::Residential, 6, 0);
        slots[2] = Building::new(BuildingKind::Commercial, 9, 0);
        slots[3] = Building::new(BuildingKind::Industrial, 20, 20);
        let mut connections = ConnectionMap::new();
        connections.set(4, 0, POWERLINE_MASK);
        connections.set(5, 0, POWERLINE_MASK);

        FloodFillPower::new().recompute(&connections, slots);

        assert!(slots[0].has_power);
        assert!(slots[1].has_power);
        assert!(slots[2].has_power, "adjacent footprints conduct");
        assert!(!slots[3].has_power);
    }

    #[test]
    fn rubble_does_not_conduct() {
        let mut roster = Roster::new();
        let slots = roster.as_mut_slice();
        slots[0] = Building::new(BuildingKind::Powerplant, 0, 0);
        slots[1] = Building::new(BuildingKind::Rubble, 4, 0);
        slots[2] = Building::new(BuildingKind::Residential, 7, 0);

        FloodFillPower::new().recompute(&ConnectionMap::new(), slots);

        assert!(!slots[1].has_power);
        assert!(!slots[2].has_power);
    }

    #[test]
    fn frozen_power_keeps_host_values() {
        let mut roster = Roster::new();
        let slots = roster.as_mut_slice();
        slots[0] = Building::new(BuildingKind::Residential, 0, 0);
        slots[0].has_power = true;
        FrozenPower.recompute(&ConnectionMap::new(), slots);
        assert!(slots[0].has_power);
    }
}
