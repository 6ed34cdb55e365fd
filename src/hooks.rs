use crate::building::Building;

/// Callbacks into the presentation layer. The simulation never reads anything
/// back through them.
pub trait SimHooks {
    /// A building's visible state changed (density, fire, traffic or kind).
    fn refresh_building(&mut self, _building: &Building) {}

    /// Centre the view on a tile, e.g. where a disaster started.
    fn focus_tile(&mut self, _x: u8, _y: u8) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl SimHooks for NoopHooks {}

/// Records every callback; handy for hosts that batch redraws.
#[derive(Debug, Default, Clone)]
pub struct RecordingHooks {
    pub refreshed: Vec<(u8, u8)>,
    pub focused: Vec<(u8, u8)>,
}

impl SimHooks for RecordingHooks {
    fn refresh_building(&mut self, building: &Building) {
        self.refreshed.push((building.x, building.y));
    }

    fn focus_tile(&mut self, x: u8, y: u8) {
        self.focused.push((x, y));
    }
}
