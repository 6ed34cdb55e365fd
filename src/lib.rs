pub mod building;
pub mod engine;
pub mod hooks;
pub mod power;
pub mod rng;
pub mod save;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod tiles;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, TickOutcome};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
