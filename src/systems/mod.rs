pub mod budget;
mod buildings;
mod calendar;
pub mod disaster;
pub mod evaluation;
pub mod fire;
pub mod growth;
pub mod population;
mod power;

pub use buildings::BuildingSystem;
pub use calendar::CalendarSystem;
pub use disaster::DisasterSystem;
pub use population::PopulationSystem;
pub use power::PowerSystem;
