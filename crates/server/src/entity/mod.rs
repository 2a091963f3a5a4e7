//! Game entities.
//!
//! Creeps, towers, and buildings are all data-driven: one generic behavior
//! per entity class, parameterized by a static definition value object.

mod building;
mod creep;
mod tower;

pub use building::{BuildingDef, BuildingKind};
pub use creep::{Creep, CreepDef, CreepKind, HealerAura, SPEED_MULTIPLIER};
pub use tower::{Tower, TowerDef, TowerKind};
