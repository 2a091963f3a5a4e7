//! Production buildings.

use crate::economy::{Cost, ResourceKind};
use crate::map::Terrain;
use serde::{Deserialize, Serialize};

/// Every building kind in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    Lumbercamp,
    StoneQuarry,
    GoldMine,
}

/// Static stats of one building kind.
#[derive(Debug, Clone)]
pub struct BuildingDef {
    pub id: u8,
    pub name: &'static str,
    pub cost: Cost,
    pub allowed_terrains: &'static [Terrain],
    /// Additive production bonus this building grants its owner.
    pub production_bonus: (ResourceKind, u32),
}

static LUMBERCAMP: BuildingDef = BuildingDef {
    id: 1,
    name: "Lumbercamp",
    cost: Cost::resources(50, 10, 10),
    allowed_terrains: &[Terrain::Forest],
    production_bonus: (ResourceKind::Wood, 1),
};

static STONE_QUARRY: BuildingDef = BuildingDef {
    id: 2,
    name: "Stone Quarry",
    cost: Cost::resources(10, 50, 10),
    allowed_terrains: &[Terrain::Rocky],
    production_bonus: (ResourceKind::Stone, 1),
};

static GOLD_MINE: BuildingDef = BuildingDef {
    id: 3,
    name: "Gold Mine",
    cost: Cost::resources(10, 10, 50),
    allowed_terrains: &[Terrain::Dirt],
    production_bonus: (ResourceKind::Gold, 1),
};

impl BuildingKind {
    pub const ALL: [BuildingKind; 3] = [
        BuildingKind::Lumbercamp,
        BuildingKind::StoneQuarry,
        BuildingKind::GoldMine,
    ];

    pub fn def(self) -> &'static BuildingDef {
        match self {
            BuildingKind::Lumbercamp => &LUMBERCAMP,
            BuildingKind::StoneQuarry => &STONE_QUARRY,
            BuildingKind::GoldMine => &GOLD_MINE,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.def().id == id)
    }

    pub fn can_build_on(self, terrain: Terrain) -> bool {
        self.def().allowed_terrains.contains(&terrain)
    }
}
