//! Terrain model and the combined arena.
//!
//! A match arena is built once: the canonical level is stamped with the
//! generated road plan and then cloned horizontally, one section per player,
//! so every player fights on identical ground.

pub mod path;
pub mod roads;

use crate::entity::BuildingKind;
use crate::level::Level;
use glam::UVec2;
use protocol::{StructureInfo, TileInfo};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use path::compute_paths;
pub use roads::{RoadGenerator, RoadPlan};

/// Terrain classification of a tile. Fixed at level load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Grass,
    Dirt,
    Forest,
    WaterShallow,
    WaterDeep,
    Rocky,
    Castle,
    Spawner,
}

impl Terrain {
    /// Stable numeric id used on the wire.
    pub fn id(self) -> u8 {
        match self {
            Terrain::Grass => 1,
            Terrain::Dirt => 2,
            Terrain::Forest => 3,
            Terrain::WaterShallow => 4,
            Terrain::WaterDeep => 5,
            Terrain::Rocky => 6,
            Terrain::Castle => 7,
            Terrain::Spawner => 8,
        }
    }

    /// Level file character mapping; unknown characters read as grass.
    pub fn from_char(c: char) -> Self {
        match c {
            'G' => Terrain::Grass,
            'D' => Terrain::Dirt,
            'F' => Terrain::Forest,
            'W' => Terrain::WaterShallow,
            'w' => Terrain::WaterDeep,
            'R' => Terrain::Rocky,
            'C' => Terrain::Castle,
            'S' => Terrain::Spawner,
            _ => Terrain::Grass,
        }
    }

    pub fn is_water(self) -> bool {
        matches!(self, Terrain::WaterShallow | Terrain::WaterDeep)
    }
}

/// A structure occupying a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    /// Shared road, stamped before section replication.
    Road,
    /// Player-owned production building.
    Building { kind: BuildingKind, owner: u8 },
    /// Tile-side occupancy marker; combat state lives in the tower subsystem.
    Tower { id: u32 },
}

impl Structure {
    pub fn info(&self) -> StructureInfo {
        match *self {
            Structure::Road => StructureInfo::Road,
            Structure::Building { kind, owner } => StructureInfo::Building {
                building_kind: kind.def().id,
                owner,
            },
            Structure::Tower { id } => StructureInfo::Tower { tower_id: id },
        }
    }
}

/// One tile of the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: Terrain,
    pub structure: Option<Structure>,
    /// Bitmask of owning player numbers.
    owners: u32,
}

impl Tile {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            structure: None,
            owners: 0,
        }
    }

    pub fn add_owner(&mut self, player: u8) {
        self.owners |= 1 << player;
    }

    pub fn is_owned_by(&self, player: u8) -> bool {
        self.owners & (1 << player) != 0
    }

    pub fn owners(&self) -> Vec<u8> {
        (0..32).filter(|p| self.owners & (1 << p) != 0).collect()
    }

    pub fn has_structure(&self) -> bool {
        self.structure.is_some()
    }

    /// A tile is buildable for a player only if they own it and it is empty.
    /// Terrain whitelists are checked per definition by the caller.
    pub fn can_build(&self, player: u8) -> bool {
        self.is_owned_by(player) && self.structure.is_none()
    }

    pub fn is_road(&self) -> bool {
        matches!(self.structure, Some(Structure::Road))
    }
}

/// The combined arena: one cloned section per player, side by side.
#[derive(Debug, Clone)]
pub struct Arena {
    tiles: Vec<Tile>,
    width: u32,
    height: u32,
    section_width: u32,
    section_height: u32,
    player_count: u8,
}

impl Arena {
    /// Build the combined arena from the canonical level and its road plan.
    pub fn build(level: &Level, player_count: u8, roads: &RoadPlan) -> Self {
        let section_width = level.width();
        let section_height = level.height();
        let width = section_width * player_count as u32;
        let height = section_height;

        info!(
            "Creating combined arena {}x{} for {} players (each section {}x{})",
            width, height, player_count, section_width, section_height
        );

        let mut tiles = vec![Tile::new(Terrain::Grass); (width * height) as usize];
        for player in 0..player_count {
            let offset_x = player as u32 * section_width;
            for y in 0..section_height {
                for x in 0..section_width {
                    let mut tile = Tile::new(level.terrain_at(x, y));
                    tile.add_owner(player);
                    if roads.contains(UVec2::new(x, y)) {
                        tile.structure = Some(Structure::Road);
                    }
                    tiles[(y * width + offset_x + x) as usize] = tile;
                }
            }
        }

        Self {
            tiles,
            width,
            height,
            section_width,
            section_height,
            player_count,
        }
    }

    /// Rebuild an arena from previously captured tiles (snapshot restore).
    pub fn from_tiles(
        tiles: Vec<Tile>,
        section_width: u32,
        section_height: u32,
        player_count: u8,
    ) -> Self {
        Self {
            width: section_width * player_count as u32,
            height: section_height,
            tiles,
            section_width,
            section_height,
            player_count,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn section_width(&self) -> u32 {
        self.section_width
    }

    pub fn section_height(&self) -> u32 {
        self.section_height
    }

    pub fn player_count(&self) -> u8 {
        self.player_count
    }

    /// X offset of a player's section; players are arranged horizontally.
    pub fn section_offset_x(&self, player: u8) -> u32 {
        player as u32 * self.section_width
    }

    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        if x < self.width && y < self.height {
            Some(&self.tiles[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Attach a structure if the tile exists and is currently empty. The
    /// check and the write happen in one call so two racing placements can
    /// never both succeed under the match lock.
    pub fn place_structure(&mut self, x: u32, y: u32, structure: Structure) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let tile = &mut self.tiles[(y * self.width + x) as usize];
        if tile.structure.is_some() {
            return false;
        }
        tile.structure = Some(structure);
        true
    }

    pub fn iter_tiles(&self) -> impl Iterator<Item = (UVec2, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, tile)| {
            let i = i as u32;
            (UVec2::new(i % self.width, i / self.width), tile)
        })
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Wire form of every tile, for the full-map snapshot.
    pub fn tile_infos(&self) -> Vec<TileInfo> {
        self.iter_tiles()
            .map(|(pos, tile)| TileInfo {
                x: pos.x,
                y: pos.y,
                terrain: tile.terrain.id(),
                structure: tile.structure.as_ref().map(|s| s.info()),
                owners: tile.owners(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn arena_for_two() -> Arena {
        let level = Level::parse("SGC\nGGG").unwrap();
        let roads: RoadPlan = [UVec2::new(1, 0)].into_iter().collect::<HashSet<_>>().into();
        Arena::build(&level, 2, &roads)
    }

    #[test]
    fn sections_are_identical_clones() {
        let arena = arena_for_two();
        assert_eq!(arena.width(), 6);
        assert_eq!(arena.height(), 2);
        for y in 0..2 {
            for x in 0..3 {
                let a = arena.tile(x, y).unwrap();
                let b = arena.tile(x + 3, y).unwrap();
                assert_eq!(a.terrain, b.terrain);
                assert_eq!(a.structure, b.structure);
            }
        }
        assert!(arena.tile(1, 0).unwrap().is_road());
        assert!(arena.tile(4, 0).unwrap().is_road());
    }

    #[test]
    fn ownership_follows_sections() {
        let arena = arena_for_two();
        assert!(arena.tile(0, 1).unwrap().is_owned_by(0));
        assert!(!arena.tile(0, 1).unwrap().is_owned_by(1));
        assert!(arena.tile(3, 1).unwrap().is_owned_by(1));
        assert!(!arena.tile(3, 1).unwrap().is_owned_by(0));
    }

    #[test]
    fn place_structure_refuses_occupied_tiles() {
        let mut arena = arena_for_two();
        assert!(arena.place_structure(0, 1, Structure::Tower { id: 1 }));
        assert!(!arena.place_structure(0, 1, Structure::Tower { id: 2 }));
        assert_eq!(
            arena.tile(0, 1).unwrap().structure,
            Some(Structure::Tower { id: 1 })
        );
    }

    #[test]
    fn place_structure_rejects_out_of_bounds() {
        let mut arena = arena_for_two();
        assert!(!arena.place_structure(99, 0, Structure::Road));
    }

    #[test]
    fn road_tiles_are_not_buildable() {
        let arena = arena_for_two();
        assert!(!arena.tile(1, 0).unwrap().can_build(0));
        assert!(arena.tile(1, 1).unwrap().can_build(0));
    }
}
