//! Creep path derivation.
//!
//! For each player's section, finds the ordered tile sequence a spawned
//! creep walks: spawner-adjacent road tile first, castle tile last. Only
//! road-structured tiles and the castle/spawner terrain are traversable.

use crate::map::{Arena, Terrain, Tile};
use glam::UVec2;
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

/// Ordered waypoints from spawner toward castle for one section.
pub type Path = Vec<UVec2>;

/// Compute the walk path for every player's section. A section without a
/// discoverable path yields an empty vector; creeps are simply never spawned
/// there.
pub fn compute_paths(arena: &Arena) -> Vec<Path> {
    (0..arena.player_count())
        .map(|player| {
            let spawner = find_in_section(arena, player, Terrain::Spawner);
            let castle = find_in_section(arena, player, Terrain::Castle);
            let (Some(spawner), Some(castle)) = (spawner, castle) else {
                warn!("Player {} section is missing spawner or castle", player);
                return Vec::new();
            };

            let path = find_path(arena, spawner, castle);
            if path.is_empty() {
                warn!("No path found from spawner to castle for player {}", player);
            } else {
                info!(
                    "Player {} path: {} tiles from ({},{}) to ({},{})",
                    player,
                    path.len(),
                    spawner.x,
                    spawner.y,
                    castle.x,
                    castle.y
                );
            }
            path
        })
        .collect()
}

/// Locate a player's spawner tile.
pub fn spawner_position(arena: &Arena, player: u8) -> Option<UVec2> {
    find_in_section(arena, player, Terrain::Spawner)
}

/// Scan bounded to the player's section sub-rectangle.
fn find_in_section(arena: &Arena, player: u8, target: Terrain) -> Option<UVec2> {
    let offset_x = arena.section_offset_x(player);
    for y in 0..arena.section_height() {
        for x in offset_x..offset_x + arena.section_width() {
            if arena.tile(x, y).map(|t| t.terrain) == Some(target) {
                return Some(UVec2::new(x, y));
            }
        }
    }
    None
}

fn is_walkable(tile: &Tile) -> bool {
    tile.is_road() || matches!(tile.terrain, Terrain::Castle | Terrain::Spawner)
}

fn find_path(arena: &Arena, spawner: UVec2, castle: UVec2) -> Path {
    let mut queue = VecDeque::new();
    let mut came_from: HashMap<UVec2, UVec2> = HashMap::new();

    // Seed with the spawner's walkable orthogonal neighbors.
    for neighbor in neighbors(arena, spawner) {
        if arena.tile(neighbor.x, neighbor.y).is_some_and(is_walkable) {
            came_from.insert(neighbor, spawner);
            queue.push_back(neighbor);
        }
    }

    while let Some(current) = queue.pop_front() {
        if current == castle {
            return reconstruct(&came_from, current, spawner);
        }

        for neighbor in neighbors(arena, current) {
            if came_from.contains_key(&neighbor) || neighbor == spawner {
                continue;
            }
            if arena.tile(neighbor.x, neighbor.y).is_some_and(is_walkable) {
                came_from.insert(neighbor, current);
                queue.push_back(neighbor);
            }
        }
    }

    Vec::new()
}

fn neighbors(arena: &Arena, pos: UVec2) -> Vec<UVec2> {
    let mut out = Vec::with_capacity(4);
    if pos.y > 0 {
        out.push(UVec2::new(pos.x, pos.y - 1));
    }
    if pos.x + 1 < arena.width() {
        out.push(UVec2::new(pos.x + 1, pos.y));
    }
    if pos.y + 1 < arena.height() {
        out.push(UVec2::new(pos.x, pos.y + 1));
    }
    if pos.x > 0 {
        out.push(UVec2::new(pos.x - 1, pos.y));
    }
    out
}

fn reconstruct(came_from: &HashMap<UVec2, UVec2>, end: UVec2, start: UVec2) -> Path {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::map::{Arena, RoadGenerator};

    fn arena(text: &str, players: u8) -> Arena {
        let level = Level::parse(text).unwrap();
        let roads = RoadGenerator::with_seed(9).generate(&level);
        Arena::build(&level, players, &roads)
    }

    #[test]
    fn path_runs_from_spawner_to_castle_in_order() {
        let arena = arena("SGGGC\nGGGGG", 1);
        let paths = compute_paths(&arena);
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert!(!path.is_empty());
        // Ends on the castle tile.
        assert_eq!(*path.last().unwrap(), UVec2::new(4, 0));
        // Starts adjacent to the spawner.
        let first = path[0];
        assert_eq!(first.x.abs_diff(0) + first.y.abs_diff(0), 1);
        // Consecutive waypoints are orthogonally adjacent.
        for pair in path.windows(2) {
            let d = pair[0].x.abs_diff(pair[1].x) + pair[0].y.abs_diff(pair[1].y);
            assert_eq!(d, 1);
        }
    }

    #[test]
    fn every_section_gets_its_own_path() {
        let arena = arena("SGGGC\nGGGGG", 3);
        let paths = compute_paths(&arena);
        assert_eq!(paths.len(), 3);
        for (player, path) in paths.iter().enumerate() {
            let offset = arena.section_offset_x(player as u8);
            assert!(!path.is_empty());
            for pos in path {
                assert!(pos.x >= offset && pos.x < offset + arena.section_width());
            }
            assert_eq!(*path.last().unwrap(), UVec2::new(offset + 4, 0));
        }
    }

    #[test]
    fn roadless_section_yields_empty_path() {
        // No castle at all: road generation produces nothing to walk on.
        let level = Level::parse("SGGGG\nGGGGC").unwrap();
        let arena = Arena::build(&level, 1, &Default::default());
        let paths = compute_paths(&arena);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_empty());
    }
}
