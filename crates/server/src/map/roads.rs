//! Road generation.
//!
//! Connects every spawner to the castle on the canonical level before the
//! arena is cloned per player, so all sections share one road topology.
//! Breadth-first search is the primary strategy; a castle-biased random walk
//! is the fallback for maps BFS cannot cross.

use crate::level::Level;
use crate::map::Terrain;
use glam::UVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Chance to step toward the castle during the random-walk fallback.
const BIAS_TOWARD_CASTLE: f64 = 0.7;

const DIRECTIONS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Tiles that must become roads, accumulated over all spawners.
#[derive(Debug, Clone, Default)]
pub struct RoadPlan(HashSet<UVec2>);

impl RoadPlan {
    pub fn contains(&self, pos: UVec2) -> bool {
        self.0.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UVec2> {
        self.0.iter()
    }
}

impl From<HashSet<UVec2>> for RoadPlan {
    fn from(set: HashSet<UVec2>) -> Self {
        Self(set)
    }
}

/// Generates roads connecting spawners to the castle.
pub struct RoadGenerator {
    rng: StdRng,
}

impl RoadGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator for tests and reproducible maps.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Compute the road plan for a level. Missing castle or spawners yield an
    /// empty plan; generation failures degrade to partial connectivity.
    pub fn generate(&mut self, level: &Level) -> RoadPlan {
        let mut plan = HashSet::new();

        let Some(castle) = level.find_first(Terrain::Castle) else {
            warn!("No castle found in level, cannot generate roads");
            return plan.into();
        };
        let spawners = level.find_all(Terrain::Spawner);
        if spawners.is_empty() {
            warn!("No spawners found in level, cannot generate roads");
            return plan.into();
        }

        info!(
            "Generating roads from {} spawners to castle at ({}, {})",
            spawners.len(),
            castle.x,
            castle.y
        );

        for spawner in spawners {
            let path = self.connect(level, spawner, castle);
            debug!(
                "Road from spawner ({}, {}): {} tiles",
                spawner.x,
                spawner.y,
                path.len()
            );
            plan.extend(path);
        }

        info!("Generated {} total road tiles", plan.len());
        plan.into()
    }

    /// BFS from the spawner until a frontier tile is orthogonally adjacent to
    /// the castle, falling back to a random walk when the frontier runs dry.
    fn connect(&mut self, level: &Level, start: UVec2, castle: UVec2) -> Vec<UVec2> {
        let mut queue = VecDeque::new();
        let mut came_from: HashMap<UVec2, Option<UVec2>> = HashMap::new();

        queue.push_back(start);
        came_from.insert(start, None);

        while let Some(current) = queue.pop_front() {
            if is_adjacent(current, castle) {
                return reconstruct(level, &came_from, current);
            }

            for neighbor in neighbors(level, current) {
                if level.terrain_at(neighbor.x, neighbor.y).is_water()
                    || came_from.contains_key(&neighbor)
                {
                    continue;
                }
                came_from.insert(neighbor, Some(current));
                queue.push_back(neighbor);
            }
        }

        warn!(
            "BFS found no road from ({},{}) to ({},{}), using random walk fallback",
            start.x, start.y, castle.x, castle.y
        );
        self.random_walk(level, start, castle)
    }

    /// Castle-biased random walk; returns whatever partial path it managed
    /// when it gets stuck or hits the iteration cap.
    fn random_walk(&mut self, level: &Level, start: UVec2, castle: UVec2) -> Vec<UVec2> {
        let mut path = Vec::new();
        let mut visited: HashSet<UVec2> = [start, castle].into_iter().collect();
        let mut current = start;

        let max_iterations = (level.width() * level.height() * 2) as usize;
        for _ in 0..max_iterations {
            if is_adjacent(current, castle) {
                return path;
            }

            let Some(next) = self.choose_step(level, current, castle, &visited) else {
                warn!(
                    "Road generation stuck at ({}, {}), keeping partial road",
                    current.x, current.y
                );
                return path;
            };

            if can_place_road(level.terrain_at(next.x, next.y)) {
                path.push(next);
            }
            visited.insert(next);
            current = next;
        }

        warn!(
            "Road generation hit the iteration cap before reaching ({}, {})",
            castle.x, castle.y
        );
        path
    }

    fn choose_step(
        &mut self,
        level: &Level,
        current: UVec2,
        castle: UVec2,
        visited: &HashSet<UVec2>,
    ) -> Option<UVec2> {
        let valid = |pos: &UVec2| {
            !visited.contains(pos) && !level.terrain_at(pos.x, pos.y).is_water()
        };

        // Orthogonal moves that reduce Manhattan distance to the castle.
        let mut preferred = Vec::new();
        let dx = (castle.x as i64 - current.x as i64).signum();
        let dy = (castle.y as i64 - current.y as i64).signum();
        if dx != 0 {
            if let Some(step) = offset(level, current, dx, 0) {
                if valid(&step) {
                    preferred.push(step);
                }
            }
        }
        if dy != 0 {
            if let Some(step) = offset(level, current, 0, dy) {
                if valid(&step) {
                    preferred.push(step);
                }
            }
        }

        let alternatives: Vec<UVec2> = neighbors(level, current)
            .into_iter()
            .filter(|pos| valid(pos) && !preferred.contains(pos))
            .collect();

        if !preferred.is_empty() && self.rng.random_bool(BIAS_TOWARD_CASTLE) {
            Some(preferred[self.rng.random_range(0..preferred.len())])
        } else if !alternatives.is_empty() {
            Some(alternatives[self.rng.random_range(0..alternatives.len())])
        } else if !preferred.is_empty() {
            Some(preferred[self.rng.random_range(0..preferred.len())])
        } else {
            None
        }
    }
}

impl Default for RoadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Roads never overwrite special tiles.
fn can_place_road(terrain: Terrain) -> bool {
    !matches!(terrain, Terrain::Castle | Terrain::Spawner) && !terrain.is_water()
}

fn is_adjacent(a: UVec2, b: UVec2) -> bool {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    (dx == 1 && dy == 0) || (dx == 0 && dy == 1)
}

fn offset(level: &Level, pos: UVec2, dx: i64, dy: i64) -> Option<UVec2> {
    let x = pos.x as i64 + dx;
    let y = pos.y as i64 + dy;
    if x >= 0 && y >= 0 && (x as u32) < level.width() && (y as u32) < level.height() {
        Some(UVec2::new(x as u32, y as u32))
    } else {
        None
    }
}

fn neighbors(level: &Level, pos: UVec2) -> Vec<UVec2> {
    DIRECTIONS
        .iter()
        .filter_map(|&(dx, dy)| offset(level, pos, dx, dy))
        .collect()
}

fn reconstruct(
    level: &Level,
    came_from: &HashMap<UVec2, Option<UVec2>>,
    end: UVec2,
) -> Vec<UVec2> {
    let mut path = Vec::new();
    let mut current = Some(end);
    while let Some(pos) = current {
        let Some(&prev) = came_from.get(&pos) else {
            break;
        };
        // The spawner itself (the BFS root) is never part of the road.
        if prev.is_some() && can_place_road(level.terrain_at(pos.x, pos.y)) {
            path.push(pos);
        }
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn bfs_connects_spawner_to_castle() {
        let level = Level::parse("SGGGC\nGGGGG").unwrap();
        let plan = RoadGenerator::with_seed(1).generate(&level);
        assert!(!plan.is_empty());
        // The chain must end adjacent to the castle.
        assert!(plan.iter().any(|&p| is_adjacent(p, UVec2::new(4, 0))));
        // Neither the spawner nor the castle carries a road.
        assert!(!plan.contains(UVec2::new(0, 0)));
        assert!(!plan.contains(UVec2::new(4, 0)));
    }

    #[test]
    fn bfs_routes_around_water() {
        let level = Level::parse("SGWGC\nGGWGG\nGGGGG").unwrap();
        let plan = RoadGenerator::with_seed(7).generate(&level);
        assert!(!plan.is_empty());
        for pos in plan.iter() {
            assert!(!level.terrain_at(pos.x, pos.y).is_water());
        }
        assert!(plan.iter().any(|&p| is_adjacent(p, UVec2::new(4, 0))));
    }

    #[test]
    fn multiple_spawners_union_their_roads() {
        let level = Level::parse("SGGGC\nGGGGG\nSGGGG").unwrap();
        let plan = RoadGenerator::with_seed(3).generate(&level);
        // Both spawners must have a tile adjacent to them in the plan.
        assert!(plan.iter().any(|&p| is_adjacent(p, UVec2::new(0, 0))));
        assert!(plan.iter().any(|&p| is_adjacent(p, UVec2::new(0, 2))));
    }

    #[test]
    fn disconnected_map_degrades_without_panicking() {
        // A full water wall makes the castle unreachable; the fallback may
        // only produce a partial road but must terminate.
        let level = Level::parse("SGWGC\nGGWGG\nGGWGG").unwrap();
        let plan = RoadGenerator::with_seed(11).generate(&level);
        for pos in plan.iter() {
            assert!(!level.terrain_at(pos.x, pos.y).is_water());
        }
    }

    #[test]
    fn missing_castle_yields_empty_plan() {
        let level = Level::parse("SGG\nGGG").unwrap();
        let plan = RoadGenerator::with_seed(5).generate(&level);
        assert!(plan.is_empty());
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let level = Level::parse("SGGGC\nGGGGG\nGGGGG").unwrap();
        let a = RoadGenerator::with_seed(42).generate(&level);
        let b = RoadGenerator::with_seed(42).generate(&level);
        let mut av: Vec<_> = a.iter().copied().collect();
        let mut bv: Vec<_> = b.iter().copied().collect();
        av.sort_by_key(|p| (p.x, p.y));
        bv.sort_by_key(|p| (p.x, p.y));
        assert_eq!(av, bv);
    }
}
