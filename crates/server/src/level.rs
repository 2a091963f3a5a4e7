//! Level file loading.
//!
//! A level describes one player section as a rectangular character grid, one
//! row per line. The same level is cloned into every player's section when
//! the combined arena is built.

use crate::map::Terrain;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading level or wave assets. These are fatal for the
/// match being started: it never leaves its countdown.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("level file {0} is empty")]
    EmptyLevel(String),
}

/// Immutable terrain grid for one player section.
#[derive(Debug, Clone)]
pub struct Level {
    terrain: Vec<Terrain>,
    width: u32,
    height: u32,
}

impl Level {
    /// Load a level from a text file.
    pub fn load(path: &str) -> Result<Self, LoadError> {
        info!("Loading level from {}", path);
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        let level = Self::parse(&contents).ok_or_else(|| LoadError::EmptyLevel(path.to_string()))?;
        info!("Loaded level {}x{}", level.width, level.height);
        Ok(level)
    }

    /// Parse a level from its text form. Returns `None` for an empty grid.
    pub fn parse(text: &str) -> Option<Self> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let height = lines.len() as u32;
        let width = lines.first().map(|l| l.chars().count()).unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return None;
        }

        let mut terrain = vec![Terrain::Grass; (width * height) as usize];
        for (y, row) in lines.iter().enumerate() {
            for (x, c) in row.chars().enumerate().take(width as usize) {
                terrain[y * width as usize + x] = Terrain::from_char(c);
            }
        }

        Some(Self {
            terrain,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Terrain at a position; out-of-bounds reads as grass.
    pub fn terrain_at(&self, x: u32, y: u32) -> Terrain {
        if x < self.width && y < self.height {
            self.terrain[(y * self.width + x) as usize]
        } else {
            Terrain::Grass
        }
    }

    /// All positions with the given terrain, in scan order.
    pub fn find_all(&self, target: Terrain) -> Vec<glam::UVec2> {
        let mut positions = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.terrain_at(x, y) == target {
                    positions.push(glam::UVec2::new(x, y));
                }
            }
        }
        positions
    }

    /// First position with the given terrain, in scan order.
    pub fn find_first(&self, target: Terrain) -> Option<glam::UVec2> {
        self.find_all(target).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_maps_characters_to_terrain() {
        let level = Level::parse("GDS\nWwC\nFRG").unwrap();
        assert_eq!(level.width(), 3);
        assert_eq!(level.height(), 3);
        assert_eq!(level.terrain_at(0, 0), Terrain::Grass);
        assert_eq!(level.terrain_at(1, 0), Terrain::Dirt);
        assert_eq!(level.terrain_at(2, 0), Terrain::Spawner);
        assert_eq!(level.terrain_at(0, 1), Terrain::WaterShallow);
        assert_eq!(level.terrain_at(1, 1), Terrain::WaterDeep);
        assert_eq!(level.terrain_at(2, 1), Terrain::Castle);
        assert_eq!(level.terrain_at(0, 2), Terrain::Forest);
        assert_eq!(level.terrain_at(1, 2), Terrain::Rocky);
    }

    #[test]
    fn unknown_characters_default_to_grass() {
        let level = Level::parse("X?\nGG").unwrap();
        assert_eq!(level.terrain_at(0, 0), Terrain::Grass);
        assert_eq!(level.terrain_at(1, 0), Terrain::Grass);
    }

    #[test]
    fn out_of_bounds_reads_as_grass() {
        let level = Level::parse("S").unwrap();
        assert_eq!(level.terrain_at(5, 5), Terrain::Grass);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(Level::parse("").is_none());
        assert!(Level::parse("\n\n").is_none());
    }
}
