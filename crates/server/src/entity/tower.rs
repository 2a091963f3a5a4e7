//! Towers: automated defensive structures.
//!
//! All tower kinds share one behavior parameterized by their definition;
//! splash and slow values of zero simply disable those effects.

use crate::economy::Cost;
use crate::map::Terrain;
use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Every tower kind in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TowerKind {
    Basic,
    Sniper,
    Splash,
    Slow,
    Rapid,
}

/// Static stats of one tower kind. Cooldown is expressed in milliseconds and
/// rounded up to whole game ticks.
#[derive(Debug, Clone)]
pub struct TowerDef {
    pub id: u8,
    pub name: &'static str,
    /// Shooting range in tiles, from the tower's tile center.
    pub range: f32,
    pub cooldown_ms: u64,
    pub damage: u32,
    pub bullet: &'static str,
    pub cost: Cost,
    pub allowed_terrains: &'static [Terrain],
    /// Creeps within this radius of the target also take the hit (0 = none).
    pub splash_radius: f32,
    pub slow_factor: f32,
    pub slow_duration_ms: u64,
}

static BASIC: TowerDef = TowerDef {
    id: 1,
    name: "Basic Tower",
    range: 3.0,
    cooldown_ms: 1000,
    damage: 30,
    bullet: "BASIC",
    cost: Cost::resources(80, 80, 100),
    allowed_terrains: &[Terrain::Grass, Terrain::Dirt],
    splash_radius: 0.0,
    slow_factor: 0.0,
    slow_duration_ms: 0,
};

static SNIPER: TowerDef = TowerDef {
    id: 2,
    name: "Sniper Tower",
    range: 5.0,
    cooldown_ms: 3000,
    damage: 80,
    bullet: "SNIPER",
    cost: Cost::resources(60, 150, 200),
    allowed_terrains: &[Terrain::Grass, Terrain::Rocky],
    splash_radius: 0.0,
    slow_factor: 0.0,
    slow_duration_ms: 0,
};

static SPLASH: TowerDef = TowerDef {
    id: 3,
    name: "Splash Tower",
    range: 2.5,
    cooldown_ms: 1500,
    damage: 20,
    bullet: "SPLASH",
    cost: Cost::resources(120, 120, 150),
    allowed_terrains: &[Terrain::Grass, Terrain::Dirt],
    splash_radius: 1.0,
    slow_factor: 0.0,
    slow_duration_ms: 0,
};

static SLOW: TowerDef = TowerDef {
    id: 4,
    name: "Slow Tower",
    range: 2.5,
    cooldown_ms: 800,
    damage: 15,
    bullet: "SLOW",
    cost: Cost::resources(60, 100, 130),
    allowed_terrains: &[Terrain::Grass, Terrain::Forest],
    splash_radius: 0.0,
    slow_factor: 0.5,
    slow_duration_ms: 2500,
};

static RAPID: TowerDef = TowerDef {
    id: 5,
    name: "Rapid Tower",
    range: 2.0,
    cooldown_ms: 400,
    damage: 12,
    bullet: "RAPID",
    cost: Cost::resources(100, 80, 100),
    allowed_terrains: &[Terrain::Grass, Terrain::Dirt],
    splash_radius: 0.0,
    slow_factor: 0.0,
    slow_duration_ms: 0,
};

impl TowerKind {
    pub const ALL: [TowerKind; 5] = [
        TowerKind::Basic,
        TowerKind::Sniper,
        TowerKind::Splash,
        TowerKind::Slow,
        TowerKind::Rapid,
    ];

    pub fn def(self) -> &'static TowerDef {
        match self {
            TowerKind::Basic => &BASIC,
            TowerKind::Sniper => &SNIPER,
            TowerKind::Splash => &SPLASH,
            TowerKind::Slow => &SLOW,
            TowerKind::Rapid => &RAPID,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.def().id == id)
    }

    pub fn can_build_on(self, terrain: Terrain) -> bool {
        self.def().allowed_terrains.contains(&terrain)
    }
}

impl TowerDef {
    /// Cooldown in whole ticks, rounded up and never below one.
    pub fn cooldown_ticks(&self, tick_interval_ms: u64) -> u32 {
        (self.cooldown_ms.div_ceil(tick_interval_ms)).max(1) as u32
    }

    pub fn has_splash(&self) -> bool {
        self.splash_radius > 0.0
    }

    pub fn has_slow(&self) -> bool {
        self.slow_factor > 0.0 && self.slow_duration_ms > 0
    }
}

/// One placed tower.
#[derive(Debug, Clone)]
pub struct Tower {
    pub id: u32,
    pub kind: TowerKind,
    pub owner: u8,
    pub tile: UVec2,
    pub cooldown_remaining: u32,
}

impl Tower {
    pub fn new(id: u32, kind: TowerKind, owner: u8, tile: UVec2) -> Self {
        Self {
            id,
            kind,
            owner,
            tile,
            cooldown_remaining: 0,
        }
    }

    /// Center of the tower's tile, for range checks.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.tile.x as f32 + 0.5, self.tile.y as f32 + 0.5)
    }

    pub fn ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    /// Reset the cooldown after firing.
    pub fn fire(&mut self, tick_interval_ms: u64) {
        self.cooldown_remaining = self.kind.def().cooldown_ticks(tick_interval_ms);
    }

    /// Decrement the cooldown by one tick, floored at zero.
    pub fn tick_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_rounds_up_to_whole_ticks() {
        // 350 ms at a 200 ms tick is 2 ticks, never 1.
        let def = TowerDef {
            cooldown_ms: 350,
            ..BASIC.clone()
        };
        assert_eq!(def.cooldown_ticks(200), 2);
        assert_eq!(BASIC.cooldown_ticks(200), 5);
        assert_eq!(SNIPER.cooldown_ticks(200), 15);
    }

    #[test]
    fn cooldown_is_at_least_one_tick() {
        // Faster-than-tick cooldowns still cost one tick.
        assert_eq!(RAPID.cooldown_ticks(500), 1);
        assert_eq!(RAPID.cooldown_ticks(400), 1);
    }

    #[test]
    fn firing_and_cooling_cycle() {
        let mut tower = Tower::new(1, TowerKind::Basic, 0, UVec2::new(2, 3));
        assert!(tower.ready());
        tower.fire(200);
        assert_eq!(tower.cooldown_remaining, 5);
        assert!(!tower.ready());
        for _ in 0..5 {
            tower.tick_cooldown();
        }
        assert!(tower.ready());
        tower.tick_cooldown();
        assert_eq!(tower.cooldown_remaining, 0);
    }

    #[test]
    fn ids_round_trip() {
        for kind in TowerKind::ALL {
            assert_eq!(TowerKind::from_id(kind.def().id), Some(kind));
        }
        assert_eq!(TowerKind::from_id(0), None);
    }

    #[test]
    fn effect_flags_follow_definition_data() {
        assert!(TowerKind::Splash.def().has_splash());
        assert!(!TowerKind::Splash.def().has_slow());
        assert!(TowerKind::Slow.def().has_slow());
        assert!(!TowerKind::Basic.def().has_splash());
    }
}
