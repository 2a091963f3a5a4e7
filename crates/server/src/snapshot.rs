//! Full-match snapshots.
//!
//! A snapshot captures everything needed to rebuild the world: tiles with
//! structures and ownership, player vitals and stocks, towers with their
//! remaining cooldowns, and active creeps. Serialized as JSON; used for
//! reconnection resyncs, persistence, and replay tooling.

use crate::creeps::CreepManager;
use crate::entity::{Creep, CreepKind, Tower, TowerKind};
use crate::game::MatchState;
use crate::map::{Arena, Tile};
use crate::towers::TowerManager;
use crate::wave::Wave;
use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub number: u8,
    pub color_index: u8,
    pub connected: bool,
    pub alive: bool,
    pub hitpoints: u32,
    pub stockpile: crate::economy::Stockpile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    pub id: u32,
    pub kind: TowerKind,
    pub owner: u8,
    pub x: u32,
    pub y: u32,
    pub cooldown_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreepSnapshot {
    pub id: u32,
    pub kind: CreepKind,
    pub owner: u8,
    pub sent_by: Option<u8>,
    pub pos: Vec2,
    pub path_index: usize,
    pub hitpoints: u32,
    pub slow_factor: f32,
    pub slow_remaining_ms: Option<u64>,
}

/// Serializable snapshot of one match's world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: u64,
    pub tick: u64,
    pub section_width: u32,
    pub section_height: u32,
    pub player_count: u8,
    pub players: Vec<PlayerSnapshot>,
    pub tiles: Vec<Tile>,
    pub towers: Vec<TowerSnapshot>,
    pub creeps: Vec<CreepSnapshot>,
}

/// Capture the current world. Returns `None` while assets are still loading.
pub fn capture(state: &MatchState, now: Instant) -> Option<MatchSnapshot> {
    let arena = state.arena()?;

    let players = state
        .players()
        .iter()
        .map(|p| PlayerSnapshot {
            number: p.number,
            color_index: p.color_index,
            connected: p.is_connected(),
            alive: p.is_alive(),
            hitpoints: p.hitpoints,
            stockpile: p.stockpile.clone(),
        })
        .collect();

    let towers = state
        .tower_manager()
        .map(|towers| {
            towers
                .iter()
                .map(|t| TowerSnapshot {
                    id: t.id,
                    kind: t.kind,
                    owner: t.owner,
                    x: t.tile.x,
                    y: t.tile.y,
                    cooldown_remaining: t.cooldown_remaining,
                })
                .collect()
        })
        .unwrap_or_default();

    let creeps = state
        .creep_manager()
        .map(|creeps| {
            creeps
                .iter()
                .map(|c| CreepSnapshot {
                    id: c.id,
                    kind: c.kind,
                    owner: c.owner,
                    sent_by: c.sent_by,
                    pos: c.pos,
                    path_index: c.path_index,
                    hitpoints: c.hitpoints,
                    slow_factor: c.stored_slow_factor(),
                    slow_remaining_ms: c.slow_remaining(now).map(|d| d.as_millis() as u64),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(MatchSnapshot {
        match_id: state.match_id(),
        tick: state.tick_count(),
        section_width: arena.section_width(),
        section_height: arena.section_height(),
        player_count: arena.player_count(),
        players,
        tiles: arena.tiles().to_vec(),
        towers,
        creeps,
    })
}

impl MatchSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Rebuild the world subsystems this snapshot describes. The wave
    /// schedule is not part of a snapshot; pass the one loaded from the
    /// level's wave file.
    pub fn rebuild_world(
        &self,
        tick_interval_ms: u64,
        waves: Vec<Wave>,
        now: Instant,
    ) -> (Arena, CreepManager, TowerManager) {
        let arena = Arena::from_tiles(
            self.tiles.clone(),
            self.section_width,
            self.section_height,
            self.player_count,
        );

        let mut creeps = CreepManager::new(waves, &arena);
        for snap in &self.creeps {
            creeps.insert_restored(Creep::from_parts(
                snap.id,
                snap.kind,
                snap.owner,
                snap.sent_by,
                snap.pos,
                snap.path_index,
                snap.hitpoints,
                snap.slow_factor,
                snap.slow_remaining_ms.map(Duration::from_millis),
                now,
            ));
        }

        let mut towers = TowerManager::new(tick_interval_ms);
        for snap in &self.towers {
            let mut tower = Tower::new(snap.id, snap.kind, snap.owner, UVec2::new(snap.x, snap.y));
            tower.cooldown_remaining = snap.cooldown_remaining;
            towers.insert_restored(tower);
        }

        (arena, creeps, towers)
    }

    /// Restore the captured world into a match, replacing its subsystems and
    /// player vitals.
    pub fn restore_into(&self, state: &mut MatchState, waves: Vec<Wave>, now: Instant) {
        let tick_ms = state.config.game.tick_interval_ms;
        let (arena, creeps, towers) = self.rebuild_world(tick_ms, waves, now);
        state.install_world(arena, creeps, towers, self.tick);
        state.restore_players(&self.players);
    }
}
