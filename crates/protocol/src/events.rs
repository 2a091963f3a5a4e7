//! Outbound event payloads.
//!
//! Every state change a client needs to observe is expressed as one of these
//! typed events. The engine broadcasts them to all sessions of a match or
//! unicasts them to a single session; the transport layer serializes and
//! delivers them.

use crate::Position;
use serde::{Deserialize, Serialize};

/// A structure occupying a tile, as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureInfo {
    Road,
    Building { building_kind: u8, owner: u8 },
    Tower { tower_id: u32 },
}

/// One tile of the combined arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    pub x: u32,
    pub y: u32,
    pub terrain: u8,
    pub structure: Option<StructureInfo>,
    pub owners: Vec<u8>,
}

/// Player number to color index mapping, for contour rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub player: u8,
    pub color_index: u8,
}

/// A newly spawned creep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreepSpawnInfo {
    pub creep_id: u32,
    pub creep_kind: String,
    pub owner: u8,
    /// Player who sent this creep, or `None` for wave spawns.
    pub sent_by: Option<u8>,
    pub pos: Position,
    pub hitpoints: u32,
}

/// Per-tick position/health update for an active creep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreepPositionInfo {
    pub creep_id: u32,
    pub pos: Position,
    pub hitpoints: u32,
    pub slowed: bool,
}

/// A creep leaving the field, with any reward attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreepDespawnInfo {
    pub creep_id: u32,
    /// Gold awarded because of this despawn, if any.
    pub reward_gold: u32,
    /// Player receiving the reward.
    pub reward_to: Option<u8>,
}

/// One tower firing once this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackInfo {
    pub tower_id: u32,
    pub tower_pos: Position,
    pub target_id: u32,
    pub target_pos: Position,
    pub damage: u32,
    pub bullet: String,
}

/// Scoreboard line for one player, sorted by score before broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: u8,
    pub color_index: u8,
    pub name: String,
    pub score: u32,
    pub alive: bool,
}

/// Aggregated per-player match statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStatsInfo {
    pub player: u8,
    pub towers_built: u32,
    pub buildings_built: u32,
    pub creeps_sent: u32,
    pub creeps_killed: u32,
    pub gold_spent: u32,
    pub gold_earned: u32,
    pub damage_dealt: u64,
}

/// A server-to-client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Match start countdown, in seconds.
    Countdown { seconds: u64 },
    /// The receiving player's number and color.
    PlayerInfo { player: u8, color_index: u8 },
    /// Full arena snapshot, sent at match start and on reconnection.
    FullMap {
        width: u32,
        height: u32,
        section_width: u32,
        tiles: Vec<TileInfo>,
        colors: Vec<PlayerColor>,
    },
    /// A single tile changed.
    TileUpdate { tile: TileInfo },
    /// The receiving player's current stock.
    ResourceUpdate { wood: u32, stone: u32, gold: u32 },
    /// A production building was placed.
    BuildingChanged {
        x: u32,
        y: u32,
        building_kind: u8,
        owner: u8,
    },
    /// A tower was placed.
    TowerPlaced {
        tower_id: u32,
        tower_kind: u8,
        owner: u8,
        x: u32,
        y: u32,
        cooldown_ticks: u32,
    },
    /// All creeps spawned this tick, batched.
    CreepSpawnBatch { creeps: Vec<CreepSpawnInfo> },
    /// All creeps that moved this tick, batched.
    CreepUpdateBatch { creeps: Vec<CreepPositionInfo> },
    /// A creep died or reached the castle.
    CreepDespawn(CreepDespawnInfo),
    /// All tower attacks of this tick, batched.
    TowerAttackBatch { attacks: Vec<AttackInfo> },
    /// A player's hit points changed.
    PlayerHpUpdate { player: u8, hitpoints: u32 },
    /// Current scoreboard, highest score first.
    Scoreboard { entries: Vec<ScoreEntry> },
    /// A player was eliminated (`winner = false`) or won (`winner = true`).
    GameOver { player: u8, winner: bool },
    /// Free-form notice shown to all players (disconnects, forfeits).
    Notice { message: String },
    /// Validation rejection, unicast to the offending session.
    ErrorMessage { message: String },
    /// Match statistics, unicast in response to a stats request.
    Stats { entries: Vec<PlayerStatsInfo> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn event_json_round_trip() {
        let event = Event::CreepSpawnBatch {
            creeps: vec![CreepSpawnInfo {
                creep_id: 7,
                creep_kind: "GHOST".into(),
                owner: 1,
                sent_by: Some(0),
                pos: Position::new(1.5, 2.5),
                hitpoints: 50,
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn command_tag_is_stable() {
        let json = serde_json::to_string(&Command::SendCreep {
            creep_kind: "TANK".into(),
        })
        .unwrap();
        assert!(json.contains("\"command\":\"send_creep\""));
    }
}
