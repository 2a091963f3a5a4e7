//! Inbound command payloads.
//!
//! The transport layer authenticates a session, resolves it to a player in a
//! running match, and hands the decoded command to the engine. Everything the
//! engine needs beyond the acting player is carried here.

use serde::{Deserialize, Serialize};

/// A player command, already resolved to a specific player in a specific match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Place a tower on an owned tile.
    PlaceTower { x: u32, y: u32, tower_kind: u8 },
    /// Place a production building on an owned tile.
    PlaceBuilding { x: u32, y: u32, building_kind: u8 },
    /// Send a creep into every opponent's section, paid by the sender.
    SendCreep { creep_kind: String },
    /// Request the match statistics aggregate.
    GetStats,
}
