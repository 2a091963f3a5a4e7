//! Shared protocol crate for rampart.
//!
//! This crate contains:
//! - Outbound event payloads the engine produces for the transport layer
//! - Inbound command payloads the transport layer resolves to a player
//! - Shared types (Position, ScoreEntry, etc.)
//!
//! Framing and delivery are the transport layer's concern; everything here is
//! plain data with serde derives.

mod commands;
mod events;

pub use commands::Command;
pub use events::{
    AttackInfo, CreepDespawnInfo, CreepPositionInfo, CreepSpawnInfo, Event, PlayerColor,
    PlayerStatsInfo, ScoreEntry, StructureInfo, TileInfo,
};

/// Represents a continuous 2D position using glam's Vec2.
pub type Position = glam::Vec2;
