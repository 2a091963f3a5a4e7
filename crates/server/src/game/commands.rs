//! Inbound command validation and execution.
//!
//! Every command is validated against current match state before any
//! mutation; a rejection is a no-op plus an error event to the issuing
//! session, never a partial change.

use super::{MatchState, Phase};
use crate::entity::{BuildingKind, CreepKind, TowerKind};
use crate::map::Structure;
use crate::stats::StatsEvent;
use glam::UVec2;
use protocol::{Command, Event};
use thiserror::Error;
use tracing::{info, warn};

/// Why a command was refused. The display text is what the player sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Game is not running")]
    MatchNotRunning,
    #[error("Player is disconnected")]
    PlayerDisconnected,
    #[error("Player is eliminated")]
    PlayerEliminated,
    #[error("Invalid position")]
    InvalidPosition,
    #[error("Cannot build on another player's territory")]
    ForeignTerritory,
    #[error("Cannot build {name} on {terrain}")]
    WrongTerrain { name: &'static str, terrain: String },
    #[error("Tile already occupied")]
    TileOccupied,
    #[error("Not enough resources")]
    InsufficientResources,
    #[error("Unknown tower type")]
    UnknownTowerKind,
    #[error("Unknown building type")]
    UnknownBuildingKind,
    #[error("Unknown creep type")]
    UnknownCreepKind,
}

impl MatchState {
    /// Execute a command on behalf of the resolved player. Rejections are
    /// unicast back as error messages.
    pub fn handle_command(&mut self, user_id: u64, command: Command) {
        let Some(number) = self.find_player_number(user_id) else {
            warn!("Command from unknown user {}", user_id);
            return;
        };

        let result = match command {
            Command::PlaceTower { x, y, tower_kind } => self.place_tower(number, x, y, tower_kind),
            Command::PlaceBuilding {
                x,
                y,
                building_kind,
            } => self.place_building(number, x, y, building_kind),
            Command::SendCreep { creep_kind } => self.send_creep(number, &creep_kind),
            Command::GetStats => {
                self.send_stats(number);
                Ok(())
            }
        };

        if let Err(reason) = result {
            info!("Rejected command from player {}: {}", number, reason);
            self.send_to(
                number,
                Event::ErrorMessage {
                    message: reason.to_string(),
                },
            );
        }
    }

    fn ensure_running(&self) -> Result<(), RejectReason> {
        if self.phase == Phase::Running {
            Ok(())
        } else {
            Err(RejectReason::MatchNotRunning)
        }
    }

    fn ensure_can_act(&self, number: u8) -> Result<(), RejectReason> {
        let player = &self.players[number as usize];
        if !player.is_connected() {
            return Err(RejectReason::PlayerDisconnected);
        }
        if !player.is_alive() {
            return Err(RejectReason::PlayerEliminated);
        }
        Ok(())
    }

    /// Ownership, terrain whitelist and occupancy checks shared by tower and
    /// building placement.
    fn validate_placement(
        &self,
        number: u8,
        x: u32,
        y: u32,
        name: &'static str,
        whitelisted: impl Fn(crate::map::Terrain) -> bool,
    ) -> Result<(), RejectReason> {
        let tile = self
            .arena
            .as_ref()
            .and_then(|arena| arena.tile(x, y))
            .ok_or(RejectReason::InvalidPosition)?;

        if !tile.is_owned_by(number) {
            return Err(RejectReason::ForeignTerritory);
        }
        if !whitelisted(tile.terrain) {
            return Err(RejectReason::WrongTerrain {
                name,
                terrain: format!("{:?}", tile.terrain).to_lowercase(),
            });
        }
        if tile.has_structure() {
            return Err(RejectReason::TileOccupied);
        }
        Ok(())
    }

    fn place_tower(&mut self, number: u8, x: u32, y: u32, kind_id: u8) -> Result<(), RejectReason> {
        self.ensure_running()?;
        self.ensure_can_act(number)?;
        let kind = TowerKind::from_id(kind_id).ok_or(RejectReason::UnknownTowerKind)?;
        let def = kind.def();
        self.validate_placement(number, x, y, def.name, |t| kind.can_build_on(t))?;

        let player = &self.players[number as usize];
        if !player.stockpile.can_afford(&def.cost, player.hitpoints) {
            return Err(RejectReason::InsufficientResources);
        }

        // All checks passed - place the tower.
        self.players[number as usize].stockpile.subtract(&def.cost);
        let (tower_id, cooldown_ticks) = {
            let towers = self
                .towers
                .as_mut()
                .ok_or(RejectReason::MatchNotRunning)?;
            let tick_ms = towers.tick_interval_ms();
            let tower = towers.place(kind, number, UVec2::new(x, y));
            (tower.id, def.cooldown_ticks(tick_ms))
        };
        if let Some(arena) = self.arena.as_mut() {
            let placed = arena.place_structure(x, y, Structure::Tower { id: tower_id });
            debug_assert!(placed, "occupancy was checked under the same lock");
        }

        let event = StatsEvent::TowerBuilt { kind: def.id };
        self.stats.record(number, event);
        self.sink.record(number, event);
        info!("Player {} built {} at ({}, {})", number, def.name, x, y);

        self.send_resource_update(number);
        self.broadcast_tile_update(x, y);
        self.broadcast(Event::TowerPlaced {
            tower_id,
            tower_kind: def.id,
            owner: number,
            x,
            y,
            cooldown_ticks,
        });
        Ok(())
    }

    fn place_building(
        &mut self,
        number: u8,
        x: u32,
        y: u32,
        kind_id: u8,
    ) -> Result<(), RejectReason> {
        self.ensure_running()?;
        self.ensure_can_act(number)?;
        let kind = BuildingKind::from_id(kind_id).ok_or(RejectReason::UnknownBuildingKind)?;
        let def = kind.def();
        self.validate_placement(number, x, y, def.name, |t| kind.can_build_on(t))?;

        let player = &self.players[number as usize];
        if !player.stockpile.can_afford(&def.cost, player.hitpoints) {
            return Err(RejectReason::InsufficientResources);
        }

        // All checks passed - place the building.
        let stockpile = &mut self.players[number as usize].stockpile;
        stockpile.subtract(&def.cost);
        let (bonus_kind, bonus) = def.production_bonus;
        stockpile.add_production_bonus(bonus_kind, bonus);
        if let Some(arena) = self.arena.as_mut() {
            let placed = arena.place_structure(
                x,
                y,
                Structure::Building {
                    kind,
                    owner: number,
                },
            );
            debug_assert!(placed, "occupancy was checked under the same lock");
        }

        let event = StatsEvent::BuildingBuilt { kind: def.id };
        self.stats.record(number, event);
        self.sink.record(number, event);
        info!("Player {} built {} at ({}, {})", number, def.name, x, y);

        self.send_resource_update(number);
        self.broadcast_tile_update(x, y);
        self.broadcast(Event::BuildingChanged {
            x,
            y,
            building_kind: def.id,
            owner: number,
        });
        Ok(())
    }

    fn send_creep(&mut self, number: u8, kind_id: &str) -> Result<(), RejectReason> {
        self.ensure_running()?;
        self.ensure_can_act(number)?;
        let kind = CreepKind::from_id(kind_id).ok_or(RejectReason::UnknownCreepKind)?;
        let cost = kind.def().send_cost;

        let player = &self.players[number as usize];
        if !player.stockpile.can_afford(&cost, player.hitpoints) {
            return Err(RejectReason::InsufficientResources);
        }

        let player = &mut self.players[number as usize];
        player.stockpile.subtract(&cost);
        if cost.hitpoints > 0 {
            let hitpoints = player.take_damage(cost.hitpoints);
            self.broadcast(Event::PlayerHpUpdate {
                player: number,
                hitpoints,
            });
        }

        let event = StatsEvent::CreepSent {
            gold_spent: cost.gold,
        };
        self.stats.record(number, event);
        self.sink.record(number, event);
        info!("Player {} sent {} to opponents", number, kind.def().id);

        self.send_resource_update(number);
        let spawned = self
            .creeps
            .as_mut()
            .map(|creeps| creeps.spawn_sent(kind, number))
            .unwrap_or_default();
        if !spawned.is_empty() {
            self.broadcast(Event::CreepSpawnBatch { creeps: spawned });
        }
        Ok(())
    }

    fn send_stats(&self, number: u8) {
        self.send_to(
            number,
            Event::Stats {
                entries: self.stats.entries(),
            },
        );
    }

    fn broadcast_tile_update(&self, x: u32, y: u32) {
        let Some(tile) = self.arena.as_ref().and_then(|arena| arena.tile(x, y)) else {
            return;
        };
        self.broadcast(Event::TileUpdate {
            tile: protocol::TileInfo {
                x,
                y,
                terrain: tile.terrain.id(),
                structure: tile.structure.as_ref().map(|s| s.info()),
                owners: tile.owners(),
            },
        });
    }
}
