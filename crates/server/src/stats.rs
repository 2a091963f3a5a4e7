//! Per-match statistics.
//!
//! The match keeps its own aggregate for stats requests and mirrors every
//! event to the external [`StatsSink`](crate::session::StatsSink).

use protocol::PlayerStatsInfo;
use std::collections::BTreeMap;

/// A recordable gameplay event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEvent {
    TowerBuilt { kind: u8 },
    BuildingBuilt { kind: u8 },
    CreepSent { gold_spent: u32 },
    CreepKilled { gold_earned: u32 },
    DamageDealt { amount: u32 },
}

/// Aggregated statistics for every player of one match.
#[derive(Debug, Default)]
pub struct MatchStats {
    players: BTreeMap<u8, PlayerStatsInfo>,
}

impl MatchStats {
    pub fn record(&mut self, player: u8, event: StatsEvent) {
        let entry = self.players.entry(player).or_insert(PlayerStatsInfo {
            player,
            ..Default::default()
        });
        match event {
            StatsEvent::TowerBuilt { .. } => entry.towers_built += 1,
            StatsEvent::BuildingBuilt { .. } => entry.buildings_built += 1,
            StatsEvent::CreepSent { gold_spent } => {
                entry.creeps_sent += 1;
                entry.gold_spent += gold_spent;
            }
            StatsEvent::CreepKilled { gold_earned } => {
                entry.creeps_killed += 1;
                entry.gold_earned += gold_earned;
            }
            StatsEvent::DamageDealt { amount } => entry.damage_dealt += amount as u64,
        }
    }

    pub fn entries(&self) -> Vec<PlayerStatsInfo> {
        self.players.values().copied().collect()
    }
}
