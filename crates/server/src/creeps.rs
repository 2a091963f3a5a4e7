//! The creep subsystem.
//!
//! Owns every active hostile unit in a match: spawns them from the wave
//! schedule or from player sends, advances them along their section's path
//! each tick, and resolves castle impacts and deaths into outcomes the match
//! session applies to players.

use crate::economy::Reward;
use crate::entity::{Creep, CreepKind};
use crate::map::path::{self, Path};
use crate::map::Arena;
use crate::wave::Wave;
use glam::UVec2;
use protocol::{CreepPositionInfo, CreepSpawnInfo};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A creep reaching the castle: damage to the owner and any reward due to
/// the player who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastleHit {
    pub creep_id: u32,
    pub owner: u8,
    pub damage: u32,
    pub reward: Option<(u8, Reward)>,
}

/// A creep killed by towers: kill reward goes to the section owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreepKill {
    pub creep_id: u32,
    pub owner: u8,
    pub kind: CreepKind,
    pub reward: Reward,
}

/// Terminal creeps removed during one tick.
#[derive(Debug, Clone, Default)]
pub struct CreepResolution {
    pub castle_hits: Vec<CastleHit>,
    pub kills: Vec<CreepKill>,
}

/// Manages all active creeps of a match.
pub struct CreepManager {
    next_id: u32,
    creeps: BTreeMap<u32, Creep>,
    waves: Vec<Wave>,
    paths: Vec<Path>,
    spawners: Vec<Option<UVec2>>,
}

impl CreepManager {
    pub fn new(waves: Vec<Wave>, arena: &Arena) -> Self {
        let paths = path::compute_paths(arena);
        let spawners = (0..arena.player_count())
            .map(|player| path::spawner_position(arena, player))
            .collect();
        info!(
            "Creep manager initialized with {} waves for {} players",
            waves.len(),
            paths.len()
        );
        Self {
            next_id: 1,
            creeps: BTreeMap::new(),
            waves,
            paths,
            spawners,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn player_count(&self) -> u8 {
        self.paths.len() as u8
    }

    pub fn active_count(&self) -> usize {
        self.creeps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Creep> {
        self.creeps.values()
    }

    pub fn get(&self, id: u32) -> Option<&Creep> {
        self.creeps.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Creep> {
        self.creeps.get_mut(&id)
    }

    pub fn path_for(&self, player: u8) -> &[UVec2] {
        self.paths
            .get(player as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Re-insert a creep captured in a snapshot, keeping the id counter ahead
    /// of every restored id.
    pub fn insert_restored(&mut self, creep: Creep) {
        self.next_id = self.next_id.max(creep.id + 1);
        self.creeps.insert(creep.id, creep);
    }

    /// Spawn one creep at a player's spawner. A section with no path cannot
    /// receive creeps; the spawn is skipped.
    fn spawn(&mut self, kind: CreepKind, owner: u8, sent_by: Option<u8>) -> Option<CreepSpawnInfo> {
        let spawner = self.spawners.get(owner as usize).copied().flatten();
        let Some(spawner) = spawner.filter(|_| !self.path_for(owner).is_empty()) else {
            warn!("Player {} has no valid path, skipping creep spawn", owner);
            return None;
        };

        let id = self.next_id();
        let creep = Creep::new(id, kind, owner, sent_by, spawner);
        let info = CreepSpawnInfo {
            creep_id: id,
            creep_kind: kind.def().id.to_string(),
            owner,
            sent_by,
            pos: creep.pos,
            hitpoints: creep.hitpoints,
        };
        self.creeps.insert(id, creep);
        Some(info)
    }

    /// Spawn every wave scheduled for this tick, one instance of each listed
    /// kind per player.
    pub fn spawn_wave_creeps(&mut self, tick: u64) -> Vec<CreepSpawnInfo> {
        let mut spawned = Vec::new();
        let due: Vec<Wave> = self
            .waves
            .iter()
            .filter(|wave| wave.tick == tick)
            .cloned()
            .collect();

        for wave in due {
            info!(
                "Spawning wave at tick {}: {} creeps per player",
                tick,
                wave.creeps.len()
            );
            for player in 0..self.player_count() {
                for &kind in &wave.creeps {
                    spawned.extend(self.spawn(kind, player, None));
                }
            }
        }

        if !spawned.is_empty() {
            debug!("Batched {} creep spawns into single event", spawned.len());
        }
        spawned
    }

    /// Spawn a player-sent creep into every opponent's section. Swarm kinds
    /// spawn several instances per opponent.
    pub fn spawn_sent(&mut self, kind: CreepKind, sender: u8) -> Vec<CreepSpawnInfo> {
        let mut spawned = Vec::new();
        for player in 0..self.player_count() {
            if player == sender {
                continue;
            }
            for _ in 0..kind.def().spawn_count {
                spawned.extend(self.spawn(kind, player, Some(sender)));
            }
        }
        if !spawned.is_empty() {
            info!(
                "Player {} sent {} to {} opponents",
                sender,
                kind.def().id,
                spawned.len()
            );
        }
        spawned
    }

    /// Advance every live creep by one elapsed-time slice, then let healer
    /// auras pulse. Returns the batched position updates.
    pub fn advance_all(
        &mut self,
        dt: f32,
        now: Instant,
        healing_enabled: bool,
    ) -> Vec<CreepPositionInfo> {
        let mut moved = Vec::new();
        let mut pulses: Vec<(u32, u8)> = Vec::new();

        let paths = &self.paths;
        for creep in self.creeps.values_mut() {
            if creep.has_reached_castle() || creep.is_dead() {
                continue;
            }
            let path = paths
                .get(creep.owner as usize)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            creep.advance(path, dt, now);
            moved.push(creep.id);
            if healing_enabled && creep.heal_pulse_due() {
                pulses.push((creep.id, creep.owner));
            }
        }

        for (healer_id, owner) in pulses {
            self.heal_pulse(healer_id, owner);
        }

        moved
            .into_iter()
            .filter_map(|id| self.creeps.get(&id))
            .map(|creep| CreepPositionInfo {
                creep_id: creep.id,
                pos: creep.pos,
                hitpoints: creep.hitpoints,
                slowed: creep.is_slowed(now),
            })
            .collect()
    }

    /// Heal every other live creep of the same section within the aura.
    fn heal_pulse(&mut self, healer_id: u32, owner: u8) {
        let Some(healer) = self.creeps.get(&healer_id) else {
            return;
        };
        let Some(aura) = healer.kind.def().heal else {
            return;
        };
        let origin = healer.pos;

        let targets: Vec<u32> = self
            .creeps
            .values()
            .filter(|c| {
                c.id != healer_id
                    && c.owner == owner
                    && !c.is_dead()
                    && !c.has_reached_castle()
                    && c.pos.distance(origin) <= aura.radius
            })
            .map(|c| c.id)
            .collect();

        for id in targets {
            if let Some(creep) = self.creeps.get_mut(&id) {
                creep.heal(aura.amount);
            }
        }
    }

    /// Remove every terminal creep and report what happened to it.
    pub fn resolve(&mut self) -> CreepResolution {
        let mut resolution = CreepResolution::default();
        let ids: Vec<u32> = self.creeps.keys().copied().collect();

        for id in ids {
            let creep = &self.creeps[&id];
            if creep.has_reached_castle() {
                let kind = creep.kind;
                resolution.castle_hits.push(CastleHit {
                    creep_id: id,
                    owner: creep.owner,
                    damage: kind.def().castle_damage,
                    reward: creep.sent_by.map(|sender| (sender, kind.hit_reward())),
                });
                self.creeps.remove(&id);
            } else if creep.is_dead() {
                resolution.kills.push(CreepKill {
                    creep_id: id,
                    owner: creep.owner,
                    kind: creep.kind,
                    reward: creep.kind.def().kill_reward,
                });
                self.creeps.remove(&id);
            }
        }

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::map::RoadGenerator;
    use crate::wave::Wave;

    fn manager(players: u8, waves: Vec<Wave>) -> CreepManager {
        let level = Level::parse("SGGGC\nGGGGG").unwrap();
        let roads = RoadGenerator::with_seed(4).generate(&level);
        let arena = Arena::build(&level, players, &roads);
        CreepManager::new(waves, &arena)
    }

    #[test]
    fn waves_spawn_for_every_player_at_their_spawner() {
        let waves = vec![Wave {
            tick: 10,
            creeps: vec![CreepKind::Ghost, CreepKind::Troll],
        }];
        let mut mgr = manager(2, waves);

        assert!(mgr.spawn_wave_creeps(9).is_empty());
        let spawned = mgr.spawn_wave_creeps(10);
        assert_eq!(spawned.len(), 4);
        assert_eq!(mgr.active_count(), 4);
        for info in &spawned {
            assert_eq!(info.sent_by, None);
            let offset = info.owner as f32 * 5.0;
            assert!((info.pos.x - (offset + 0.5)).abs() < 1e-4);
        }
    }

    #[test]
    fn sent_creeps_spawn_only_for_opponents() {
        let mut mgr = manager(3, Vec::new());
        let spawned = mgr.spawn_sent(CreepKind::Ghost, 1);
        assert_eq!(spawned.len(), 2);
        assert!(spawned.iter().all(|info| info.owner != 1));
        assert!(spawned.iter().all(|info| info.sent_by == Some(1)));
    }

    #[test]
    fn swarm_sends_spawn_in_groups() {
        let mut mgr = manager(2, Vec::new());
        let spawned = mgr.spawn_sent(CreepKind::Swarm, 0);
        assert_eq!(spawned.len(), CreepKind::Swarm.def().spawn_count as usize);
    }

    #[test]
    fn castle_impact_damages_owner_and_rewards_sender() {
        let mut mgr = manager(2, Vec::new());
        let spawned = mgr.spawn_sent(CreepKind::Ghost, 0);
        let creep_id = spawned[0].creep_id;

        // Walk the creep all the way home.
        let now = Instant::now();
        mgr.advance_all(120.0, now, true);
        let resolution = mgr.resolve();

        assert_eq!(resolution.kills.len(), 0);
        assert_eq!(resolution.castle_hits.len(), 1);
        let hit = &resolution.castle_hits[0];
        assert_eq!(hit.creep_id, creep_id);
        assert_eq!(hit.owner, 1);
        assert_eq!(hit.damage, CreepKind::Ghost.def().castle_damage);
        assert_eq!(hit.reward, Some((0, CreepKind::Ghost.hit_reward())));
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn wave_creep_castle_impact_carries_no_reward() {
        let waves = vec![Wave {
            tick: 1,
            creeps: vec![CreepKind::Runner],
        }];
        let mut mgr = manager(1, waves);
        mgr.spawn_wave_creeps(1);
        mgr.advance_all(120.0, Instant::now(), true);
        let resolution = mgr.resolve();
        assert_eq!(resolution.castle_hits.len(), 1);
        assert_eq!(resolution.castle_hits[0].reward, None);
    }

    #[test]
    fn dead_creeps_resolve_into_kills_for_the_section_owner() {
        let waves = vec![Wave {
            tick: 1,
            creeps: vec![CreepKind::Ghost],
        }];
        let mut mgr = manager(1, waves);
        let spawned = mgr.spawn_wave_creeps(1);
        let id = spawned[0].creep_id;
        mgr.get_mut(id).unwrap().take_damage(1000);

        let resolution = mgr.resolve();
        assert!(resolution.castle_hits.is_empty());
        assert_eq!(resolution.kills.len(), 1);
        assert_eq!(resolution.kills[0].owner, 0);
        assert_eq!(resolution.kills[0].reward, CreepKind::Ghost.def().kill_reward);
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn spawning_without_a_path_is_a_no_op() {
        let level = Level::parse("SGC").unwrap();
        let arena = Arena::build(&level, 1, &Default::default());
        let mut mgr = CreepManager::new(Vec::new(), &arena);
        assert!(mgr.spawn_sent(CreepKind::Ghost, 1).is_empty());
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn healer_pulses_heal_nearby_wounded_creeps() {
        let mut mgr = manager(1, Vec::new());
        // Spawned by hand so both start on the same tile.
        let healer = mgr.spawn(CreepKind::Healer, 0, None).unwrap();
        let wounded = mgr.spawn(CreepKind::Troll, 0, None).unwrap();
        mgr.get_mut(wounded.creep_id).unwrap().take_damage(100);
        let before = mgr.get(wounded.creep_id).unwrap().hitpoints;

        // Move far enough for at least one aura pulse; the troll travels
        // alongside and stays in radius (speeds differ by under half a tile
        // over this stretch).
        mgr.advance_all(4.0, Instant::now(), true);
        let after = mgr.get(wounded.creep_id).unwrap().hitpoints;
        assert!(after > before, "expected heal pulse to restore hitpoints");
        let _ = healer;
    }

    #[test]
    fn healing_can_be_disabled() {
        let mut mgr = manager(1, Vec::new());
        mgr.spawn(CreepKind::Healer, 0, None).unwrap();
        let wounded = mgr.spawn(CreepKind::Troll, 0, None).unwrap();
        mgr.get_mut(wounded.creep_id).unwrap().take_damage(100);
        let before = mgr.get(wounded.creep_id).unwrap().hitpoints;

        mgr.advance_all(4.0, Instant::now(), false);
        assert_eq!(mgr.get(wounded.creep_id).unwrap().hitpoints, before);
    }
}
