//! The tower subsystem.
//!
//! Owns every placed tower: per-tick cooldowns, furthest-along-path target
//! selection, direct damage, and splash/slow application driven purely by
//! the definition's data. All of a tick's attacks are batched into one
//! outbound event by the match session.

use crate::config::FeatureConfig;
use crate::creeps::CreepManager;
use crate::entity::{Tower, TowerKind};
use glam::UVec2;
use protocol::AttackInfo;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One tower firing once, tagged with its owner for stats attribution.
#[derive(Debug, Clone)]
pub struct TowerFire {
    pub owner: u8,
    pub attack: AttackInfo,
}

/// Manages all towers of a match.
pub struct TowerManager {
    next_id: u32,
    towers: BTreeMap<u32, Tower>,
    tick_interval_ms: u64,
}

impl TowerManager {
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            next_id: 1,
            towers: BTreeMap::new(),
            tick_interval_ms,
        }
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Register a new tower and return it.
    pub fn place(&mut self, kind: TowerKind, owner: u8, tile: UVec2) -> &Tower {
        let id = self.next_id;
        self.next_id += 1;
        let tower = Tower::new(id, kind, owner, tile);
        debug!(
            "Tower {} added at ({}, {}) for player {}",
            id, tile.x, tile.y, owner
        );
        self.towers.entry(id).or_insert(tower)
    }

    /// Re-insert a tower captured in a snapshot, keeping the id counter ahead
    /// of every restored id.
    pub fn insert_restored(&mut self, tower: Tower) {
        self.next_id = self.next_id.max(tower.id + 1);
        self.towers.insert(tower.id, tower);
    }

    pub fn get(&self, id: u32) -> Option<&Tower> {
        self.towers.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tower> {
        self.towers.values()
    }

    pub fn count(&self) -> usize {
        self.towers.len()
    }

    /// Process one game tick: cool every tower down, fire the ready ones.
    pub fn tick(
        &mut self,
        creeps: &mut CreepManager,
        features: &FeatureConfig,
        now: Instant,
    ) -> Vec<TowerFire> {
        let tick_ms = self.tick_interval_ms;
        let mut fires = Vec::new();

        let ids: Vec<u32> = self.towers.keys().copied().collect();
        for id in ids {
            let tower = self
                .towers
                .get_mut(&id)
                .expect("tower ids were snapshotted this tick");
            tower.tick_cooldown();
            if !tower.ready() {
                continue;
            }

            let Some(target_id) = find_target(tower, creeps) else {
                continue;
            };

            tower.fire(tick_ms);
            let def = tower.kind.def();
            let owner = tower.owner;
            let tower_pos = tower.center();

            let slow = (features.slow_effects && def.has_slow())
                .then(|| (def.slow_factor, Duration::from_millis(def.slow_duration_ms)));

            let target = creeps
                .get_mut(target_id)
                .expect("target was selected from live creeps");
            target.take_damage(def.damage);
            if let Some((factor, duration)) = slow {
                target.apply_slow(factor, duration, now);
            }
            let target_pos = target.pos;
            trace!(
                "Tower {} fired at creep {}, dealt {} damage (HP: {})",
                id, target_id, def.damage, target.hitpoints
            );

            fires.push(TowerFire {
                owner,
                attack: AttackInfo {
                    tower_id: id,
                    tower_pos,
                    target_id,
                    target_pos,
                    damage: def.damage,
                    bullet: def.bullet.to_string(),
                },
            });

            if features.splash_damage && def.has_splash() {
                let victims: Vec<u32> = creeps
                    .iter()
                    .filter(|c| {
                        c.id != target_id
                            && c.owner == owner
                            && !c.is_dead()
                            && !c.has_reached_castle()
                            && c.pos.distance(target_pos) <= def.splash_radius
                    })
                    .map(|c| c.id)
                    .collect();
                for victim_id in victims {
                    if let Some(victim) = creeps.get_mut(victim_id) {
                        victim.take_damage(def.damage);
                        if let Some((factor, duration)) = slow {
                            victim.apply_slow(factor, duration, now);
                        }
                    }
                }
            }
        }

        fires
    }
}

/// Furthest-along-path targeting: among the owner's live creeps in range,
/// the highest path index wins; ties keep the first found.
fn find_target(tower: &Tower, creeps: &CreepManager) -> Option<u32> {
    let def = tower.kind.def();
    let center = tower.center();
    let mut best: Option<(u32, usize)> = None;

    for creep in creeps.iter() {
        if creep.is_dead() || creep.has_reached_castle() || creep.owner != tower.owner {
            continue;
        }
        if center.distance(creep.pos) > def.range {
            continue;
        }
        if best.is_none_or(|(_, index)| creep.path_index > index) {
            best = Some((creep.id, creep.path_index));
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CreepKind;
    use crate::level::Level;
    use crate::map::{Arena, RoadGenerator};

    fn creeps_on(text: &str) -> CreepManager {
        let level = Level::parse(text).unwrap();
        let roads = RoadGenerator::with_seed(2).generate(&level);
        let arena = Arena::build(&level, 2, &roads);
        CreepManager::new(Vec::new(), &arena)
    }

    fn features() -> FeatureConfig {
        FeatureConfig::default()
    }

    /// Spawn a creep and walk it a given number of seconds along its path.
    fn walked_creep(mgr: &mut CreepManager, owner: u8, secs: f32) -> u32 {
        let sender = if owner == 0 { 1 } else { 0 };
        let id = mgr.spawn_sent(CreepKind::Tank, sender)[0].creep_id;
        let now = Instant::now();
        let path = mgr.path_for(owner).to_vec();
        mgr.get_mut(id).unwrap().advance(&path, secs, now);
        id
    }

    #[test]
    fn targets_the_creep_furthest_along_the_path() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        let behind = walked_creep(&mut mgr, 0, 2.0);
        let ahead = walked_creep(&mut mgr, 0, 6.0);
        assert!(mgr.get(ahead).unwrap().path_index > mgr.get(behind).unwrap().path_index);

        let mut towers = TowerManager::new(200);
        towers.place(TowerKind::Sniper, 0, UVec2::new(4, 1));

        let fires = towers.tick(&mut mgr, &features(), Instant::now());
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].attack.target_id, ahead);
    }

    #[test]
    fn never_targets_another_sections_creeps() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        walked_creep(&mut mgr, 1, 3.0);

        let mut towers = TowerManager::new(200);
        // Player 0's tower sits inside player 1's section spatially, but only
        // player 0's creeps are eligible.
        towers.place(TowerKind::Sniper, 0, UVec2::new(12, 1));
        let fires = towers.tick(&mut mgr, &features(), Instant::now());
        assert!(fires.is_empty());
    }

    #[test]
    fn out_of_range_creeps_are_ignored() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        walked_creep(&mut mgr, 0, 0.1); // barely off the spawner

        let mut towers = TowerManager::new(200);
        towers.place(TowerKind::Rapid, 0, UVec2::new(8, 1)); // range 2.0
        let fires = towers.tick(&mut mgr, &features(), Instant::now());
        assert!(fires.is_empty());
    }

    #[test]
    fn firing_applies_damage_and_resets_cooldown() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        let target = walked_creep(&mut mgr, 0, 3.0);
        let before = mgr.get(target).unwrap().hitpoints;

        let mut towers = TowerManager::new(200);
        let tower_id = towers.place(TowerKind::Sniper, 0, UVec2::new(4, 1)).id;

        let now = Instant::now();
        let fires = towers.tick(&mut mgr, &features(), now);
        assert_eq!(fires.len(), 1);
        assert_eq!(
            mgr.get(target).unwrap().hitpoints,
            before - TowerKind::Sniper.def().damage
        );
        assert_eq!(
            towers.get(tower_id).unwrap().cooldown_remaining,
            TowerKind::Sniper.def().cooldown_ticks(200)
        );

        // Still cooling next tick: no second shot.
        let fires = towers.tick(&mut mgr, &features(), now);
        assert!(fires.is_empty());
    }

    #[test]
    fn splash_hits_other_creeps_near_the_target() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        // Two tanks walked the same distance travel as a pack.
        let first = walked_creep(&mut mgr, 0, 3.0);
        let second = walked_creep(&mut mgr, 0, 3.0);
        let far = walked_creep(&mut mgr, 0, 0.1);
        let second_before = mgr.get(second).unwrap().hitpoints;
        let far_before = mgr.get(far).unwrap().hitpoints;

        let mut towers = TowerManager::new(200);
        towers.place(TowerKind::Splash, 0, UVec2::new(2, 1));
        towers.tick(&mut mgr, &features(), Instant::now());

        let damage = TowerKind::Splash.def().damage;
        // Primary target and the packmate both take the hit.
        assert_eq!(
            mgr.get(first).unwrap().hitpoints,
            CreepKind::Tank.def().max_hitpoints - damage
        );
        assert_eq!(mgr.get(second).unwrap().hitpoints, second_before - damage);
        // The straggler is outside the splash radius.
        assert_eq!(mgr.get(far).unwrap().hitpoints, far_before);
    }

    #[test]
    fn slow_towers_slow_their_target() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        let target = walked_creep(&mut mgr, 0, 2.0);

        let mut towers = TowerManager::new(200);
        towers.place(TowerKind::Slow, 0, UVec2::new(2, 1));
        let now = Instant::now();
        towers.tick(&mut mgr, &features(), now);

        let creep = mgr.get(target).unwrap();
        assert!(creep.is_slowed(now));
        assert_eq!(creep.active_slow(now), TowerKind::Slow.def().slow_factor);
    }

    #[test]
    fn disabled_features_leave_effects_off() {
        let mut mgr = creeps_on("SGGGGGGGC\nGGGGGGGGG");
        let target = walked_creep(&mut mgr, 0, 2.0);
        let packmate = walked_creep(&mut mgr, 0, 2.0);
        let packmate_before = mgr.get(packmate).unwrap().hitpoints;

        let features = FeatureConfig {
            splash_damage: false,
            slow_effects: false,
            ..FeatureConfig::default()
        };

        let mut towers = TowerManager::new(200);
        towers.place(TowerKind::Slow, 0, UVec2::new(2, 1));
        towers.place(TowerKind::Splash, 0, UVec2::new(3, 1));
        let now = Instant::now();
        towers.tick(&mut mgr, &features, now);

        assert!(!mgr.get(target).unwrap().is_slowed(now));
        // Only direct hits landed; no splash damage on the packmate beyond
        // its own targeted hit, if any.
        assert!(mgr.get(packmate).unwrap().hitpoints >= packmate_before - 35);
    }
}
