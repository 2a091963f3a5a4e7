//! Creeps: hostile units walking a section's path toward the castle.

use crate::economy::{Cost, Reward};
use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Global movement multiplier applied on top of per-kind speed.
pub const SPEED_MULTIPLIER: f32 = 2.0;

/// Every creep kind in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreepKind {
    Ghost,
    Troll,
    Runner,
    Tank,
    Healer,
    Swarm,
}

/// Periodic healing aura carried by support creeps.
#[derive(Debug, Clone, Copy)]
pub struct HealerAura {
    pub amount: u32,
    pub radius: f32,
    /// Distance travelled between pulses, in tiles.
    pub period_tiles: f32,
}

/// Static stats of one creep kind.
#[derive(Debug, Clone)]
pub struct CreepDef {
    pub id: &'static str,
    /// Base movement rate before the global multiplier and slow effects.
    pub tiles_per_second: f32,
    pub max_hitpoints: u32,
    /// Damage dealt to the owner when the creep reaches the castle.
    pub castle_damage: u32,
    pub kill_reward: Reward,
    pub send_cost: Cost,
    /// Instances spawned per send (swarms come in groups).
    pub spawn_count: u32,
    pub heal: Option<HealerAura>,
}

// Fast, weak creep - good for overwhelming single-target towers
static GHOST: CreepDef = CreepDef {
    id: "GHOST",
    tiles_per_second: 10.0 / 30.0,
    max_hitpoints: 50,
    castle_damage: 1,
    kill_reward: Reward::gold(5),
    send_cost: Cost::gold(10),
    spawn_count: 1,
    heal: None,
};

// Slow, tanky creep - good against low-DPS towers
static TROLL: CreepDef = CreepDef {
    id: "TROLL",
    tiles_per_second: 10.0 / 25.0,
    max_hitpoints: 250,
    castle_damage: 2,
    kill_reward: Reward::gold(15),
    send_cost: Cost::gold(30),
    spawn_count: 1,
    heal: None,
};

// Very fast, very weak - cheap and overwhelming
static RUNNER: CreepDef = CreepDef {
    id: "RUNNER",
    tiles_per_second: 10.0 / 20.0,
    max_hitpoints: 25,
    castle_damage: 1,
    kill_reward: Reward::gold(3),
    send_cost: Cost::gold(5),
    spawn_count: 1,
    heal: None,
};

// Very slow, massive HP - high risk/reward
static TANK: CreepDef = CreepDef {
    id: "TANK",
    tiles_per_second: 10.0 / 40.0,
    max_hitpoints: 500,
    castle_damage: 3,
    kill_reward: Reward::gold(30),
    send_cost: Cost::gold(60),
    spawn_count: 1,
    heal: None,
};

// Medium stats, heals nearby creeps - synergy creep
static HEALER: CreepDef = CreepDef {
    id: "HEALER",
    tiles_per_second: 10.0 / 30.0,
    max_hitpoints: 80,
    castle_damage: 1,
    kill_reward: Reward::gold(10),
    send_cost: Cost::gold(25),
    spawn_count: 1,
    heal: Some(HealerAura {
        amount: 15,
        radius: 1.5,
        period_tiles: 2.0,
    }),
};

// Very fast, extremely weak - spawns in groups
static SWARM: CreepDef = CreepDef {
    id: "SWARM",
    tiles_per_second: 10.0 / 25.0,
    max_hitpoints: 15,
    castle_damage: 1,
    kill_reward: Reward::gold(2),
    send_cost: Cost::gold(8),
    spawn_count: 5,
    heal: None,
};

impl CreepKind {
    pub const ALL: [CreepKind; 6] = [
        CreepKind::Ghost,
        CreepKind::Troll,
        CreepKind::Runner,
        CreepKind::Tank,
        CreepKind::Healer,
        CreepKind::Swarm,
    ];

    pub fn def(self) -> &'static CreepDef {
        match self {
            CreepKind::Ghost => &GHOST,
            CreepKind::Troll => &TROLL,
            CreepKind::Runner => &RUNNER,
            CreepKind::Tank => &TANK,
            CreepKind::Healer => &HEALER,
            CreepKind::Swarm => &SWARM,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.def().id.eq_ignore_ascii_case(id))
    }

    /// Reward paid to the sender when a sent creep reaches the enemy castle:
    /// the send cost back in gold plus a flat bonus.
    pub fn hit_reward(self) -> Reward {
        Reward::gold(self.def().send_cost.gold + 5)
    }
}

/// Center of a tile in continuous coordinates.
pub(crate) fn tile_center(pos: UVec2) -> Vec2 {
    Vec2::new(pos.x as f32 + 0.5, pos.y as f32 + 0.5)
}

/// One active creep.
#[derive(Debug, Clone)]
pub struct Creep {
    pub id: u32,
    pub kind: CreepKind,
    /// Player whose castle this creep threatens.
    pub owner: u8,
    /// Player who sent it, or `None` for wave spawns.
    pub sent_by: Option<u8>,
    pub pos: Vec2,
    pub path_index: usize,
    pub hitpoints: u32,
    slow_factor: f32,
    slow_until: Option<Instant>,
    reached_castle: bool,
    tiles_travelled: f32,
    last_heal_pulse: f32,
}

impl Creep {
    pub fn new(id: u32, kind: CreepKind, owner: u8, sent_by: Option<u8>, spawner: UVec2) -> Self {
        Self {
            id,
            kind,
            owner,
            sent_by,
            pos: tile_center(spawner),
            path_index: 0,
            hitpoints: kind.def().max_hitpoints,
            slow_factor: 0.0,
            slow_until: None,
            reached_castle: false,
            tiles_travelled: 0.0,
            last_heal_pulse: 0.0,
        }
    }

    /// Rebuild a creep from captured state (snapshot restore).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: u32,
        kind: CreepKind,
        owner: u8,
        sent_by: Option<u8>,
        pos: Vec2,
        path_index: usize,
        hitpoints: u32,
        slow_factor: f32,
        slow_remaining: Option<Duration>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            kind,
            owner,
            sent_by,
            pos,
            path_index,
            hitpoints,
            slow_factor,
            slow_until: slow_remaining.map(|d| now + d),
            reached_castle: false,
            tiles_travelled: 0.0,
            last_heal_pulse: 0.0,
        }
    }

    /// Advance along the path by one elapsed-time slice. Leftover movement
    /// budget rolls over past waypoints, so two ticks of T land exactly where
    /// one call of 2T would.
    pub fn advance(&mut self, path: &[UVec2], dt: f32, now: Instant) {
        if self.reached_castle || path.is_empty() {
            return;
        }

        let speed =
            self.kind.def().tiles_per_second * (1.0 - self.active_slow(now)) * SPEED_MULTIPLIER;
        let mut budget = speed * dt;

        while budget > 0.0 && self.path_index < path.len() {
            let target = tile_center(path[self.path_index]);
            let delta = target - self.pos;
            let distance = delta.length();

            if distance <= budget {
                self.pos = target;
                budget -= distance;
                self.tiles_travelled += distance;
                self.path_index += 1;
            } else {
                self.pos += delta / distance * budget;
                self.tiles_travelled += budget;
                budget = 0.0;
            }
        }

        if self.path_index >= path.len() {
            self.reached_castle = true;
        }
    }

    /// Apply a slow effect: strongest wins, and an expired effect is always
    /// replaced. No additive stacking.
    pub fn apply_slow(&mut self, factor: f32, duration: Duration, now: Instant) {
        if factor > self.slow_factor || !self.is_slowed(now) {
            self.slow_factor = factor;
            self.slow_until = Some(now + duration);
        }
    }

    pub fn is_slowed(&self, now: Instant) -> bool {
        self.slow_factor > 0.0 && self.slow_until.is_some_and(|until| now < until)
    }

    /// The factor currently in effect, zero once expired.
    pub fn active_slow(&self, now: Instant) -> f32 {
        if self.is_slowed(now) { self.slow_factor } else { 0.0 }
    }

    /// Remaining slow duration at `now`, for snapshots.
    pub fn slow_remaining(&self, now: Instant) -> Option<Duration> {
        if self.is_slowed(now) {
            self.slow_until.map(|until| until - now)
        } else {
            None
        }
    }

    pub fn stored_slow_factor(&self) -> f32 {
        self.slow_factor
    }

    pub fn take_damage(&mut self, damage: u32) {
        self.hitpoints = self.hitpoints.saturating_sub(damage);
    }

    pub fn heal(&mut self, amount: u32) {
        self.hitpoints = (self.hitpoints + amount).min(self.kind.def().max_hitpoints);
    }

    pub fn is_dead(&self) -> bool {
        self.hitpoints == 0
    }

    pub fn has_reached_castle(&self) -> bool {
        self.reached_castle
    }

    /// True once per travelled aura period; only healers ever return true.
    pub fn heal_pulse_due(&mut self) -> bool {
        let Some(aura) = self.kind.def().heal else {
            return false;
        };
        if self.tiles_travelled - self.last_heal_pulse >= aura.period_tiles {
            self.last_heal_pulse = self.tiles_travelled;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_path(len: u32) -> Vec<UVec2> {
        (1..=len).map(|x| UVec2::new(x, 0)).collect()
    }

    #[test]
    fn movement_is_frame_rate_independent() {
        let path = straight_path(10);
        let now = Instant::now();

        let mut two_ticks = Creep::new(1, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        two_ticks.advance(&path, 0.2, now);
        two_ticks.advance(&path, 0.2, now);

        let mut one_call = Creep::new(2, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        one_call.advance(&path, 0.4, now);

        assert!((two_ticks.pos - one_call.pos).length() < 1e-4);
        assert_eq!(two_ticks.path_index, one_call.path_index);
    }

    #[test]
    fn leftover_budget_rolls_over_waypoints() {
        let path = straight_path(3);
        let now = Instant::now();
        let mut creep = Creep::new(1, CreepKind::Runner, 0, None, UVec2::new(0, 0));
        // Runner covers 1 tile/s; 2.5 s crosses two waypoints and half of the
        // next segment.
        creep.advance(&path, 2.5, now);
        assert_eq!(creep.path_index, 2);
        assert!((creep.pos.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn finishing_the_path_reaches_the_castle() {
        let path = straight_path(2);
        let now = Instant::now();
        let mut creep = Creep::new(1, CreepKind::Runner, 0, None, UVec2::new(0, 0));
        creep.advance(&path, 60.0, now);
        assert!(creep.has_reached_castle());
        // Terminal creeps stop moving.
        let parked = creep.pos;
        creep.advance(&path, 1.0, now);
        assert_eq!(creep.pos, parked);
    }

    #[test]
    fn weaker_slow_does_not_replace_a_stronger_one() {
        let now = Instant::now();
        let mut creep = Creep::new(1, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        creep.apply_slow(0.5, Duration::from_millis(2500), now);
        let expiry = creep.slow_until;

        creep.apply_slow(0.3, Duration::from_millis(9000), now);
        assert_eq!(creep.active_slow(now), 0.5);
        assert_eq!(creep.slow_until, expiry);

        // Equal factor is also ignored while the current effect is active.
        creep.apply_slow(0.5, Duration::from_millis(9000), now);
        assert_eq!(creep.slow_until, expiry);
    }

    #[test]
    fn stronger_slow_replaces_the_active_one() {
        let now = Instant::now();
        let mut creep = Creep::new(1, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        creep.apply_slow(0.3, Duration::from_millis(2000), now);
        creep.apply_slow(0.6, Duration::from_millis(500), now);
        assert_eq!(creep.active_slow(now), 0.6);
    }

    #[test]
    fn any_slow_replaces_an_expired_one() {
        let start = Instant::now();
        let mut creep = Creep::new(1, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        creep.apply_slow(0.5, Duration::from_millis(100), start);

        let later = start + Duration::from_millis(200);
        assert!(!creep.is_slowed(later));
        creep.apply_slow(0.2, Duration::from_millis(1000), later);
        assert_eq!(creep.active_slow(later), 0.2);
    }

    #[test]
    fn slow_reduces_effective_speed() {
        let path = straight_path(10);
        let now = Instant::now();
        let mut slowed = Creep::new(1, CreepKind::Runner, 0, None, UVec2::new(0, 0));
        slowed.apply_slow(0.5, Duration::from_secs(10), now);
        slowed.advance(&path, 1.0, now);

        let mut free = Creep::new(2, CreepKind::Runner, 0, None, UVec2::new(0, 0));
        free.advance(&path, 1.0, now);

        assert!(slowed.pos.x < free.pos.x);
        assert!((slowed.pos.x - 1.0).abs() < 1e-4); // half of the free tile
    }

    #[test]
    fn healing_clamps_to_max() {
        let mut creep = Creep::new(1, CreepKind::Healer, 0, None, UVec2::new(0, 0));
        creep.take_damage(30);
        creep.heal(100);
        assert_eq!(creep.hitpoints, CreepKind::Healer.def().max_hitpoints);
    }

    #[test]
    fn heal_pulses_follow_travelled_distance() {
        let path = straight_path(9);
        let now = Instant::now();
        let mut healer = Creep::new(1, CreepKind::Healer, 0, None, UVec2::new(0, 0));
        assert!(!healer.heal_pulse_due());

        // Healer moves 10/30 * 2 tiles/s; 3.3 s of travel crosses 2 tiles.
        healer.advance(&path, 3.3, now);
        assert!(healer.heal_pulse_due());
        assert!(!healer.heal_pulse_due());

        let mut ghost = Creep::new(2, CreepKind::Ghost, 0, None, UVec2::new(0, 0));
        ghost.advance(&path, 3.3, now);
        assert!(!ghost.heal_pulse_due());
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut creep = Creep::new(1, CreepKind::Swarm, 0, None, UVec2::new(0, 0));
        creep.take_damage(1000);
        assert_eq!(creep.hitpoints, 0);
        assert!(creep.is_dead());
    }
}
