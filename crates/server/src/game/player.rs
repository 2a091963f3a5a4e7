//! Match-scoped player state.

use crate::config::PlayerConfig;
use crate::economy::Stockpile;
use crate::session::{PlayerIdentity, Session};
use protocol::Event;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One player of a running match. The session behind it can be swapped on
/// reconnection; everything else lives for the whole match.
pub struct MatchPlayer {
    pub number: u8,
    pub color_index: u8,
    session: Arc<dyn Session>,
    pub hitpoints: u32,
    pub max_hitpoints: u32,
    pub stockpile: Stockpile,
    alive: bool,
    disconnected_since: Option<Instant>,
}

impl MatchPlayer {
    pub fn new(number: u8, color_index: u8, session: Arc<dyn Session>, config: &PlayerConfig) -> Self {
        Self {
            number,
            color_index,
            session,
            hitpoints: config.starting_hitpoints,
            max_hitpoints: config.starting_hitpoints,
            stockpile: Stockpile::new(config.starting_resources, config.base_production),
            alive: true,
            disconnected_since: None,
        }
    }

    pub fn identity(&self) -> &PlayerIdentity {
        self.session.identity()
    }

    pub fn name(&self) -> &str {
        &self.identity().name
    }

    /// Deliver an event; dropped silently while disconnected.
    pub fn send(&self, event: Event) {
        if self.is_connected() {
            self.session.send(event);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.disconnected_since.is_none()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Score shown on the scoreboard; hit points double as score.
    pub fn score(&self) -> u32 {
        self.hitpoints
    }

    pub fn mark_disconnected(&mut self, now: Instant) {
        self.disconnected_since = Some(now);
    }

    /// Swap in the new session and clear the disconnect mark.
    pub fn reconnect(&mut self, session: Arc<dyn Session>) {
        self.session = session;
        self.disconnected_since = None;
    }

    pub fn disconnected_for(&self, now: Instant) -> Option<Duration> {
        self.disconnected_since.map(|since| now - since)
    }

    /// Returns the remaining hit points.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.hitpoints = self.hitpoints.saturating_sub(damage);
        if self.hitpoints == 0 {
            self.alive = false;
        }
        self.hitpoints
    }

    pub fn heal(&mut self, amount: u32) {
        if self.alive {
            self.hitpoints = (self.hitpoints + amount).min(self.max_hitpoints);
        }
    }

    /// Grace-period expiry and immediate forfeits both end here.
    pub fn forfeit(&mut self) {
        self.alive = false;
    }

    /// Restore captured vitals (snapshot restore).
    pub fn restore(&mut self, hitpoints: u32, alive: bool, stockpile: Stockpile) {
        self.hitpoints = hitpoints;
        self.alive = alive;
        self.stockpile = stockpile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChannelSession;

    fn player() -> MatchPlayer {
        let (session, _rx) = ChannelSession::new(PlayerIdentity::new(1, "alice"));
        MatchPlayer::new(0, 0, Arc::new(session), &PlayerConfig::default())
    }

    #[test]
    fn damage_is_floored_and_kills_at_zero() {
        let mut p = player();
        assert_eq!(p.take_damage(5), 15);
        assert!(p.is_alive());
        assert_eq!(p.take_damage(100), 0);
        assert!(!p.is_alive());
    }

    #[test]
    fn healing_clamps_to_max_and_skips_the_dead() {
        let mut p = player();
        p.take_damage(10);
        p.heal(100);
        assert_eq!(p.hitpoints, p.max_hitpoints);

        p.take_damage(100);
        p.heal(5);
        assert_eq!(p.hitpoints, 0);
    }

    #[test]
    fn disconnect_tracking() {
        let mut p = player();
        let now = Instant::now();
        assert!(p.is_connected());
        p.mark_disconnected(now);
        assert!(!p.is_connected());
        assert!(p.disconnected_for(now + Duration::from_secs(3)).unwrap() >= Duration::from_secs(3));

        let (session, _rx) = ChannelSession::new(PlayerIdentity::new(1, "alice"));
        p.reconnect(Arc::new(session));
        assert!(p.is_connected());
        assert!(p.disconnected_for(now).is_none());
    }
}
