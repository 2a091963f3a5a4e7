//! Collaborator seams toward the transport and persistence layers.
//!
//! The engine never touches sockets or storage: it talks to a [`Session`]
//! per player and one [`StatsSink`] per process. Both are fire-and-forget;
//! nothing in the tick pipeline blocks on I/O.

use crate::stats::StatsEvent;
use protocol::Event;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// Stable identity of a player across connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub user_id: u64,
    pub name: String,
}

impl PlayerIdentity {
    pub fn new(user_id: u64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

/// One connected client, as the transport layer exposes it to the engine.
/// Sends must hand events off without blocking.
pub trait Session: Send + Sync {
    fn send(&self, event: Event);
    fn identity(&self) -> &PlayerIdentity;
    fn is_connected(&self) -> bool;
}

/// Statistics collaborator, fed match events and the final outcome.
pub trait StatsSink: Send + Sync {
    fn record(&self, player: u8, event: StatsEvent);
    fn finalize(&self, match_id: u64, winner: Option<&PlayerIdentity>);
}

/// Channel-backed session: events are queued on an unbounded channel the
/// transport layer drains at its own pace.
pub struct ChannelSession {
    identity: PlayerIdentity,
    tx: UnboundedSender<Event>,
}

impl ChannelSession {
    pub fn new(identity: PlayerIdentity) -> (Self, UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { identity, tx }, rx)
    }
}

impl Session for ChannelSession {
    fn send(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("Dropping event for {}: receiver gone", self.identity.name);
        }
    }

    fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Discards everything. Default sink when no stats backend is wired up.
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn record(&self, _player: u8, _event: StatsEvent) {}
    fn finalize(&self, _match_id: u64, _winner: Option<&PlayerIdentity>) {}
}

/// In-memory sink for tests and the demo binary.
#[derive(Default)]
pub struct MemoryStatsSink {
    records: Mutex<Vec<(u8, StatsEvent)>>,
    finalized: Mutex<Option<(u64, Option<PlayerIdentity>)>>,
}

impl MemoryStatsSink {
    pub fn records(&self) -> Vec<(u8, StatsEvent)> {
        self.records.lock().expect("stats mutex poisoned").clone()
    }

    pub fn finalized(&self) -> Option<(u64, Option<PlayerIdentity>)> {
        self.finalized.lock().expect("stats mutex poisoned").clone()
    }
}

impl StatsSink for MemoryStatsSink {
    fn record(&self, player: u8, event: StatsEvent) {
        self.records
            .lock()
            .expect("stats mutex poisoned")
            .push((player, event));
    }

    fn finalize(&self, match_id: u64, winner: Option<&PlayerIdentity>) {
        *self.finalized.lock().expect("stats mutex poisoned") =
            Some((match_id, winner.cloned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_session_queues_events() {
        let (session, mut rx) = ChannelSession::new(PlayerIdentity::new(1, "alice"));
        assert!(session.is_connected());
        session.send(Event::Countdown { seconds: 5 });
        assert_eq!(rx.try_recv().unwrap(), Event::Countdown { seconds: 5 });

        drop(rx);
        assert!(!session.is_connected());
        // Sending into a closed channel must not panic.
        session.send(Event::Countdown { seconds: 1 });
    }

    #[test]
    fn memory_sink_collects_records() {
        let sink = MemoryStatsSink::default();
        sink.record(0, StatsEvent::TowerBuilt { kind: 1 });
        sink.finalize(9, Some(&PlayerIdentity::new(2, "bob")));
        assert_eq!(sink.records().len(), 1);
        let (match_id, winner) = sink.finalized().unwrap();
        assert_eq!(match_id, 9);
        assert_eq!(winner.unwrap().name, "bob");
    }
}
