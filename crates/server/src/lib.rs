//! Rampart match server library.
//!
//! A tick-driven simulation engine for multiplayer tower defense: each match
//! generates its arena, schedules creep waves, resolves tower combat and the
//! resource economy, and manages the player connection lifecycle. Transport
//! and persistence stay behind the [`session`] seams.

pub mod config;
pub mod creeps;
pub mod economy;
pub mod entity;
pub mod game;
pub mod level;
pub mod map;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod towers;
pub mod wave;

// Re-export commonly used types
pub use config::Config;
pub use game::{MatchHandle, MatchState, Phase, RejectReason, run_match_loop};
pub use session::{
    ChannelSession, MemoryStatsSink, NullStatsSink, PlayerIdentity, Session, StatsSink,
};
