//! Rampart match server.
//!
//! The transport layer that feeds real player sessions into the engine lives
//! in a separate service; this binary wires one offline demo match with
//! channel-backed sessions so the simulation can be observed end to end.

use server::{ChannelSession, Config, MatchHandle, NullStatsSink, Phase, PlayerIdentity, Session};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Rampart Match Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration");
    info!("  Tick interval: {}ms", config.game.tick_interval_ms);
    info!("  Level: {}", config.level.level_path);
    info!("  Grace period: {}s", config.game.grace_period_secs);

    // Demo roster: two channel-backed sessions whose events are logged.
    let mut roster: Vec<Arc<dyn Session>> = Vec::new();
    for (user_id, name) in [(1, "alice"), (2, "bob")] {
        let (session, mut rx) = ChannelSession::new(PlayerIdentity::new(user_id, name));
        roster.push(Arc::new(session));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!("[{}] {:?}", name, event);
            }
        });
    }

    let handle = MatchHandle::start(config, roster, Arc::new(NullStatsSink));
    info!("Demo match started");

    // Run until the wave schedule decides the match.
    while handle.phase().await != Phase::Ended {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    handle.join().await;
    info!("Demo match finished");

    Ok(())
}
