//! Match session: tick scheduler and player/connection lifecycle.
//!
//! One match is one `MatchState` behind an `Arc<RwLock>`: the fixed-rate
//! tick task and the transport layer's command tasks both mutate it under
//! the write lock, which makes tile placement and resource debits atomic by
//! construction. Events leave through per-player sessions without blocking.

pub mod commands;
pub mod player;

pub use commands::RejectReason;
pub use player::MatchPlayer;

use crate::config::Config;
use crate::creeps::{CastleHit, CreepKill, CreepManager, CreepResolution};
use crate::economy::Reward;
use crate::level::{Level, LoadError};
use crate::map::{Arena, RoadGenerator};
use crate::session::{Session, StatsSink};
use crate::stats::{MatchStats, StatsEvent};
use crate::towers::TowerManager;
use crate::wave;
use futures_util::FutureExt;
use protocol::{Event, PlayerColor, ScoreEntry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant as TokioInstant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info, warn};

static NEXT_MATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Countdown,
    Running,
    Ended,
}

/// All state of one running match.
pub struct MatchState {
    pub config: Config,
    match_id: u64,
    phase: Phase,
    tick_count: u64,
    resource_tick_counter: u32,
    players: Vec<MatchPlayer>,
    arena: Option<Arena>,
    creeps: Option<CreepManager>,
    towers: Option<TowerManager>,
    stats: MatchStats,
    sink: Arc<dyn StatsSink>,
    winner: Option<u8>,
}

impl MatchState {
    /// Create the match from the lobby roster. Player numbers and colors
    /// follow roster order.
    pub fn new(config: Config, roster: Vec<Arc<dyn Session>>, sink: Arc<dyn StatsSink>) -> Self {
        let players = roster
            .into_iter()
            .enumerate()
            .map(|(i, session)| MatchPlayer::new(i as u8, i as u8, session, &config.player))
            .collect();
        Self {
            config,
            match_id: NEXT_MATCH_ID.fetch_add(1, Ordering::Relaxed),
            phase: Phase::Countdown,
            tick_count: 0,
            resource_tick_counter: 0,
            players,
            arena: None,
            creeps: None,
            towers: None,
            stats: MatchStats::default(),
            sink,
            winner: None,
        }
    }

    pub fn match_id(&self) -> u64 {
        self.match_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn winner(&self) -> Option<u8> {
        self.winner
    }

    pub fn players(&self) -> &[MatchPlayer] {
        &self.players
    }

    pub fn player(&self, number: u8) -> Option<&MatchPlayer> {
        self.players.get(number as usize)
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    pub fn creep_manager(&self) -> Option<&CreepManager> {
        self.creeps.as_ref()
    }

    pub fn tower_manager(&self) -> Option<&TowerManager> {
        self.towers.as_ref()
    }

    pub fn active_creep_count(&self) -> usize {
        self.creeps.as_ref().map_or(0, CreepManager::active_count)
    }

    /// Load the level, generate roads, build the combined arena and the wave
    /// schedule. Failure here is fatal for the match: it never leaves its
    /// countdown.
    pub fn load_assets(&mut self) -> Result<(), LoadError> {
        let level = Level::load(&self.config.level.level_path)?;
        let roads = RoadGenerator::new().generate(&level);
        let arena = Arena::build(&level, self.players.len() as u8, &roads);
        info!(
            "Created combined arena {}x{} for {} players with {} roads per section",
            arena.width(),
            arena.height(),
            self.players.len(),
            roads.len()
        );

        let waves = wave::load(&self.config.level.waves_path)?;
        self.creeps = Some(CreepManager::new(waves, &arena));
        self.towers = Some(TowerManager::new(self.config.game.tick_interval_ms));
        self.arena = Some(arena);
        Ok(())
    }

    /// Restore world state from a snapshot (see [`crate::snapshot`]).
    pub(crate) fn install_world(
        &mut self,
        arena: Arena,
        creeps: CreepManager,
        towers: TowerManager,
        tick_count: u64,
    ) {
        self.arena = Some(arena);
        self.creeps = Some(creeps);
        self.towers = Some(towers);
        self.tick_count = tick_count;
    }

    /// Overwrite player vitals from captured snapshots.
    pub(crate) fn restore_players(&mut self, snapshots: &[crate::snapshot::PlayerSnapshot]) {
        for snap in snapshots {
            if let Some(player) = self.players.get_mut(snap.number as usize) {
                player.restore(snap.hitpoints, snap.alive, snap.stockpile.clone());
            }
        }
    }

    /// Transition Countdown → Running and push the initial state to every
    /// session. Refused when assets never loaded.
    pub fn begin_running(&mut self) -> bool {
        if self.phase != Phase::Countdown {
            return false;
        }
        if self.arena.is_none() {
            error!(
                "Match {} countdown finished but level assets are missing; not starting",
                self.match_id
            );
            return false;
        }

        info!("Countdown finished, sending map and starting game loop");
        self.send_initial_state();
        self.phase = Phase::Running;
        true
    }

    /// Deliver an event to every connected player.
    pub fn broadcast(&self, event: Event) {
        for player in &self.players {
            player.send(event.clone());
        }
    }

    /// Deliver an event to one player.
    pub fn send_to(&self, number: u8, event: Event) {
        if let Some(player) = self.players.get(number as usize) {
            player.send(event);
        }
    }

    fn player_colors(&self) -> Vec<PlayerColor> {
        self.players
            .iter()
            .map(|p| PlayerColor {
                player: p.number,
                color_index: p.color_index,
            })
            .collect()
    }

    fn full_map_event(&self) -> Option<Event> {
        let arena = self.arena.as_ref()?;
        Some(Event::FullMap {
            width: arena.width(),
            height: arena.height(),
            section_width: arena.section_width(),
            tiles: arena.tile_infos(),
            colors: self.player_colors(),
        })
    }

    fn send_initial_state(&self) {
        info!("Sending initial map to all players");
        for player in &self.players {
            player.send(Event::PlayerInfo {
                player: player.number,
                color_index: player.color_index,
            });
        }
        if let Some(event) = self.full_map_event() {
            self.broadcast(event);
        }
        for player in &self.players {
            self.send_resource_update(player.number);
        }
        self.broadcast_scoreboard();
    }

    /// Current scoreboard, highest score first.
    pub fn scoreboard_entries(&self) -> Vec<ScoreEntry> {
        let mut entries: Vec<ScoreEntry> = self
            .players
            .iter()
            .map(|p| ScoreEntry {
                player: p.number,
                color_index: p.color_index,
                name: p.name().to_string(),
                score: p.score(),
                alive: p.is_alive(),
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    pub fn broadcast_scoreboard(&self) {
        self.broadcast(Event::Scoreboard {
            entries: self.scoreboard_entries(),
        });
    }

    pub fn send_resource_update(&self, number: u8) {
        if let Some(player) = self.players.get(number as usize) {
            player.send(Event::ResourceUpdate {
                wood: player.stockpile.wood(),
                stone: player.stockpile.stone(),
                gold: player.stockpile.gold(),
            });
        }
    }

    pub fn find_player_number(&self, user_id: u64) -> Option<u8> {
        self.players
            .iter()
            .find(|p| p.identity().user_id == user_id)
            .map(|p| p.number)
    }

    /// One fixed-rate tick: creeps spawn, move and resolve, towers fire,
    /// and on the coarse interval resources produce and grace periods are
    /// checked. Returns false once the match has ended.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.tick_count += 1;
        self.resource_tick_counter += 1;
        let dt = self.config.game.tick_interval_ms as f32 / 1000.0;
        let features = self.config.features.clone();

        // Creep spawning.
        let spawned = match self.creeps.as_mut() {
            Some(creeps) => creeps.spawn_wave_creeps(self.tick_count),
            None => Vec::new(),
        };
        if !spawned.is_empty() {
            self.broadcast(Event::CreepSpawnBatch { creeps: spawned });
        }

        // Creep movement.
        let moved = match self.creeps.as_mut() {
            Some(creeps) => creeps.advance_all(dt, now, features.healer_creeps),
            None => Vec::new(),
        };
        if !moved.is_empty() {
            self.broadcast(Event::CreepUpdateBatch { creeps: moved });
        }

        // Creep resolution.
        let resolution = match self.creeps.as_mut() {
            Some(creeps) => creeps.resolve(),
            None => CreepResolution::default(),
        };
        for kill in resolution.kills {
            self.apply_kill(kill);
        }
        for hit in resolution.castle_hits {
            self.apply_castle_hit(hit);
            if self.phase != Phase::Running {
                return false;
            }
        }

        // Tower cooldowns, targeting and firing.
        let fires = match (self.towers.as_mut(), self.creeps.as_mut()) {
            (Some(towers), Some(creeps)) => towers.tick(creeps, &features, now),
            _ => Vec::new(),
        };
        if !fires.is_empty() {
            let mut attacks = Vec::with_capacity(fires.len());
            for fire in fires {
                let event = StatsEvent::DamageDealt {
                    amount: fire.attack.damage,
                };
                self.stats.record(fire.owner, event);
                self.sink.record(fire.owner, event);
                attacks.push(fire.attack);
            }
            self.broadcast(Event::TowerAttackBatch { attacks });
        }

        // Resource production and connection upkeep on the coarse interval.
        if self.resource_tick_counter >= self.config.game.resource_interval_ticks {
            self.resource_tick_counter = 0;
            for player in &mut self.players {
                if player.is_connected() && player.is_alive() {
                    player.stockpile.tick_production();
                }
            }
            for number in 0..self.players.len() as u8 {
                if self.players[number as usize].is_connected()
                    && self.players[number as usize].is_alive()
                {
                    self.send_resource_update(number);
                }
            }
            self.check_grace_periods(now);
        }

        if self.tick_count % 25 == 0 {
            debug!(
                "Game tick {} completed, active creeps: {}",
                self.tick_count,
                self.active_creep_count()
            );
        }

        self.phase == Phase::Running
    }

    fn apply_kill(&mut self, kill: CreepKill) {
        let event = StatsEvent::CreepKilled {
            gold_earned: kill.reward.gold,
        };
        self.stats.record(kill.owner, event);
        self.sink.record(kill.owner, event);
        debug!(
            "Creep {} killed, awarding {} gold to player {}",
            kill.creep_id, kill.reward.gold, kill.owner
        );
        self.broadcast(Event::CreepDespawn(protocol::CreepDespawnInfo {
            creep_id: kill.creep_id,
            reward_gold: kill.reward.gold,
            reward_to: Some(kill.owner),
        }));
        self.award(kill.owner, kill.reward);
    }

    fn apply_castle_hit(&mut self, hit: CastleHit) {
        let Some(player) = self.players.get_mut(hit.owner as usize) else {
            return;
        };
        let hitpoints = player.take_damage(hit.damage);
        info!(
            "Creep {} reached castle, dealing {} damage to player {} (HP: {})",
            hit.creep_id, hit.damage, hit.owner, hitpoints
        );

        self.broadcast(Event::CreepDespawn(protocol::CreepDespawnInfo {
            creep_id: hit.creep_id,
            reward_gold: hit.reward.map_or(0, |(_, r)| r.gold),
            reward_to: hit.reward.map(|(sender, _)| sender),
        }));
        self.broadcast(Event::PlayerHpUpdate {
            player: hit.owner,
            hitpoints,
        });
        if let Some((sender, reward)) = hit.reward {
            self.award(sender, reward);
        }
        self.broadcast_scoreboard();

        if !self.players[hit.owner as usize].is_alive() {
            self.handle_player_death(hit.owner);
        }
    }

    /// Credit a reward to a connected, living player and push their new
    /// stock. Rewards to the departed evaporate.
    fn award(&mut self, number: u8, reward: Reward) {
        let Some(player) = self.players.get_mut(number as usize) else {
            return;
        };
        if !player.is_connected() || !player.is_alive() {
            return;
        }
        player.stockpile.add(&reward);
        if reward.hitpoints > 0 {
            player.heal(reward.hitpoints);
            let hitpoints = player.hitpoints;
            self.broadcast(Event::PlayerHpUpdate {
                player: number,
                hitpoints,
            });
        }
        self.send_resource_update(number);
    }

    /// Broadcast an elimination; when one player is left standing, crown
    /// them and end the match.
    pub fn handle_player_death(&mut self, number: u8) {
        info!("Player {} has been eliminated!", number);
        self.broadcast_scoreboard();
        self.broadcast(Event::GameOver {
            player: number,
            winner: false,
        });

        let alive: Vec<u8> = self
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.number)
            .collect();
        if alive.len() <= 1 {
            if let Some(&winner) = alive.first() {
                info!("Game over! Player {} wins!", winner);
                self.broadcast(Event::GameOver {
                    player: winner,
                    winner: true,
                });
                self.end(Some(winner));
            } else {
                self.end(None);
            }
        }
    }

    /// Mark a player disconnected and start their grace window. With the
    /// grace feature off the disconnect forfeits immediately.
    pub fn handle_disconnect(&mut self, user_id: u64, now: Instant) {
        let Some(number) = self.find_player_number(user_id) else {
            return;
        };
        let grace = self.config.game.grace_period_secs;
        let name = self.players[number as usize].name().to_string();

        self.players[number as usize].mark_disconnected(now);
        if !self.config.features.reconnect_grace {
            info!("Player {} disconnected, forfeiting immediately", number);
            self.forfeit(number);
            return;
        }

        info!("Player {} disconnected, starting {}s grace period", number, grace);
        self.broadcast(Event::Notice {
            message: format!("{name} disconnected. Waiting {grace}s for reconnection..."),
        });
        self.broadcast_scoreboard();
    }

    /// Swap in the reconnecting session and replay the full state to it.
    pub fn handle_reconnect(&mut self, user_id: u64, session: Arc<dyn Session>) {
        let Some(number) = self.find_player_number(user_id) else {
            warn!("Reconnect for unknown user {}", user_id);
            return;
        };
        self.players[number as usize].reconnect(session);
        info!("Resyncing player {} after reconnection", number);
        self.resync_player(number);
        let name = self.players[number as usize].name().to_string();
        self.broadcast(Event::Notice {
            message: format!("{name} has reconnected!"),
        });
        info!("Resync complete for player {}", number);
    }

    /// Full state replay to one session: identity, map, towers, resources,
    /// every player's hit points, scoreboard.
    fn resync_player(&self, number: u8) {
        let Some(player) = self.players.get(number as usize) else {
            return;
        };
        player.send(Event::PlayerInfo {
            player: number,
            color_index: player.color_index,
        });
        if let Some(event) = self.full_map_event() {
            player.send(event);
        }
        if let Some(towers) = &self.towers {
            let tick_ms = towers.tick_interval_ms();
            for tower in towers.iter() {
                player.send(Event::TowerPlaced {
                    tower_id: tower.id,
                    tower_kind: tower.kind.def().id,
                    owner: tower.owner,
                    x: tower.tile.x,
                    y: tower.tile.y,
                    cooldown_ticks: tower.kind.def().cooldown_ticks(tick_ms),
                });
            }
        }
        self.send_resource_update(number);
        for other in &self.players {
            player.send(Event::PlayerHpUpdate {
                player: other.number,
                hitpoints: other.hitpoints,
            });
        }
        player.send(Event::Scoreboard {
            entries: self.scoreboard_entries(),
        });
    }

    /// Forfeit every living player whose grace window has elapsed.
    fn check_grace_periods(&mut self, now: Instant) {
        let grace = Duration::from_secs(self.config.game.grace_period_secs);
        let expired: Vec<u8> = self
            .players
            .iter()
            .filter(|p| p.is_alive() && p.disconnected_for(now).is_some_and(|d| d >= grace))
            .map(|p| p.number)
            .collect();
        for number in expired {
            self.forfeit(number);
            if self.phase != Phase::Running {
                break;
            }
        }
    }

    /// Treat a disconnect-timeout like an elimination: last connected living
    /// player wins; nobody left ends the match without a winner.
    fn forfeit(&mut self, number: u8) {
        if self.phase != Phase::Running {
            return;
        }
        info!("Player {} grace period expired, treating as forfeit", number);
        self.players[number as usize].forfeit();
        self.broadcast(Event::Notice {
            message: format!("Player {number} forfeited (disconnect timeout)"),
        });
        self.broadcast(Event::GameOver {
            player: number,
            winner: false,
        });
        self.broadcast_scoreboard();

        let remaining: Vec<u8> = self
            .players
            .iter()
            .filter(|p| p.is_alive() && p.is_connected())
            .map(|p| p.number)
            .collect();
        match remaining.as_slice() {
            [winner] => {
                info!("Game over! Player {} wins by forfeit", winner);
                self.broadcast(Event::GameOver {
                    player: *winner,
                    winner: true,
                });
                self.end(Some(*winner));
            }
            [] => self.end(None),
            _ => {}
        }
    }

    /// Transition to Ended exactly once and hand the outcome to the stats
    /// collaborator.
    pub fn end(&mut self, winner: Option<u8>) {
        if self.phase == Phase::Ended {
            return;
        }
        self.phase = Phase::Ended;
        self.winner = winner.or(self.winner);
        let identity = self
            .winner
            .and_then(|n| self.players.get(n as usize))
            .map(|p| p.identity().clone());
        self.sink.finalize(self.match_id, identity.as_ref());
        info!(
            "Match {} ended after {} ticks, winner: {:?}",
            self.match_id, self.tick_count, self.winner
        );
    }
}

/// Shared access to one match: the scheduler task plus entry points for the
/// transport layer.
pub struct MatchHandle {
    state: Arc<RwLock<MatchState>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl MatchHandle {
    /// Start a match: broadcast the countdown, load assets in the
    /// background, and schedule the transition to Running when the countdown
    /// elapses. Loading is not allowed to delay the countdown; if it failed,
    /// the match simply never starts.
    pub fn start(
        config: Config,
        roster: Vec<Arc<dyn Session>>,
        sink: Arc<dyn StatsSink>,
    ) -> Arc<Self> {
        let countdown = config.game.countdown_secs;
        let tick_interval = config.game.tick_interval_ms;
        let state = Arc::new(RwLock::new(MatchState::new(config, roster, sink)));
        let handle = Arc::new(Self {
            state,
            loop_task: Mutex::new(None),
        });

        info!("Starting match with {}s countdown", countdown);
        let load_state = handle.state.clone();
        tokio::spawn(async move {
            {
                let state = load_state.read().await;
                state.broadcast(Event::Countdown { seconds: countdown });
            }
            let mut state = load_state.write().await;
            if let Err(e) = state.load_assets() {
                error!("Failed to load match assets: {e}");
            }
        });

        let run_handle = handle.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(countdown)).await;
            let started = run_handle.state.write().await.begin_running();
            if started {
                let loop_state = run_handle.state.clone();
                let task = tokio::spawn(run_match_loop(loop_state, tick_interval));
                *run_handle.loop_task.lock().await = Some(task);
            }
        });

        handle
    }

    pub fn state(&self) -> Arc<RwLock<MatchState>> {
        self.state.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase()
    }

    /// Entry point for a validated inbound command.
    pub async fn command(&self, user_id: u64, command: protocol::Command) {
        self.state.write().await.handle_command(user_id, command);
    }

    pub async fn disconnect(&self, user_id: u64) {
        self.state
            .write()
            .await
            .handle_disconnect(user_id, Instant::now());
    }

    pub async fn reconnect(&self, user_id: u64, session: Arc<dyn Session>) {
        self.state.write().await.handle_reconnect(user_id, session);
    }

    /// Stop the match: mark it ended, give the in-flight tick a bounded
    /// window to drain, then force-cancel the scheduler.
    pub async fn shutdown(&self) {
        let deadline = {
            let mut state = self.state.write().await;
            let deadline = Duration::from_secs(state.config.game.shutdown_deadline_secs);
            state.end(None);
            deadline
        };
        if let Some(mut task) = self.loop_task.lock().await.take() {
            if tokio::time::timeout(deadline, &mut task).await.is_err() {
                warn!("Match loop missed the shutdown deadline, aborting");
                task.abort();
            }
        }
    }

    /// Wait for the scheduler task to finish on its own (the match ended).
    pub async fn join(&self) {
        if let Some(task) = self.loop_task.lock().await.take() {
            let _ = task.await;
        }
    }
}

/// Run the fixed-rate match loop until the match ends.
pub async fn run_match_loop(state: Arc<RwLock<MatchState>>, tick_interval_ms: u64) {
    let start = TokioInstant::now() + Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(start, Duration::from_millis(tick_interval_ms));
    // Use Skip to catch up on missed ticks - ensures consistent game speed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Game loop started with tick rate of {}ms", tick_interval_ms);
    loop {
        let scheduled = ticker.tick().await;

        // Drain any backlog of tick events so we always process the most
        // recent tick. This keeps player commands up-to-date when the server
        // falls behind.
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(
                "Skipped {} ticks to stay current (lag: {:?})",
                skipped,
                TokioInstant::now().saturating_duration_since(scheduled)
            );
        }

        let keep_running = {
            let mut game = state.write().await;
            let tick_start = Instant::now();
            let keep_running = game.tick(Instant::now());
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            let tick_budget = tick_interval_ms as f64 * 0.9;
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} creeps active",
                    game.tick_count(),
                    tick_ms,
                    tick_budget,
                    game.active_creep_count()
                );
            }
            keep_running
        }; // Write lock released here

        if !keep_running {
            break;
        }
    }
    info!("Game loop stopped");
}
