//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub level: LevelConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub features: FeatureConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Tick scheduling and lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    /// Tick interval in milliseconds (5 Hz by default).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Pre-match countdown in seconds.
    #[serde(default = "default_countdown")]
    pub countdown_secs: u64,
    /// Resource production / broadcast cadence, in ticks.
    #[serde(default = "default_resource_interval")]
    pub resource_interval_ticks: u32,
    /// Reconnection grace window after a disconnect, in seconds.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
    /// Bounded wait for the in-flight tick when stopping a match.
    #[serde(default = "default_shutdown_deadline")]
    pub shutdown_deadline_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            countdown_secs: default_countdown(),
            resource_interval_ticks: default_resource_interval(),
            grace_period_secs: default_grace_period(),
            shutdown_deadline_secs: default_shutdown_deadline(),
        }
    }
}

/// Level and wave schedule assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LevelConfig {
    /// Path to the terrain layout file.
    #[serde(default = "default_level_path")]
    pub level_path: String,
    /// Path to the wave schedule file.
    #[serde(default = "default_waves_path")]
    pub waves_path: String,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            level_path: default_level_path(),
            waves_path: default_waves_path(),
        }
    }
}

/// Per-player starting state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Hit points each player starts with.
    #[serde(default = "default_hitpoints")]
    pub starting_hitpoints: u32,
    /// Starting stock of each resource.
    #[serde(default = "default_resources")]
    pub starting_resources: u32,
    /// Base production rate of each resource per production interval.
    #[serde(default = "default_production")]
    pub base_production: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            starting_hitpoints: default_hitpoints(),
            starting_resources: default_resources(),
            base_production: default_production(),
        }
    }
}

/// Capability switches. Definitions keep carrying their data when a feature
/// is off; the corresponding per-tick step becomes a no-op.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureConfig {
    #[serde(default = "default_true")]
    pub splash_damage: bool,
    #[serde(default = "default_true")]
    pub slow_effects: bool,
    #[serde(default = "default_true")]
    pub healer_creeps: bool,
    /// When disabled, a disconnect forfeits immediately.
    #[serde(default = "default_true")]
    pub reconnect_grace: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            splash_damage: true,
            slow_effects: true,
            healer_creeps: true,
            reconnect_grace: true,
        }
    }
}

fn default_tick_interval() -> u64 {
    200
}
fn default_countdown() -> u64 {
    5
}
fn default_resource_interval() -> u32 {
    5
}
fn default_grace_period() -> u64 {
    60
}
fn default_shutdown_deadline() -> u64 {
    5
}
fn default_level_path() -> String {
    "levels/0001.level".to_string()
}
fn default_waves_path() -> String {
    "levels/0001.waves".to_string()
}
fn default_hitpoints() -> u32 {
    20
}
fn default_resources() -> u32 {
    100
}
fn default_production() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
