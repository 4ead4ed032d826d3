//! TOML configuration file for the agent.
//!
//! Read once at startup from `--config <PATH>` / `HOTZONE_CONFIG`, or else
//! from the platform-appropriate location:
//! - Linux:    `$XDG_CONFIG_HOME/hotzone/config.toml` (or `~/.config/hotzone/config.toml`)
//! - macOS:    `~/Library/Application Support/hotzone/config.toml`
//! - Windows:  `%APPDATA%\hotzone\config.toml`
//!
//! A missing file at the platform location simply means "use the defaults",
//! which reproduce the built-in layout and timings exactly.  Every field is
//! optional; a partial file overrides only what it names.
//!
//! ```toml
//! [connection]
//! endpoint = "ws://localhost:4455"
//! backoff_secs = 5
//!
//! [monitor]
//! trigger_region = "DP3-1"
//! left_threshold = 250
//! right_threshold = 1650
//!
//! [logging]
//! level = "info"
//!
//! [[regions]]
//! name = "eDP1"
//! x = 0
//! y = 0
//! width = 1920
//! height = 1200
//! ```
//!
//! Listing any `[[regions]]` replaces the whole built-in table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hotzone_core::domain::regions::default_regions;
use hotzone_core::domain::zones::{
    DEFAULT_DEAD_ZONE, DEFAULT_LEFT_THRESHOLD, DEFAULT_RIGHT_THRESHOLD,
};
use hotzone_core::{Region, RegionError, RegionTable, ZoneThresholds};

use crate::application::reconnect::ReconnectPolicy;
use crate::application::session_manager::{SessionConfig, DEFAULT_ENDPOINT};
use crate::application::zone_monitor::{
    ZoneMonitorConfig, DEFAULT_LEFT_ZONE_HOTKEY, DEFAULT_RIGHT_ZONE_HOTKEY,
    DEFAULT_TRIGGER_REGION,
};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The region table is invalid.
    #[error("invalid region table: {0}")]
    Regions(#[from] RegionError),

    /// The trigger region is not one of the configured regions.
    #[error("trigger region '{0}' is not in the region table")]
    UnknownTriggerRegion(String),

    /// The zone thresholds leave no room between the zones.
    #[error("left threshold {left} must be below right threshold {right}")]
    InvalidThresholds { left: i32, right: i32 },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_regions")]
    pub regions: Vec<Region>,
}

/// Studio connection and reconnect timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// WebSocket URL of the studio.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Limit for the TCP connect plus the WebSocket upgrade.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Limit for the Hello/Identify/Identified exchange.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Pause between readiness checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Extra pause after a failed attempt.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

/// Pointer sampling and zone settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Region that runs zone logic.
    #[serde(default = "default_trigger_region")]
    pub trigger_region: String,
    /// Relative X below which the left zone begins.
    #[serde(default = "default_left_threshold")]
    pub left_threshold: i32,
    /// Relative X from which the right zone begins.
    #[serde(default = "default_right_threshold")]
    pub right_threshold: i32,
    /// Dead-zone radius in pixels.
    #[serde(default = "default_dead_zone")]
    pub dead_zone: u32,
    /// Pause between pointer samples.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Hotkey requested on entering the left zone.
    #[serde(default = "default_left_zone_hotkey")]
    pub left_zone_hotkey: String,
    /// Hotkey requested on entering the right zone.
    #[serde(default = "default_right_zone_hotkey")]
    pub right_zone_hotkey: String,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"hotzone_agent=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_handshake_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_backoff_secs() -> u64 {
    5
}
fn default_trigger_region() -> String {
    DEFAULT_TRIGGER_REGION.to_string()
}
fn default_left_threshold() -> i32 {
    DEFAULT_LEFT_THRESHOLD
}
fn default_right_threshold() -> i32 {
    DEFAULT_RIGHT_THRESHOLD
}
fn default_dead_zone() -> u32 {
    DEFAULT_DEAD_ZONE
}
fn default_sample_interval_ms() -> u64 {
    100
}
fn default_left_zone_hotkey() -> String {
    DEFAULT_LEFT_ZONE_HOTKEY.to_string()
}
fn default_right_zone_hotkey() -> String {
    DEFAULT_RIGHT_ZONE_HOTKEY.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
            regions: default_regions(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            trigger_region: default_trigger_region(),
            left_threshold: default_left_threshold(),
            right_threshold: default_right_threshold(),
            dead_zone: default_dead_zone(),
            sample_interval_ms: default_sample_interval_ms(),
            left_zone_hotkey: default_left_zone_hotkey(),
            right_zone_hotkey: default_right_zone_hotkey(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl AgentConfig {
    /// Settings for the session manager.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.connection.endpoint.clone(),
            handshake_timeout: Duration::from_secs(self.connection.handshake_timeout_secs),
        }
    }

    /// Timing for the reconnect supervisor.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            poll_interval: Duration::from_millis(self.connection.poll_interval_ms),
            backoff: Duration::from_secs(self.connection.backoff_secs),
        }
    }

    /// Limit for opening the WebSocket connection.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    /// Settings for the zone monitor.
    pub fn zone_monitor_config(&self) -> ZoneMonitorConfig {
        ZoneMonitorConfig {
            trigger_region: self.monitor.trigger_region.clone(),
            thresholds: ZoneThresholds {
                left: self.monitor.left_threshold,
                right: self.monitor.right_threshold,
            },
            dead_zone: self.monitor.dead_zone,
            left_zone_hotkey: self.monitor.left_zone_hotkey.clone(),
            right_zone_hotkey: self.monitor.right_zone_hotkey.clone(),
            sample_interval: Duration::from_millis(self.monitor.sample_interval_ms),
        }
    }

    /// Validates the regions and zone settings and builds the lookup table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Regions`] for an invalid table,
    /// [`ConfigError::UnknownTriggerRegion`] if the trigger region is not
    /// listed, and [`ConfigError::InvalidThresholds`] if the left threshold
    /// is not below the right one.
    pub fn region_table(&self) -> Result<RegionTable, ConfigError> {
        let table = RegionTable::new(self.regions.clone())?;
        if table.get(&self.monitor.trigger_region).is_none() {
            return Err(ConfigError::UnknownTriggerRegion(
                self.monitor.trigger_region.clone(),
            ));
        }
        if self.monitor.left_threshold >= self.monitor.right_threshold {
            return Err(ConfigError::InvalidThresholds {
                left: self.monitor.left_threshold,
                right: self.monitor.right_threshold,
            });
        }
        Ok(table)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the full path of the platform config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration.
///
/// With `explicit = Some(path)` the file must exist.  Otherwise the platform
/// config file is read if present and [`AgentConfig::default`] is returned if
/// it is not, or if no platform directory can be determined.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors (including a missing
/// explicit file) and [`ConfigError::Parse`] for malformed TOML.
pub fn load_config(explicit: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let path = match config_file_path() {
        Ok(path) => path,
        Err(ConfigError::NoPlatformConfigDir) => return Ok(AgentConfig::default()),
        Err(e) => return Err(e),
    };

    match read_config(&path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(AgentConfig::default())
        }
        other => other,
    }
}

fn read_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Resolves the platform config base directory including the `hotzone`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("hotzone"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hotzone"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("hotzone")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
