//! Viewer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use srs_core::{DEFAULT_HOST, DEFAULT_PORT, StreamEndpoint};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Stream server host.
    pub host: String,
    /// Stream server port.
    pub port: u16,
    /// Delay before the single scheduled reconnection attempt.
    pub reconnect_delay_ms: u64,
    /// Interval between latency probes while connected.
    pub ping_interval_ms: u64,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Terminal graphics protocol: "sixel", "kitty", "iterm2",
    /// "halfblocks", or empty for auto-detection.
    pub graphics: String,
    /// Input poll interval for the UI loop.
    pub tick_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
    /// Optional log file. Empty logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            reconnect_delay_ms: 3000,
            ping_interval_ms: 2000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            graphics: String::new(),
            tick_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The configured stream endpoint.
    pub fn endpoint(&self) -> StreamEndpoint {
        StreamEndpoint::new(self.network.host.clone(), self.network.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────
