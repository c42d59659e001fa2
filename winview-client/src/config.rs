//! Demo client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use winview_core::PixelFormat;

/// Top-level configuration for the demo client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// What to stream.
    pub stream: StreamConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Viewer address (host:port).
    pub server_address: String,
    /// Connect + handshake timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Test pattern settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub width: u16,
    pub height: u16,
    pub format: StreamFormat,
    /// Frames per second.
    pub fps: u32,
}

/// Pixel format as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Grayscale8,
    Argb32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

impl From<StreamFormat> for PixelFormat {
    fn from(f: StreamFormat) -> Self {
        match f {
            StreamFormat::Grayscale8 => PixelFormat::Grayscale8,
            StreamFormat::Argb32 => PixelFormat::Argb32,
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            stream: StreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:33315".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            format: StreamFormat::Grayscale8,
            fps: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms.max(1))
    }

    /// Delay between two frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.stream.fps.clamp(1, 240)
    }
}

// ── Tests ────────────────────────────────────────────────────────
