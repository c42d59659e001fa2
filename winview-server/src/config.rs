//! Configuration for the viewer server.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use winview_core::{DEFAULT_MAX_PAYLOAD, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Per-session protocol limits.
    pub protocol: ProtocolConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the listener on.
    pub bind_address: String,
    /// TCP port clients connect to.
    pub port: u16,
}

/// Limits applied to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Largest package a client may announce, in bytes.
    pub max_payload_bytes: u32,
    /// Drop clients that send nothing for this long. 0 disables.
    pub idle_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            protocol: ProtocolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 33315,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD,
            idle_timeout_ms: 0,
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

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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

    /// `bind_address:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }

    /// Convert protocol limits into a [`SessionConfig`].
    pub fn to_session_config(&self) -> SessionConfig {
        let idle = self.protocol.idle_timeout_ms;
        SessionConfig {
            max_payload: self.protocol.max_payload_bytes.max(1),
            idle_timeout: (idle > 0).then(|| Duration::from_millis(idle)),
            ..SessionConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
