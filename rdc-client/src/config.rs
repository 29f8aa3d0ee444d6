//! Client configuration.
//!
//! One TOML file carries the network endpoint, the local/remote
//! viewport, logging and the full [`SessionConfig`] under `[session]`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rdc_core::{RdcError, RemoteViewport, SessionConfig};

/// Top-level configuration for the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Local view and initial remote resolution.
    pub viewport: ViewportConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// Session tuning passed to the coordinator.
    pub session: SessionConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Remote control endpoint (IP:port, UDP).
    pub remote_address: String,
    /// Local bind address for the control socket.
    pub bind_address: String,
    /// Silence after which the link is reported disconnected.
    pub timeout_ms: u64,
}

/// Viewport settings, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub local_width: u32,
    pub local_height: u32,
    /// Updated at runtime when the remote side reports a new resolution.
    pub remote_width: u32,
    pub remote_height: u32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log a health line every this many adapt ticks (0 disables).
    pub health_every: u32,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            remote_address: "127.0.0.1:7340".into(),
            bind_address: "0.0.0.0:0".into(),
            timeout_ms: 3000,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            local_width: 2340,
            local_height: 1080,
            remote_width: 1920,
            remote_height: 1080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            health_every: 10,
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
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<(), RdcError> {
        let text = toml::to_string_pretty(&Self::default())
            .map_err(|e| RdcError::Encoding(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn viewport(&self) -> RemoteViewport {
        RemoteViewport::new(
            self.viewport.local_width,
            self.viewport.local_height,
            self.viewport.remote_width,
            self.viewport.remote_height,
        )
    }

    pub fn validate(&self) -> Result<(), RdcError> {
        if self.network.remote_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(RdcError::config(
                "network.remote_address",
                format!("`{}` is not an IP:port", self.network.remote_address),
            ));
        }
        self.session.validate()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(text.contains("remote_address"));
        assert!(text.contains("[session.bitrate]"));
        assert!(text.contains("high_latency_ms"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.remote_address, "127.0.0.1:7340");
        assert_eq!(parsed.session.bitrate.min_bitrate, 500_000);
        assert_eq!(parsed.session.input.batch_interval_ms, 16);
        parsed.validate().unwrap();
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: ClientConfig = toml::from_str(
            r#"
            [network]
            remote_address = "10.0.0.5:7340"

            [session.bitrate]
            max_bitrate = 8000000
            "#,
        )
        .unwrap();
        assert_eq!(parsed.network.remote_address, "10.0.0.5:7340");
        assert_eq!(parsed.network.timeout_ms, 3000);
        assert_eq!(parsed.session.bitrate.max_bitrate, 8_000_000);
        assert_eq!(parsed.session.bitrate.min_bitrate, 500_000);
    }

    #[test]
    fn bad_address_is_rejected() {
        let mut cfg = ClientConfig::default();
        cfg.network.remote_address = "not-an-address".into();
        assert!(matches!(
            cfg.validate(),
            Err(RdcError::InvalidConfig { field: "network.remote_address", .. })
        ));
    }

    #[test]
    fn inverted_bitrate_range_is_rejected() {
        let mut cfg = ClientConfig::default();
        cfg.session.bitrate.min_bitrate = 30_000_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn written_default_loads_back() {
        let path = std::env::temp_dir().join(format!("rdc-client-{}.toml", std::process::id()));
        ClientConfig::write_default(&path).unwrap();
        let cfg = ClientConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.network.timeout_ms, 3000);
        assert_eq!(cfg.session.monitor.adapt_interval_ms, 500);
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ClientConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg.viewport.remote_width, 1920);
    }
}
