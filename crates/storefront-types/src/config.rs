//! Global configuration types.
//!
//! `GlobalConfig` represents the top-level `config.toml` controlling the HTTP
//! listener and the realtime layer's timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Storefront support chat service.
///
/// Loaded from `~/.storefront/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// HTTP listener settings. CLI flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Timers and buffer sizes for streaming connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Period of the liveness frame on global streams.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Lifetime of a global stream before the server closes it and the
    /// client is expected to reconnect.
    #[serde(default = "default_global_idle_timeout_secs")]
    pub global_idle_timeout_secs: u64,

    /// Frames buffered per connection before pushes start failing.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_global_idle_timeout_secs() -> u64 {
    1800
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            global_idle_timeout_secs: default_global_idle_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn global_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.global_idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.realtime.heartbeat_interval_secs, 30);
        assert_eq!(config.realtime.global_idle_timeout_secs, 1800);
        assert_eq!(config.realtime.channel_capacity, 64);
    }

    #[test]
    fn test_global_config_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.realtime.heartbeat_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_global_config_deserialize_partial_sections() {
        let toml_str = r#"
[server]
port = 8080

[realtime]
heartbeat_interval_secs = 10
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.realtime.heartbeat_interval_secs, 10);
        assert_eq!(
            config.realtime.global_idle_timeout(),
            Duration::from_secs(1800)
        );
    }
}
