//! Global configuration loader for Storefront.
//!
//! Reads `config.toml` from the data directory (`~/.storefront/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use storefront_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STOREFRONT_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `STOREFRONT_DATA_DIR` environment variable
/// 2. `~/.storefront`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".storefront");
    }

    // Last resort: current directory
    PathBuf::from(".storefront")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Zero timer or capacity values are replaced by their defaults.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => sanitize(config),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// A zero interval would spin the heartbeat and a zero capacity panics in
/// `mpsc::channel`.
fn sanitize(mut config: GlobalConfig) -> GlobalConfig {
    let defaults = GlobalConfig::default().realtime;
    let realtime = &mut config.realtime;

    if realtime.heartbeat_interval_secs == 0 {
        tracing::warn!("realtime.heartbeat_interval_secs must be positive, using default");
        realtime.heartbeat_interval_secs = defaults.heartbeat_interval_secs;
    }
    if realtime.global_idle_timeout_secs == 0 {
        tracing::warn!("realtime.global_idle_timeout_secs must be positive, using default");
        realtime.global_idle_timeout_secs = defaults.global_idle_timeout_secs;
    }
    if realtime.channel_capacity == 0 {
        tracing::warn!("realtime.channel_capacity must be positive, using default");
        realtime.channel_capacity = defaults.channel_capacity;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.realtime.heartbeat_interval_secs, 30);
        assert_eq!(config.realtime.global_idle_timeout_secs, 1800);
    }

    #[tokio::test]
    async fn test_load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 8080

[realtime]
heartbeat_interval_secs = 15
channel_capacity = 8
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.realtime.heartbeat_interval_secs, 15);
        assert_eq!(config.realtime.global_idle_timeout_secs, 1800);
        assert_eq!(config.realtime.channel_capacity, 8);
    }

    #[tokio::test]
    async fn test_load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.realtime.channel_capacity, 64);
    }

    #[tokio::test]
    async fn test_load_global_config_zero_values_fall_back() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            "[realtime]\nheartbeat_interval_secs = 0\nchannel_capacity = 0\nglobal_idle_timeout_secs = 60\n",
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.realtime.heartbeat_interval_secs, 30);
        assert_eq!(config.realtime.channel_capacity, 64);
        assert_eq!(config.realtime.global_idle_timeout_secs, 60);
    }

    #[test]
    fn test_resolve_data_dir_is_not_empty() {
        let dir = resolve_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
