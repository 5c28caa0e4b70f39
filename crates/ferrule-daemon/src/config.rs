// crates/ferrule-daemon/src/config.rs
//
// Runtime configuration for the Ferrule example daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use ferrule_core::RateLimitPolicy;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level used when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Policy applied to `users.getById`.
    #[serde(default = "default_lookup_rate_limit")]
    pub lookup_rate_limit: RateLimitPolicy,

    /// Seconds between sweeps of expired rate-limit windows.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50051
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lookup_rate_limit() -> RateLimitPolicy {
    RateLimitPolicy::new(1, 1)
}

fn default_purge_interval_secs() -> u64 {
    60
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            log_level: default_log_level(),
            lookup_rate_limit: default_lookup_rate_limit(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.lookup_rate_limit, RateLimitPolicy::new(1, 1));
    }

    #[test]
    fn test_rate_limit_table() {
        let config: DaemonConfig = toml::from_str(
            r#"
            rpc_port = 6000

            [lookup_rate_limit]
            max_points = 10
            window_seconds = 60
            scope_key = "lookups"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_port, 6000);
        assert_eq!(config.lookup_rate_limit.max_points, 10);
        assert_eq!(config.lookup_rate_limit.scope(), "lookups");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(DaemonConfig::load("/nonexistent/ferrule.toml").is_err());
    }
}
