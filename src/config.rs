//! Runtime configuration for the hub and server binaries.
//!
//! Defaults are tuned for a small deployment; everything can be overridden
//! through environment variables (`ROOMCAST_*`).

use std::time::Duration;

/// Tuning knobs for the hub core.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum messages kept in each room's in-memory history ring.
    pub history_capacity: usize,
    /// Capacity of each connection's bounded outbound queue.
    pub outbound_queue_capacity: usize,
    /// Capacity of the register/unregister/broadcast event channels.
    pub event_queue_capacity: usize,
    /// Maximum concurrently running persistence side-effect tasks.
    pub persist_concurrency: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            outbound_queue_capacity: 256,
            event_queue_capacity: 64,
            persist_concurrency: 32,
        }
    }
}

/// Configuration for the server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub hub: HubConfig,
    /// Period of the lifecycle sweep (room expiry + pinned-room refresh).
    pub lifecycle_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            hub: HubConfig::default(),
            lifecycle_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("ROOMCAST_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("ROOMCAST_PORT") {
            config.port = port;
        }
        if let Some(capacity) = env_parse("ROOMCAST_HISTORY_CAPACITY") {
            config.hub.history_capacity = capacity;
        }
        if let Some(capacity) = env_parse("ROOMCAST_OUTBOUND_QUEUE_CAPACITY") {
            config.hub.outbound_queue_capacity = capacity;
        }
        if let Some(concurrency) = env_parse("ROOMCAST_PERSIST_CONCURRENCY") {
            config.hub.persist_concurrency = concurrency;
        }
        if let Some(secs) = env_parse::<u64>("ROOMCAST_LIFECYCLE_INTERVAL_SECS") {
            config.lifecycle_interval = Duration::from_secs(secs);
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring unparsable {}={:?}", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hub_config() {
        // given / when:
        let config = HubConfig::default();

        // then:
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.persist_concurrency, 32);
    }

    #[test]
    fn test_default_server_config() {
        // given / when:
        let config = ServerConfig::default();

        // then:
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.lifecycle_interval, Duration::from_secs(60));
    }
}
