//! Session configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or malformed values fall back
//! to the defaults of [`SessionConfig::default`].

use std::time::Duration;

use crate::domain::PoolConfig;

/// Top-level session configuration.
///
/// Loaded once at startup via [`SessionConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sizing used by pools created without an explicit [`PoolConfig`].
    pub default_pool: PoolConfig,

    /// Whether the session publishes spawn/despawn events on its bus.
    pub publish_pool_events: bool,

    /// Fixed simulation step driven by the demo loop.
    pub tick: Duration,

    /// Number of ticks the demo loop runs.
    pub ticks: u32,
}

impl SessionConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// | Variable                    | Default |
    /// |-----------------------------|---------|
    /// | `POOL_DEFAULT_INITIAL_SIZE` | 10      |
    /// | `POOL_DEFAULT_MAX_SIZE`     | 100     |
    /// | `POOL_DEFAULT_AUTO_EXPAND`  | false   |
    /// | `POOL_PUBLISH_EVENTS`       | true    |
    /// | `SIM_TICK_MILLIS`           | 16      |
    /// | `SIM_TICKS`                 | 600     |
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_pool = PoolConfig {
            initial_size: parse_value(
                lookup("POOL_DEFAULT_INITIAL_SIZE"),
                defaults.default_pool.initial_size,
            ),
            max_size: parse_value(
                lookup("POOL_DEFAULT_MAX_SIZE"),
                defaults.default_pool.max_size,
            ),
            auto_expand: parse_bool(
                lookup("POOL_DEFAULT_AUTO_EXPAND"),
                defaults.default_pool.auto_expand,
            ),
        };
        let publish_pool_events = parse_bool(
            lookup("POOL_PUBLISH_EVENTS"),
            defaults.publish_pool_events,
        );
        let tick_millis = parse_value(lookup("SIM_TICK_MILLIS"), 16u64);
        let ticks = parse_value(lookup("SIM_TICKS"), defaults.ticks);

        Self {
            default_pool,
            publish_pool_events,
            tick: Duration::from_millis(tick_millis),
            ticks,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_pool: PoolConfig::default(),
            publish_pool_events: true,
            tick: Duration::from_millis(16),
            ticks: 600,
        }
    }
}

/// Parses `raw` as `T`, returning `default` on missing or invalid values.
fn parse_value<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parses `raw` as a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> SessionConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SessionConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]), SessionConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("POOL_DEFAULT_INITIAL_SIZE", "4"),
            ("POOL_DEFAULT_MAX_SIZE", "32"),
            ("POOL_DEFAULT_AUTO_EXPAND", "TRUE"),
            ("POOL_PUBLISH_EVENTS", "0"),
            ("SIM_TICK_MILLIS", "20"),
            ("SIM_TICKS", "50"),
        ]);
        assert_eq!(config.default_pool, PoolConfig::new(4, 32, true));
        assert!(!config.publish_pool_events);
        assert_eq!(config.tick, Duration::from_millis(20));
        assert_eq!(config.ticks, 50);
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = config_from(&[
            ("POOL_DEFAULT_MAX_SIZE", "lots"),
            ("POOL_DEFAULT_AUTO_EXPAND", "maybe"),
        ]);
        assert_eq!(config.default_pool.max_size, 100);
        assert!(!config.default_pool.auto_expand);
    }
}
