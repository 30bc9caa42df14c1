//! Configuration types holding the parameters of a [`Pool`](super::Pool).
use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use super::ConfigError;
use crate::channel::Backend;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
/// Pool-level configuration.
///
/// Any serde source works (a config file, environment variables, a JSON map...).
/// Keys are accepted in `snake_case` or `camelCase`; unknown keys are ignored.
/// Numeric values may also be given as strings.
///
/// `PoolSettings::default()` describes a single-connection pool:
/// `max_connections = 1`, `min_connections = 1`, `idle_timeout = 60`,
/// `heartbeat_interval = 50`, `wait_timeout = 10` and `backend = "auto"`.
pub struct PoolSettings {
    /// The ceiling on open connections, checked out or not.
    #[serde(
        alias = "maxConnections",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub max_connections: usize,
    /// Idle eviction never shrinks the free-list below this many connections.
    #[serde(
        alias = "minConnections",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub min_connections: usize,
    /// How long a connection may go without being checked out before it is evicted,
    /// in seconds.
    #[serde(
        rename = "idle_timeout",
        alias = "idleTimeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub idle_timeout_seconds: f64,
    /// How often free connections are probed by the heartbeat callback, in seconds.
    #[serde(
        rename = "heartbeat_interval",
        alias = "heartbeatInterval",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub heartbeat_interval_seconds: f64,
    /// How long [`Pool::get`](super::Pool::get) waits for a free connection before giving up,
    /// in seconds.
    #[serde(
        rename = "wait_timeout",
        alias = "waitTimeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub wait_timeout_seconds: f64,
    /// The channel backend used for the free-list.
    pub backend: Backend,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            idle_timeout_seconds: 60.,
            heartbeat_interval_seconds: 50.,
            wait_timeout_seconds: 10.,
            backend: Backend::Auto,
        }
    }
}

impl PoolSettings {
    /// Check the settings are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::MinAboveMax {
                min: self.min_connections,
                max: self.max_connections,
            });
        }
        for (name, value) in [
            ("idle_timeout", self.idle_timeout_seconds),
            ("heartbeat_interval", self.heartbeat_interval_seconds),
            ("wait_timeout", self.wait_timeout_seconds),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidDuration { name, value });
            }
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        seconds(self.idle_timeout_seconds)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        seconds(self.heartbeat_interval_seconds)
    }

    pub fn wait_timeout(&self) -> Duration {
        seconds(self.wait_timeout_seconds)
    }
}

// Out-of-range values are caught by `validate`.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
