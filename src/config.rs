use std::net::SocketAddr;
use tokio::time::Duration;
use tracing::warn;

use crate::engine::EngineConfig;
use crate::env::*;
use crate::error::ConfigError;
use crate::partition::PartitionClock;

/// Process-level configuration, loaded once at start.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub prefix: String,
    pub flush_interval: Duration,
    pub buffer_limit: usize,
    pub bind_addr: SocketAddr,
    pub partition_clock: PartitionClock,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Numeric values that are not plain non-negative integers are ignored
    /// with a warning and the default is used. `FLUSH_INTERVAL` is capped at
    /// 900 seconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = match lookup(PREFIX_ENV) {
            Some(prefix) => prefix,
            None => {
                warn!("{} is not set, using local filesystem ({})", PREFIX_ENV, DEFAULT_PREFIX);
                DEFAULT_PREFIX.to_string()
            }
        };

        let mut flush_secs = parse_count(
            FLUSH_INTERVAL_ENV,
            lookup(FLUSH_INTERVAL_ENV),
            DEFAULT_FLUSH_INTERVAL_SECS,
        );
        if flush_secs >= MAX_FLUSH_INTERVAL_SECS {
            warn!(
                value = flush_secs,
                "{} is out of range, using {} seconds instead",
                FLUSH_INTERVAL_ENV,
                MAX_FLUSH_INTERVAL_SECS
            );
            flush_secs = MAX_FLUSH_INTERVAL_SECS;
        }

        let buffer_limit = parse_count(
            BUFFER_LIMIT_ENV,
            lookup(BUFFER_LIMIT_ENV),
            DEFAULT_BUFFER_LIMIT as u64,
        ) as usize;

        let bind = lookup(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr { value: bind.clone(), source })?;

        let partition_clock = match lookup(PARTITION_CLOCK_ENV) {
            Some(value) => value.parse()?,
            None => PartitionClock::default(),
        };

        Ok(Self {
            prefix,
            flush_interval: Duration::from_secs(flush_secs),
            buffer_limit,
            bind_addr,
            partition_clock,
        })
    }

    /// Engine settings derived from this configuration, with default poll
    /// interval and retry policy.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            buffer_limit: self.buffer_limit,
            flush_interval: self.flush_interval,
            partition_clock: self.partition_clock,
            ..EngineConfig::default()
        }
    }
}

fn parse_count(name: &str, raw: Option<String>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        warn!(value = %raw, "{} is not a non-negative integer, using {}", name, default);
        return default;
    }
    match trimmed.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(value = %raw, "{} does not fit in 64 bits, using {}", name, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.prefix, "/tmp/");
        assert_eq!(cfg.flush_interval, Duration::from_secs(120));
        assert_eq!(cfg.buffer_limit, 100);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.partition_clock, PartitionClock::Local);
    }

    #[test]
    fn reads_explicit_values() {
        let cfg = load(&[
            ("PREFIX", "s3://bucket/events/"),
            ("FLUSH_INTERVAL", "30"),
            ("BUFFER_LIMIT", "500"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("PARTITION_CLOCK", "utc"),
        ])
        .unwrap();
        assert_eq!(cfg.prefix, "s3://bucket/events/");
        assert_eq!(cfg.flush_interval, Duration::from_secs(30));
        assert_eq!(cfg.buffer_limit, 500);
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.partition_clock, PartitionClock::Utc);
    }

    #[test]
    fn flush_interval_is_clamped_to_900() {
        assert_eq!(
            load(&[("FLUSH_INTERVAL", "900")]).unwrap().flush_interval,
            Duration::from_secs(900)
        );
        assert_eq!(
            load(&[("FLUSH_INTERVAL", "86400")]).unwrap().flush_interval,
            Duration::from_secs(900)
        );
        assert_eq!(
            load(&[("FLUSH_INTERVAL", "899")]).unwrap().flush_interval,
            Duration::from_secs(899)
        );
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let cfg = load(&[("FLUSH_INTERVAL", "-5"), ("BUFFER_LIMIT", "lots")]).unwrap();
        assert_eq!(cfg.flush_interval, Duration::from_secs(120));
        assert_eq!(cfg.buffer_limit, 100);

        let cfg = load(&[("FLUSH_INTERVAL", "1.5"), ("BUFFER_LIMIT", "")]).unwrap();
        assert_eq!(cfg.flush_interval, Duration::from_secs(120));
        assert_eq!(cfg.buffer_limit, 100);
    }

    #[test]
    fn zero_is_accepted() {
        let cfg = load(&[("FLUSH_INTERVAL", "0"), ("BUFFER_LIMIT", "0")]).unwrap();
        assert_eq!(cfg.flush_interval, Duration::ZERO);
        assert_eq!(cfg.buffer_limit, 0);
    }

    #[test]
    fn invalid_bind_addr_and_clock_are_errors() {
        assert!(matches!(
            load(&[("BIND_ADDR", "not-an-addr")]),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            load(&[("PARTITION_CLOCK", "gmt+3")]),
            Err(ConfigError::InvalidPartitionClock(_))
        ));
    }

    #[test]
    fn engine_config_carries_buffer_settings() {
        let cfg = load(&[("FLUSH_INTERVAL", "10"), ("BUFFER_LIMIT", "7")]).unwrap();
        let engine = cfg.engine_config();
        assert_eq!(engine.buffer_limit, 7);
        assert_eq!(engine.flush_interval, Duration::from_secs(10));
        assert_eq!(engine.poll_interval, Duration::from_secs(2));
    }
}
