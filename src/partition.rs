use chrono::{Local, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ConfigError;

/// Which wall clock the `YYYY/MM/DD/HH` partition is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionClock {
    /// Host local time.
    #[default]
    Local,
    Utc,
}

impl FromStr for PartitionClock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(PartitionClock::Local),
            "utc" => Ok(PartitionClock::Utc),
            _ => Err(ConfigError::InvalidPartitionClock(s.to_string())),
        }
    }
}

/// Storage path of one flushed batch, relative to the configured prefix:
/// `YYYY/MM/DD/HH/<uuid>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Build the key for a batch flushed at `at`, identified by `id`.
    pub fn new(at: NaiveDateTime, id: Uuid) -> Self {
        PartitionKey(format!("{}/{}.json", at.format("%Y/%m/%d/%H"), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives a fresh [`PartitionKey`] from the current time.
///
/// The random v4 suffix keeps keys distinct even when several flushes land
/// in the same hour, across tasks and across process instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionKeyGenerator {
    clock: PartitionClock,
}

impl PartitionKeyGenerator {
    pub fn new(clock: PartitionClock) -> Self {
        Self { clock }
    }

    pub fn next_key(&self) -> PartitionKey {
        let now = match self.clock {
            PartitionClock::Local => Local::now().naive_local(),
            PartitionClock::Utc => Utc::now().naive_utc(),
        };
        PartitionKey::new(now, Uuid::new_v4())
    }
}
