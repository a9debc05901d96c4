use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use kwscope_core::TtlSeconds;

/// How long a cached signal stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    /// Fast-moving data such as trend series and suggestions.
    Volatile,
    /// Slow-moving data such as channel statistics and search landscapes.
    Stable,
    /// Data that only shifts with the season, such as category baselines.
    Seasonal,
}

impl TtlClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TtlClass::Volatile => "volatile",
            TtlClass::Stable => "stable",
            TtlClass::Seasonal => "seasonal",
        }
    }
}

impl std::fmt::Display for TtlClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TtlClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volatile" => Ok(TtlClass::Volatile),
            "stable" => Ok(TtlClass::Stable),
            "seasonal" => Ok(TtlClass::Seasonal),
            other => Err(format!("unknown ttl class '{other}'")),
        }
    }
}

/// Maps each [`TtlClass`] to a lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub volatile: TimeDelta,
    pub stable: TimeDelta,
    pub seasonal: TimeDelta,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_seconds(TtlSeconds::default())
    }
}

impl TtlPolicy {
    #[must_use]
    pub fn from_seconds(ttl: TtlSeconds) -> Self {
        Self {
            volatile: seconds(ttl.volatile),
            stable: seconds(ttl.stable),
            seasonal: seconds(ttl.seasonal),
        }
    }

    #[must_use]
    pub fn duration(&self, class: TtlClass) -> TimeDelta {
        match class {
            TtlClass::Volatile => self.volatile,
            TtlClass::Stable => self.stable,
            TtlClass::Seasonal => self.seasonal,
        }
    }
}

fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
