//! Configuration for the lockout policy and the readability validator.
//!
//! Every struct has a `Default` matching the documented behavior and a
//! `from_env` constructor reading `SYLLABUS_*` variables. Unset variables keep
//! their defaults.
//!
//! | variable | default |
//! |---|---|
//! | `SYLLABUS_LOCKOUT_ENABLED` | `true` |
//! | `SYLLABUS_LOCKOUT_RETENTION_DAYS` | `30` |
//! | `SYLLABUS_READABILITY_TARGET_LEVEL` | `high_school` |
//! | `SYLLABUS_READABILITY_MIN_LENGTH` | `100` |
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    lockout::{LockoutPolicy, LockoutTier},
    readability::{DEFAULT_MIN_CONTENT_LENGTH, TargetLevel},
};

pub const LOCKOUT_ENABLED_VAR: &str = "SYLLABUS_LOCKOUT_ENABLED";
pub const LOCKOUT_RETENTION_DAYS_VAR: &str = "SYLLABUS_LOCKOUT_RETENTION_DAYS";
pub const READABILITY_TARGET_LEVEL_VAR: &str = "SYLLABUS_READABILITY_TARGET_LEVEL";
pub const READABILITY_MIN_LENGTH_VAR: &str = "SYLLABUS_READABILITY_MIN_LENGTH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// When false, every attempt is allowed and nothing is recorded.
    pub enabled: bool,
    /// Unlocked records untouched for this long are removed by cleanup.
    #[serde(with = "duration_seconds")]
    pub retention_period: Duration,
    pub tiers: Vec<LockoutTier>,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_period: Duration::days(30),
            tiers: LockoutTier::default_tiers(),
        }
    }
}

impl LockoutConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Build the policy for the configured tiers.
    ///
    /// An invalid tier table falls back to the default table.
    pub fn policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(self.tiers.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid lockout tiers, using defaults");
            LockoutPolicy::default()
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(LOCKOUT_ENABLED_VAR) {
            config.enabled = parse_bool(LOCKOUT_ENABLED_VAR, &value)?;
        }

        if let Some(value) = lookup(LOCKOUT_RETENTION_DAYS_VAR) {
            let days: i64 = parse_number(LOCKOUT_RETENTION_DAYS_VAR, &value)?;
            config.retention_period = Duration::try_days(days)
                .filter(|d| *d > Duration::zero())
                .ok_or_else(|| invalid(LOCKOUT_RETENTION_DAYS_VAR, &value))?;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadabilityConfig {
    /// Unknown levels fall back to `high_school`.
    #[serde(deserialize_with = "lenient_target_level")]
    pub target_level: TargetLevel,
    pub min_content_length: usize,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            target_level: TargetLevel::default(),
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }
}

impl ReadabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unknown target levels fall back to `high_school` rather than failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(READABILITY_TARGET_LEVEL_VAR) {
            config.target_level = TargetLevel::parse_or_default(&value);
        }

        if let Some(value) = lookup(READABILITY_MIN_LENGTH_VAR) {
            config.min_content_length = parse_number(READABILITY_MIN_LENGTH_VAR, &value)?;
        }

        Ok(config)
    }
}

/// Top level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyllabusConfig {
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub readability: ReadabilityConfig,
}

impl SyllabusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            lockout: LockoutConfig::from_lookup(&lookup)?,
            readability: ReadabilityConfig::from_lookup(&lookup)?,
        })
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn lenient_target_level<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<TargetLevel, D::Error> {
    let value = String::deserialize(deserializer)?;
    Ok(TargetLevel::parse_or_default(&value))
}

/// Serialize a `chrono::Duration` as whole seconds.
pub(crate) mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        Duration::try_seconds(seconds).ok_or_else(|| D::Error::custom("duration out of range"))
    }
}
