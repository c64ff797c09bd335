use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AttemptOutcome, Decision, LoginAttemptRecord};
use crate::error::ConfigError;

/// One step of the escalation table.
///
/// A lockout of `duration` is applied once `consecutive_failures` reaches
/// `threshold`, unless a higher tier also matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutTier {
    pub threshold: u32,
    #[serde(with = "crate::config::duration_seconds")]
    pub duration: Duration,
    /// Prefix of the lockout reason, e.g. "Excessive login attempts".
    pub description: String,
}

impl LockoutTier {
    pub fn new(threshold: u32, duration: Duration, description: impl Into<String>) -> Self {
        Self {
            threshold,
            duration,
            description: description.into(),
        }
    }

    /// 5 failures lock for 30 minutes, 7 for 4 hours, 10 for 24 hours.
    pub fn default_tiers() -> Vec<LockoutTier> {
        vec![
            LockoutTier::new(5, Duration::minutes(30), "Too many failed login attempts"),
            LockoutTier::new(7, Duration::hours(4), "Repeated login failures"),
            LockoutTier::new(10, Duration::hours(24), "Excessive login attempts"),
        ]
    }
}

/// Progressive lockout policy over [`LoginAttemptRecord`]s.
///
/// Every operation is a single deterministic transition and takes `now`
/// explicitly. The policy never touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Sorted by threshold, highest first.
    tiers: Vec<LockoutTier>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_sorted(LockoutTier::default_tiers())
    }
}

impl LockoutPolicy {
    /// Build a policy from a custom escalation table.
    ///
    /// Thresholds must be positive and distinct, durations positive, and the
    /// table non-empty.
    pub fn new(tiers: Vec<LockoutTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::InvalidTiers(
                "at least one tier is required".to_string(),
            ));
        }

        for tier in &tiers {
            if tier.threshold == 0 {
                return Err(ConfigError::InvalidTiers(
                    "thresholds must be greater than zero".to_string(),
                ));
            }
            if tier.duration <= Duration::zero() {
                return Err(ConfigError::InvalidTiers(format!(
                    "tier at {} failures has a non-positive duration",
                    tier.threshold
                )));
            }
        }

        let mut thresholds: Vec<u32> = tiers.iter().map(|t| t.threshold).collect();
        thresholds.sort_unstable();
        thresholds.dedup();
        if thresholds.len() != tiers.len() {
            return Err(ConfigError::InvalidTiers(
                "duplicate thresholds".to_string(),
            ));
        }

        Ok(Self::from_sorted(tiers))
    }

    fn from_sorted(mut tiers: Vec<LockoutTier>) -> Self {
        tiers.sort_by(|a, b| b.threshold.cmp(&a.threshold));
        Self { tiers }
    }

    /// Tiers ordered from the highest threshold down.
    pub fn tiers(&self) -> &[LockoutTier] {
        &self.tiers
    }

    /// The tier that applies at `consecutive_failures`, if any.
    pub fn tier_for(&self, consecutive_failures: u32) -> Option<&LockoutTier> {
        self.tiers
            .iter()
            .find(|tier| consecutive_failures >= tier.threshold)
    }

    /// Decide whether an attempt may proceed. No side effects.
    ///
    /// `None` means the pair has never been seen and is always allowed.
    pub fn evaluate_pre_check(
        &self,
        record: Option<&LoginAttemptRecord>,
        now: DateTime<Utc>,
    ) -> Decision {
        let Some(record) = record else {
            return Decision::Allowed;
        };

        if record.is_malformed() {
            tracing::warn!(
                email = %record.email,
                ip_address = %record.ip_address,
                "Login attempt record is locked without an expiry, treating as unlocked"
            );
            return Decision::Allowed;
        }

        match record.locked_until {
            Some(locked_until) if record.is_locked && locked_until > now => Decision::Denied {
                reason: record
                    .lockout_reason
                    .clone()
                    .unwrap_or_else(|| "Account temporarily locked".to_string()),
                retry_after: locked_until - now,
                locked_until,
            },
            _ => Decision::Allowed,
        }
    }

    /// Apply the outcome of a credential check to a record.
    ///
    /// Does not check for an existing lockout before counting a failure;
    /// run [`evaluate_pre_check`](Self::evaluate_pre_check) first. A failure
    /// recorded inside an active lockout window is counted but leaves the
    /// window as it is.
    pub fn record_outcome(
        &self,
        mut record: LoginAttemptRecord,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> LoginAttemptRecord {
        record.last_attempt = now;

        let reason = match outcome {
            AttemptOutcome::Success => {
                record.consecutive_failures = 0;
                record.is_locked = false;
                record.locked_until = None;
                record.lockout_reason = None;
                return record;
            }
            AttemptOutcome::Failure { reason } => reason,
        };

        let already_locked = record.is_currently_locked(now);
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);

        if already_locked {
            tracing::debug!(
                email = %record.email,
                failures = record.consecutive_failures,
                "Failure recorded during active lockout"
            );
            return record;
        }

        if let Some(tier) = self.tier_for(record.consecutive_failures) {
            let locked_until = now + tier.duration;
            record.is_locked = true;
            record.locked_until = Some(locked_until);
            record.lockout_reason = Some(format!("{}: {}", tier.description, reason));

            tracing::warn!(
                email = %record.email,
                ip_address = %record.ip_address,
                failures = record.consecutive_failures,
                locked_until = %locked_until,
                "Login lockout applied"
            );
        }

        record
    }

    /// Administrative override: clear any lockout and the failure counter.
    ///
    /// `last_attempt` is kept, as an unlock is not a login attempt. Who may
    /// call this is up to the caller.
    pub fn unlock(&self, mut record: LoginAttemptRecord, reason: &str) -> LoginAttemptRecord {
        record.consecutive_failures = 0;
        record.is_locked = false;
        record.locked_until = None;
        record.lockout_reason = Some(format!("Unlocked: {reason}"));
        record
    }
}
