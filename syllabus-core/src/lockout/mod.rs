//! Account lockout for repeated login failures.
//!
//! Failure state is tracked per (email, IP address) pair in a
//! [`LoginAttemptRecord`]. The [`LockoutPolicy`] decides whether a request may
//! proceed and escalates the lockout window as consecutive failures pile up.
//!
//! The policy is a set of pure state transitions. Loading and saving records,
//! and serializing concurrent updates to the same pair, is the job of the
//! caller (see [`crate::services::LoginProtectionService`]).
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use syllabus_core::lockout::{AttemptKey, AttemptOutcome, LockoutPolicy, LoginAttemptRecord};
//!
//! let policy = LockoutPolicy::default();
//! let key = AttemptKey::new("Lecturer@Example.edu", "203.0.113.7").unwrap();
//! let now = Utc::now();
//!
//! assert!(policy.evaluate_pre_check(None, now).is_allowed());
//!
//! let record = policy.record_outcome(LoginAttemptRecord::new(&key, now), &AttemptOutcome::failure(), now);
//! assert_eq!(record.consecutive_failures, 1);
//! ```

mod policy;

pub use policy::{LockoutPolicy, LockoutTier};

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Failure reason recorded when the caller does not supply one.
pub const DEFAULT_FAILURE_REASON: &str = "Invalid credentials";

/// The (email, IP address) pair that login attempts are tracked under.
///
/// Emails are trimmed and lower-cased, IP addresses are parsed and re-rendered
/// in canonical form so `::1` and `0:0:0:0:0:0:0:1` share a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    email: String,
    ip_address: String,
}

impl AttemptKey {
    pub fn new(email: &str, ip_address: &str) -> Result<Self, ValidationError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ValidationError::MissingField(
                "Email is required".to_string(),
            ));
        }

        let ip_address = ip_address
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ValidationError::InvalidIpAddress(ip_address.to_string()))?
            .to_string();

        Ok(Self { email, ip_address })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }
}

impl std::fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.email, self.ip_address)
    }
}

/// Normalize an email address for use as a lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accumulated failure state for one (email, IP address) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    pub email: String,
    pub ip_address: String,
    pub consecutive_failures: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub lockout_reason: Option<String>,
    pub last_attempt: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LoginAttemptRecord {
    /// A fresh record for a pair that has never been seen before.
    pub fn new(key: &AttemptKey, now: DateTime<Utc>) -> Self {
        Self {
            email: key.email.clone(),
            ip_address: key.ip_address.clone(),
            consecutive_failures: 0,
            is_locked: false,
            locked_until: None,
            lockout_reason: None,
            last_attempt: now,
            created_at: now,
        }
    }

    pub fn key(&self) -> AttemptKey {
        AttemptKey {
            email: self.email.clone(),
            ip_address: self.ip_address.clone(),
        }
    }

    /// Locked with an expiry still in the future.
    ///
    /// A lock whose `locked_until` has passed counts as open even if
    /// `is_locked` was never cleared.
    pub fn is_currently_locked(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && self.locked_until.is_some_and(|until| until > now)
    }

    /// `is_locked` set without an expiry. Never produced by the policy itself.
    pub fn is_malformed(&self) -> bool {
        self.is_locked && self.locked_until.is_none()
    }
}

/// Result of a credential check, fed to [`LockoutPolicy::record_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure { reason: String },
}

impl AttemptOutcome {
    /// A failure with the default "Invalid credentials" reason.
    pub fn failure() -> Self {
        Self::Failure {
            reason: DEFAULT_FAILURE_REASON.to_string(),
        }
    }

    pub fn failure_with(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::failure()
        }
    }
}

/// Whether an authentication attempt may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied {
        reason: String,
        retry_after: Duration,
        locked_until: DateTime<Utc>,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// Seconds until the lockout expires, rounded up, for a `Retry-After` header.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            Decision::Allowed => None,
            Decision::Denied { retry_after, .. } => {
                let millis = retry_after.num_milliseconds().max(0);
                Some((millis + 999) / 1000)
            }
        }
    }
}
