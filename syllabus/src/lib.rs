//! # Syllabus
//!
//! Syllabus protects the login form of a course platform and checks that the
//! course material on it is readable by its intended audience.
//!
//! - Progressive lockout per (email, IP address): 5 failures lock for 30
//!   minutes, 7 for 4 hours, 10 for 24 hours. A successful login resets the
//!   counter.
//! - Readability scoring with Flesch Reading Ease, Flesch-Kincaid Grade and
//!   Gunning Fog, checked against a target reading level.
//! - A registry of content validators, with readability registered by default.
//! - An audit log of every security event.
//!
//! ## Example
//!
//! ```rust,no_run
//! use syllabus::{AttemptResult, SyllabusBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let syllabus = SyllabusBuilder::new()
//!         .with_sqlite("sqlite://syllabus.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     match syllabus
//!         .authenticate("lecturer@example.edu", "203.0.113.7", async { true })
//!         .await?
//!     {
//!         AttemptResult::Succeeded(_) => println!("welcome"),
//!         AttemptResult::Failed(_) => println!("wrong password"),
//!         AttemptResult::Blocked(decision) => {
//!             println!("retry in {:?}s", decision.retry_after_seconds())
//!         }
//!     }
//!
//!     let summary = syllabus.validate_content("Week one covers the basics.");
//!     println!("content passed: {}", summary.passed);
//!     Ok(())
//! }
//! ```
use std::{future::Future, sync::Arc};

use syllabus_core::{
    ContentValidationService, LoginProtectionService, RepositoryProvider, SecurityEventRepository,
    repositories::{LoginAttemptRepositoryProvider, SecurityEventRepositoryProvider},
};

mod builder;

pub use builder::{NoStorage, SyllabusBuilder, SyllabusBuilderError, WithStorage};

/// Re-export core types from syllabus_core
pub use syllabus_core::{
    AnalysisResult, AttemptKey, AttemptResult, ContentValidator, Decision, Event, EventBus,
    EventHandler, LockoutConfig, LockoutPolicy, LockoutTier, LoginAttemptRecord,
    ReadabilityConfig, ReadabilityMetrics, ReadabilityScorer, ReadabilityValidator,
    SecurityEvent, SyllabusConfig, TargetLevel, ValidationReport, ValidationSummary,
    ValidatorRegistry,
};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub use syllabus_storage_sqlite::{self as sqlite, SqliteRepositoryProvider};

/// Errors returned by the [`Syllabus`] facade.
#[derive(Debug, thiserror::Error)]
pub enum SyllabusError {
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Invalid input such as a malformed IP address
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Event error: {0}")]
    EventError(String),
}

impl From<syllabus_core::Error> for SyllabusError {
    fn from(error: syllabus_core::Error) -> Self {
        use syllabus_core::Error;

        match error {
            Error::Storage(e) => SyllabusError::StorageError(e.to_string()),
            Error::Validation(e) => SyllabusError::ValidationError(e.to_string()),
            Error::Readability(e) => SyllabusError::ValidationError(e.to_string()),
            Error::Config(e) => SyllabusError::ConfigError(e.to_string()),
            Error::Event(e) => SyllabusError::EventError(e.to_string()),
        }
    }
}

type LoginAttemptRepo<R> = <R as LoginAttemptRepositoryProvider>::LoginAttemptRepo;

/// The main entry point, wiring storage, services, validators and events.
///
/// Build one with [`SyllabusBuilder`] and share it behind an `Arc`.
pub struct Syllabus<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: SyllabusConfig,
    login_protection: Arc<LoginProtectionService<LoginAttemptRepo<R>>>,
    content_validation: Arc<ContentValidationService>,
    scorer: ReadabilityScorer,
    events: EventBus,
}

impl<R: RepositoryProvider> Syllabus<R> {
    pub fn builder() -> SyllabusBuilder<NoStorage> {
        SyllabusBuilder::new()
    }

    pub fn config(&self) -> &SyllabusConfig {
        &self.config
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn validators(&self) -> &Arc<ValidatorRegistry> {
        self.content_validation.registry()
    }

    pub fn login_protection(&self) -> &Arc<LoginProtectionService<LoginAttemptRepo<R>>> {
        &self.login_protection
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), SyllabusError> {
        self.repositories
            .migrate()
            .await
            .map_err(|e| SyllabusError::StorageError(e.to_string()))
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), SyllabusError> {
        self.repositories
            .health_check()
            .await
            .map_err(|e| SyllabusError::StorageError(e.to_string()))
    }
}

/// Login protection
impl<R: RepositoryProvider> Syllabus<R> {
    /// Pre-check a login attempt before verifying credentials.
    pub async fn check_login(
        &self,
        email: &str,
        ip_address: &str,
    ) -> Result<Decision, SyllabusError> {
        Ok(self.login_protection.check(email, ip_address).await?)
    }

    /// Pre-check, verify and record a login attempt in one call.
    ///
    /// `verify` is only awaited when the pair is not locked out.
    pub async fn authenticate<F>(
        &self,
        email: &str,
        ip_address: &str,
        verify: F,
    ) -> Result<AttemptResult, SyllabusError>
    where
        F: Future<Output = bool> + Send,
    {
        Ok(self
            .login_protection
            .authenticate(email, ip_address, verify)
            .await?)
    }

    pub async fn record_login_success(
        &self,
        email: &str,
        ip_address: &str,
    ) -> Result<LoginAttemptRecord, SyllabusError> {
        Ok(self
            .login_protection
            .record_success(email, ip_address)
            .await?)
    }

    pub async fn record_login_failure(
        &self,
        email: &str,
        ip_address: &str,
        reason: Option<&str>,
    ) -> Result<LoginAttemptRecord, SyllabusError> {
        Ok(self
            .login_protection
            .record_failure(email, ip_address, reason)
            .await?)
    }

    /// Lift a lockout. Returns whether the pair was locked.
    pub async fn unlock(
        &self,
        email: &str,
        ip_address: &str,
        reason: &str,
    ) -> Result<bool, SyllabusError> {
        Ok(self
            .login_protection
            .unlock(email, ip_address, reason)
            .await?)
    }

    pub async fn cleanup_login_attempts(&self) -> Result<u64, SyllabusError> {
        Ok(self.login_protection.cleanup_stale().await?)
    }

    /// Start hourly cleanup of stale login attempt records.
    pub fn start_cleanup_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.login_protection.start_cleanup_task(shutdown)
    }

    /// Most recent security events for an email, newest first.
    pub async fn security_events(
        &self,
        email: &str,
        limit: u32,
    ) -> Result<Vec<SecurityEvent>, SyllabusError> {
        let email = syllabus_core::lockout::normalize_email(email);
        Ok(self
            .repositories
            .security_events()
            .list_for_email(&email, limit)
            .await?)
    }
}

/// Content checks
impl<R: RepositoryProvider> Syllabus<R> {
    /// Score content against the configured target level.
    pub fn analyze_content(&self, text: &str) -> AnalysisResult {
        self.scorer
            .analyze(text, self.config.readability.target_level)
    }

    pub fn analyze_content_for(&self, text: &str, target_level: TargetLevel) -> AnalysisResult {
        self.scorer.analyze(text, target_level)
    }

    /// Run every registered validator.
    pub fn validate_content(&self, text: &str) -> ValidationSummary {
        self.content_validation.validate(text)
    }
}
