//! Core types and services for Syllabus.
//!
//! This crate holds everything that does not touch a database:
//!
//! - [`lockout`]: the progressive brute force lockout policy
//! - [`readability`]: Flesch, Flesch-Kincaid and Gunning Fog scoring
//! - [`validation`]: content validators and their registry
//! - [`services`]: the policy and validators wired to repositories and events
//!
//! Storage backends implement the traits in [`repositories`].
pub mod config;
pub mod error;
pub mod events;
pub mod lockout;
pub mod readability;
pub mod repositories;
pub mod services;
pub mod validation;

pub use config::{LockoutConfig, ReadabilityConfig, SyllabusConfig};
pub use error::Error;
pub use events::{AuditLogHandler, Event, EventBus, EventHandler, SecurityEvent, UnlockReason};
pub use lockout::{
    AttemptKey, AttemptOutcome, Decision, LockoutPolicy, LockoutTier, LoginAttemptRecord,
};
pub use readability::{AnalysisResult, ReadabilityMetrics, ReadabilityScorer, TargetLevel};
pub use repositories::{
    LoginAttemptRepository, LoginAttemptRepositoryProvider, RepositoryProvider,
    SecurityEventRepository, SecurityEventRepositoryProvider,
};
pub use services::{AttemptResult, ContentValidationService, LoginProtectionService};
pub use validation::{
    ContentValidator, ReadabilityValidator, ValidationReport, ValidationSummary,
    ValidatorRegistry,
};
