//! Content validators and the registry that runs them.
//!
//! A [`ContentValidator`] inspects a block of course content and returns a
//! [`ValidationReport`]. The [`ValidatorRegistry`] holds the validators
//! configured at startup and runs them in priority order.
//!
//! # Example
//!
//! ```rust
//! use syllabus_core::validation::{ReadabilityValidator, ValidatorRegistry};
//!
//! let registry = ValidatorRegistry::new();
//! registry.register(ReadabilityValidator::default());
//!
//! let validator = registry.get::<ReadabilityValidator>("readability");
//! assert!(validator.is_some());
//! ```
use std::sync::Arc;

use dashmap::DashMap;
use downcast_rs::{DowncastSync, impl_downcast};
use serde::{Deserialize, Serialize};

use crate::Error;

mod readability;

pub use readability::ReadabilityValidator;

/// A content quality check.
pub trait ContentValidator: DowncastSync {
    /// Unique name, used as the registry key.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    fn validate(&self, content: &str) -> Result<ValidationReport, Error>;
}
impl_downcast!(sync ContentValidator);

/// Result of one validator over one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validator: String,
    pub passed: bool,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Validator specific details, `null` when there are none.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ValidationReport {
    pub fn passed(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            passed: true,
            message: message.into(),
            suggestions: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn failed(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::passed(validator, message)
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// All reports for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// True when every report passed. Vacuously true with no validators.
    pub passed: bool,
    pub reports: Vec<ValidationReport>,
}

impl ValidationSummary {
    pub fn from_reports(reports: Vec<ValidationReport>) -> Self {
        Self {
            passed: reports.iter().all(|r| r.passed),
            reports,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationReport> {
        self.reports.iter().filter(|r| !r.passed)
    }

    pub fn report(&self, validator: &str) -> Option<&ValidationReport> {
        self.reports.iter().find(|r| r.validator == validator)
    }
}

/// Validators keyed by name.
///
/// Constructed explicitly and passed to whatever needs it. Registering a
/// validator under an existing name replaces the old one.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: DashMap<String, Arc<dyn ContentValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ContentValidator>(&self, validator: T) {
        self.register_arc(Arc::new(validator));
    }

    pub fn register_arc(&self, validator: Arc<dyn ContentValidator>) {
        let name = validator.name().to_string();
        let priority = validator.priority();
        if self.validators.insert(name.clone(), validator).is_some() {
            tracing::warn!(validator.name = %name, "Replaced existing validator");
        }
        tracing::info!(validator.name = %name, validator.priority = priority, "Registered validator");
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ContentValidator>> {
        let removed = self.validators.remove(name).map(|(_, v)| v);
        if removed.is_some() {
            tracing::info!(validator.name = %name, "Unregistered validator");
        }
        removed
    }

    /// Look a validator up by name and concrete type.
    pub fn get<T: ContentValidator>(&self, name: &str) -> Option<Arc<T>> {
        let validator = self.validators.get(name)?;
        validator.value().clone().downcast_arc::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validator names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.ordered()
            .iter()
            .map(|v| v.name().to_string())
            .collect()
    }

    /// Run every validator over `content`.
    ///
    /// A validator that errors contributes a failed report carrying the error
    /// message; the rest still run.
    pub fn validate_all(&self, content: &str) -> Vec<ValidationReport> {
        self.ordered()
            .into_iter()
            .map(|validator| {
                validator.validate(content).unwrap_or_else(|e| {
                    tracing::warn!(validator.name = %validator.name(), error = %e, "Validator failed");
                    ValidationReport::failed(validator.name(), e.to_string())
                })
            })
            .collect()
    }

    /// Snapshot sorted by priority, then name. Taken so no map guard is held
    /// while validators run.
    fn ordered(&self) -> Vec<Arc<dyn ContentValidator>> {
        let mut validators: Vec<_> = self
            .validators
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        validators.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        validators
    }
}
