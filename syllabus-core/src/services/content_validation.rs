use std::sync::Arc;

use crate::validation::{ValidationSummary, ValidatorRegistry};

/// Runs every registered validator over course content.
pub struct ContentValidationService {
    registry: Arc<ValidatorRegistry>,
}

impl ContentValidationService {
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    pub fn validate(&self, content: &str) -> ValidationSummary {
        let summary = ValidationSummary::from_reports(self.registry.validate_all(content));
        tracing::debug!(
            passed = summary.passed,
            validators = summary.reports.len(),
            "Validated content"
        );
        summary
    }
}
