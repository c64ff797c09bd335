use crate::{
    Error,
    config::ReadabilityConfig,
    error::ValidationError,
    readability::{AnalysisResult, ReadabilityScorer, TargetLevel},
};

use super::{ContentValidator, ValidationReport};

/// Checks content against a target reading level.
///
/// The full [`AnalysisResult`] is attached as report metadata.
#[derive(Debug, Clone, Default)]
pub struct ReadabilityValidator {
    scorer: ReadabilityScorer,
    target_level: TargetLevel,
}

impl ReadabilityValidator {
    pub const NAME: &'static str = "readability";

    pub fn new(scorer: ReadabilityScorer, target_level: TargetLevel) -> Self {
        Self {
            scorer,
            target_level,
        }
    }

    pub fn from_config(config: &ReadabilityConfig) -> Self {
        Self::new(ReadabilityScorer::from_config(config), config.target_level)
    }

    pub fn target_level(&self) -> TargetLevel {
        self.target_level
    }

    pub fn scorer(&self) -> &ReadabilityScorer {
        &self.scorer
    }

    pub fn analyze(&self, content: &str) -> AnalysisResult {
        self.scorer.analyze(content, self.target_level)
    }
}

impl ContentValidator for ReadabilityValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Flesch-Kincaid grade level against the configured target level"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn validate(&self, content: &str) -> Result<ValidationReport, Error> {
        let result = self.analyze(content);

        if let Some(error) = &result.error {
            return Err(ValidationError::ValidatorFailed {
                validator: Self::NAME.to_string(),
                message: error.clone(),
            }
            .into());
        }

        let metadata = serde_json::to_value(&result).map_err(|e| ValidationError::ValidatorFailed {
            validator: Self::NAME.to_string(),
            message: e.to_string(),
        })?;

        let report = if result.passed {
            ValidationReport::passed(Self::NAME, result.message)
        } else {
            ValidationReport::failed(Self::NAME, result.message)
        };

        Ok(report
            .with_suggestions(result.suggestions)
            .with_metadata(metadata))
    }
}
