use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::metrics::ReadabilityMetrics;
use crate::{
    config::ReadabilityConfig,
    error::{ConfigError, ReadabilityError},
};

/// Content shorter than this many characters is not scored.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 100;

/// Intended audience of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLevel {
    Elementary,
    MiddleSchool,
    #[default]
    HighSchool,
    University,
}

impl TargetLevel {
    /// Highest Flesch-Kincaid grade that still passes. University content has
    /// no ceiling.
    pub fn grade_ceiling(self) -> Option<f64> {
        match self {
            TargetLevel::Elementary => Some(6.0),
            TargetLevel::MiddleSchool => Some(9.0),
            TargetLevel::HighSchool => Some(12.0),
            TargetLevel::University => None,
        }
    }

    /// Whether a Flesch-Kincaid grade is within this level's ceiling. The
    /// ceiling itself passes.
    pub fn accepts(self, grade: f64) -> bool {
        self.grade_ceiling().is_none_or(|ceiling| grade <= ceiling)
    }

    /// Grade that suggestions steer towards.
    pub fn target_grade(self) -> f64 {
        self.grade_ceiling().unwrap_or(14.0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetLevel::Elementary => "elementary",
            TargetLevel::MiddleSchool => "middle_school",
            TargetLevel::HighSchool => "high_school",
            TargetLevel::University => "university",
        }
    }

    /// Parse a configured level, falling back to `high_school` on anything
    /// unrecognised.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|e: ConfigError| {
            tracing::warn!(error = %e, "Unknown target level, using high_school");
            TargetLevel::default()
        })
    }
}

impl fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "elementary" => Ok(TargetLevel::Elementary),
            "middle_school" => Ok(TargetLevel::MiddleSchool),
            "high_school" => Ok(TargetLevel::HighSchool),
            "university" => Ok(TargetLevel::University),
            _ => Err(ConfigError::InvalidValue {
                key: "target_level".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Verdict, metrics and suggestions for one block of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub passed: bool,
    /// Too short to score; always passes.
    pub skipped: bool,
    pub target_level: TargetLevel,
    pub target_grade: f64,
    pub metrics: Option<ReadabilityMetrics>,
    pub suggestions: Vec<String>,
    pub message: String,
    /// Set when scoring failed internally. `metrics` is then `None`.
    pub error: Option<String>,
}

impl AnalysisResult {
    fn skipped(target_level: TargetLevel, min_content_length: usize) -> Self {
        Self {
            passed: true,
            skipped: true,
            target_level,
            target_grade: target_level.target_grade(),
            metrics: None,
            suggestions: Vec::new(),
            message: format!(
                "Content shorter than {min_content_length} characters, readability check skipped"
            ),
            error: None,
        }
    }

    fn failed(target_level: TargetLevel, error: &ReadabilityError) -> Self {
        Self {
            passed: false,
            skipped: false,
            target_level,
            target_grade: target_level.target_grade(),
            metrics: None,
            suggestions: Vec::new(),
            message: format!("Readability analysis failed: {error}"),
            error: Some(error.to_string()),
        }
    }
}

/// Scores text against a target reading level.
///
/// Stateless apart from its configuration, so one scorer can be shared
/// between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadabilityScorer {
    min_content_length: usize,
}

impl Default for ReadabilityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONTENT_LENGTH)
    }
}

impl ReadabilityScorer {
    pub fn new(min_content_length: usize) -> Self {
        Self { min_content_length }
    }

    pub fn from_config(config: &ReadabilityConfig) -> Self {
        Self::new(config.min_content_length)
    }

    pub fn min_content_length(&self) -> usize {
        self.min_content_length
    }

    /// Analyze `text`. Never panics or errors; an internal failure comes back
    /// as a failed result carrying the message.
    pub fn analyze(&self, text: &str, target_level: TargetLevel) -> AnalysisResult {
        match self.try_analyze(text, target_level) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Readability analysis failed");
                AnalysisResult::failed(target_level, &e)
            }
        }
    }

    fn try_analyze(
        &self,
        text: &str,
        target_level: TargetLevel,
    ) -> Result<AnalysisResult, ReadabilityError> {
        if text.trim().chars().count() < self.min_content_length {
            return Ok(AnalysisResult::skipped(
                target_level,
                self.min_content_length,
            ));
        }

        let metrics = ReadabilityMetrics::from_text(text);
        metrics.ensure_finite()?;

        let grade = metrics.flesch_kincaid_grade;
        let target_grade = target_level.target_grade();
        let passed = target_level.accepts(grade);

        let message = match (passed, target_level.grade_ceiling()) {
            (_, None) => format!(
                "Grade level {grade:.1} ({}), no ceiling applies to {target_level} content",
                metrics.readability_level
            ),
            (true, Some(ceiling)) => format!(
                "Grade level {grade:.1} is within the {target_level} ceiling of {ceiling:.0}"
            ),
            (false, Some(ceiling)) => format!(
                "Grade level {grade:.1} exceeds the {target_level} ceiling of {ceiling:.0}"
            ),
        };

        Ok(AnalysisResult {
            passed,
            skipped: false,
            target_level,
            target_grade,
            suggestions: suggestions(&metrics, target_grade),
            metrics: Some(metrics),
            message,
            error: None,
        })
    }
}

/// Improvement hints, each triggered independently.
pub fn suggestions(metrics: &ReadabilityMetrics, target_grade: f64) -> Vec<String> {
    let mut suggestions = Vec::new();
    let grade = metrics.flesch_kincaid_grade;

    if metrics.avg_words_per_sentence > 20.0 {
        suggestions.push(format!(
            "Shorten long sentences: average is {:.1} words, aim for 15-20 words per sentence",
            metrics.avg_words_per_sentence
        ));
    }
    if metrics.avg_words_per_sentence < 10.0 {
        suggestions.push("Combine some short sentences to improve flow".to_string());
    }
    if grade > target_grade + 2.0 {
        suggestions.push(format!(
            "Simplify vocabulary and sentence structure: grade level {grade:.1} is well above the target of {target_grade:.0}"
        ));
    }
    if grade < target_grade - 2.0 {
        suggestions.push(format!(
            "Add more sophisticated vocabulary or sentence structure: grade level {grade:.1} is well below the target of {target_grade:.0}"
        ));
    }
    if metrics.complex_word_percentage > 20.0 {
        suggestions.push(format!(
            "Use simpler word choices: {:.0}% of words have three or more syllables",
            metrics.complex_word_percentage
        ));
    }
    if metrics.avg_syllables_per_word > 2.0 {
        suggestions.push(format!(
            "Prefer shorter, more common words: average is {:.1} syllables per word",
            metrics.avg_syllables_per_word
        ));
    }

    suggestions
}
