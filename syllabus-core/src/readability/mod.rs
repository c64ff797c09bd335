//! Readability scoring for course content.
//!
//! [`ReadabilityScorer::analyze`] computes Flesch Reading Ease, Flesch-Kincaid
//! Grade and Gunning Fog over a block of text and checks the grade against the
//! ceiling for a [`TargetLevel`].
//!
//! ```rust
//! use syllabus_core::readability::{ReadabilityScorer, TargetLevel};
//!
//! let scorer = ReadabilityScorer::default();
//! let result = scorer.analyze("Too short to score.", TargetLevel::Elementary);
//! assert!(result.skipped && result.passed);
//! ```

pub mod metrics;
mod scorer;

pub use metrics::ReadabilityMetrics;
pub use scorer::{
    AnalysisResult, DEFAULT_MIN_CONTENT_LENGTH, ReadabilityScorer, TargetLevel, suggestions,
};
