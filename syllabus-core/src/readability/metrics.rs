//! Text statistics and the standard readability formulas.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReadabilityError;

/// Markdown heading, emphasis and code markers.
static MARKDOWN_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*`]").expect("Invalid markdown marker pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"));

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("Invalid sentence break pattern"));

const WORD_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\''];

const VOWELS: &str = "aeiouy";

/// Words with at least this many syllables count as complex.
pub const COMPLEX_WORD_SYLLABLES: usize = 3;

/// Strip markdown markers and collapse whitespace runs into single spaces.
pub fn normalize(text: &str) -> String {
    let stripped = MARKDOWN_MARKERS.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Number of non-blank fragments between runs of `.`, `!` and `?`.
pub fn count_sentences(normalized: &str) -> usize {
    SENTENCE_BREAK
        .split(normalized)
        .filter(|fragment| !fragment.trim().is_empty())
        .count()
}

/// Whitespace separated tokens with surrounding punctuation removed.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .map(|token| token.trim_matches(WORD_PUNCTUATION))
        .filter(|word| !word.is_empty())
        .collect()
}

/// Heuristic syllable count.
///
/// Each run of vowels (`y` included) is one syllable, a trailing `e` is
/// silent, and every word has at least one syllable.
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let mut count: usize = 0;
    let mut previous_was_vowel = false;

    for ch in word.chars() {
        let is_vowel = VOWELS.contains(ch);
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }

    if word.ends_with('e') {
        count = count.saturating_sub(1);
    }

    count.max(1)
}

/// Label for a Flesch Reading Ease score.
pub fn readability_level(flesch_reading_ease: f64) -> &'static str {
    match flesch_reading_ease {
        s if s >= 90.0 => "Very Easy (5th grade)",
        s if s >= 80.0 => "Easy (6th grade)",
        s if s >= 70.0 => "Fairly Easy (7th grade)",
        s if s >= 60.0 => "Standard (8th-9th grade)",
        s if s >= 50.0 => "Fairly Difficult (10th-12th grade)",
        s if s >= 30.0 => "Difficult (College)",
        _ => "Very Difficult (College graduate)",
    }
}

/// Counts and scores for one block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityMetrics {
    pub sentence_count: usize,
    pub word_count: usize,
    pub syllable_count: usize,
    pub complex_word_count: usize,
    pub avg_words_per_sentence: f64,
    pub avg_syllables_per_word: f64,
    pub complex_word_percentage: f64,
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
    pub gunning_fog_index: f64,
    pub readability_level: String,
}

impl ReadabilityMetrics {
    pub fn from_text(text: &str) -> Self {
        let normalized = normalize(text);
        let sentence_count = count_sentences(&normalized);
        let words = words(&normalized);
        let word_count = words.len();

        let (syllable_count, complex_word_count) =
            words
                .iter()
                .fold((0usize, 0usize), |(syllables, complex), word| {
                    let n = count_syllables(word);
                    let is_complex = usize::from(n >= COMPLEX_WORD_SYLLABLES);
                    (syllables + n, complex + is_complex)
                });

        let avg_words_per_sentence = word_count as f64 / sentence_count.max(1) as f64;
        let avg_syllables_per_word = syllable_count as f64 / word_count.max(1) as f64;

        let (flesch_reading_ease, flesch_kincaid_grade, gunning_fog_index, complex_word_percentage) =
            if word_count == 0 {
                (100.0, 0.0, 0.0, 0.0)
            } else {
                let complex_word_percentage =
                    100.0 * complex_word_count as f64 / word_count as f64;
                let ease = 206.835 - 1.015 * avg_words_per_sentence - 84.6 * avg_syllables_per_word;
                let grade = 0.39 * avg_words_per_sentence + 11.8 * avg_syllables_per_word - 15.59;
                let fog = 0.4 * (avg_words_per_sentence + complex_word_percentage);
                (
                    ease.clamp(0.0, 100.0),
                    grade.max(0.0),
                    fog,
                    complex_word_percentage,
                )
            };

        Self {
            sentence_count,
            word_count,
            syllable_count,
            complex_word_count,
            avg_words_per_sentence,
            avg_syllables_per_word,
            complex_word_percentage,
            flesch_reading_ease,
            flesch_kincaid_grade,
            gunning_fog_index,
            readability_level: readability_level(flesch_reading_ease).to_string(),
        }
    }

    /// Reject NaN or infinite values before they reach a report.
    pub fn ensure_finite(&self) -> Result<(), ReadabilityError> {
        let checks = [
            ("avg_words_per_sentence", self.avg_words_per_sentence),
            ("avg_syllables_per_word", self.avg_syllables_per_word),
            ("complex_word_percentage", self.complex_word_percentage),
            ("flesch_reading_ease", self.flesch_reading_ease),
            ("flesch_kincaid_grade", self.flesch_kincaid_grade),
            ("gunning_fog_index", self.gunning_fog_index),
        ];

        match checks.iter().find(|(_, value)| !value.is_finite()) {
            Some((metric, _)) => Err(ReadabilityError::NonFiniteScore { metric: *metric }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_markdown() {
        assert_eq!(
            normalize("# Week 1\n\n**Learning** outcomes:\t`code`   here"),
            "Week 1 Learning outcomes: code here"
        );
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn test_count_sentences() {
        assert_eq!(count_sentences("Hello world. How are you?"), 2);
        assert_eq!(count_sentences("Wait... what?! Really"), 3);
        assert_eq!(count_sentences("No terminal punctuation"), 1);
        assert_eq!(count_sentences("...!!!"), 0);
        assert_eq!(count_sentences(""), 0);
    }

    #[test]
    fn test_words_trim_punctuation() {
        assert_eq!(
            words("\"Hello,\" she said; 'fine' -- ok!"),
            vec!["Hello", "she", "said", "fine", "--", "ok"]
        );
        assert!(words("... ,,, !!").is_empty());
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("queue"), 1);
        assert_eq!(count_syllables("syllable"), 2);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("education"), 4);
        assert_eq!(count_syllables("readability"), 5);
        assert_eq!(count_syllables("ACADEMIC"), 4);
        assert_eq!(count_syllables("hmm"), 1);
    }

    #[test]
    fn test_readability_level_bands() {
        assert_eq!(readability_level(100.0), "Very Easy (5th grade)");
        assert_eq!(readability_level(90.0), "Very Easy (5th grade)");
        assert_eq!(readability_level(85.0), "Easy (6th grade)");
        assert_eq!(readability_level(70.0), "Fairly Easy (7th grade)");
        assert_eq!(readability_level(65.0), "Standard (8th-9th grade)");
        assert_eq!(readability_level(50.0), "Fairly Difficult (10th-12th grade)");
        assert_eq!(readability_level(30.0), "Difficult (College)");
        assert_eq!(readability_level(29.9), "Very Difficult (College graduate)");
    }

    #[test]
    fn test_simple_text_is_easy() {
        let metrics = ReadabilityMetrics::from_text("The cat sat on the mat. It was fat.");

        assert_eq!(metrics.sentence_count, 2);
        assert_eq!(metrics.word_count, 9);
        assert_eq!(metrics.syllable_count, 9);
        assert_eq!(metrics.complex_word_count, 0);
        assert_eq!(metrics.avg_words_per_sentence, 4.5);
        assert_eq!(metrics.avg_syllables_per_word, 1.0);
        assert!(metrics.flesch_reading_ease >= 80.0);
        assert_eq!(metrics.flesch_kincaid_grade, 0.0);
        assert_eq!(metrics.readability_level, "Very Easy (5th grade)");
    }

    #[test]
    fn test_empty_text_has_safe_defaults() {
        let metrics = ReadabilityMetrics::from_text("");

        assert_eq!(metrics.word_count, 0);
        assert_eq!(metrics.sentence_count, 0);
        assert_eq!(metrics.avg_words_per_sentence, 0.0);
        assert_eq!(metrics.avg_syllables_per_word, 0.0);
        assert_eq!(metrics.flesch_reading_ease, 100.0);
        assert_eq!(metrics.flesch_kincaid_grade, 0.0);
        assert_eq!(metrics.gunning_fog_index, 0.0);
        assert!(metrics.ensure_finite().is_ok());
    }

    #[test]
    fn test_complex_text_scores() {
        let metrics = ReadabilityMetrics::from_text(
            "Institutional accreditation necessitates comprehensive documentation.",
        );

        assert_eq!(metrics.sentence_count, 1);
        assert_eq!(metrics.word_count, 5);
        assert_eq!(metrics.complex_word_count, 5);
        assert_eq!(metrics.complex_word_percentage, 100.0);
        assert_eq!(metrics.flesch_reading_ease, 0.0);
        assert!(metrics.flesch_kincaid_grade > 12.0);
        assert!((metrics.gunning_fog_index - 0.4 * (5.0 + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ensure_finite_reports_metric() {
        let mut metrics = ReadabilityMetrics::from_text("A short line.");
        metrics.gunning_fog_index = f64::NAN;

        assert_eq!(
            metrics.ensure_finite(),
            Err(ReadabilityError::NonFiniteScore {
                metric: "gunning_fog_index"
            })
        );
    }
}
