// Lexical & Readability Calculator
// Word/sentence/syllable counts and the Flesch Reading Ease score.

use crate::models::{LexicalMetrics, TokenSet};
use crate::services::text_processor::fold_case;
use std::collections::HashSet;

pub const FLESCH_BASE: f64 = 206.835;
pub const FLESCH_SENTENCE_WEIGHT: f64 = 1.015;
pub const FLESCH_SYLLABLE_WEIGHT: f64 = 84.6;

/// Words of this many letters or fewer keep a trailing "e" as a syllable.
const SILENT_E_MIN_LETTERS: usize = 3;

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Rule-based syllable estimate.
///
/// Digits and punctuation are stripped and the word is lowercased first. Each
/// run of consecutive vowels counts once; a silent trailing "e" is dropped for
/// words longer than three letters (but not the consonant + "le" ending, as in
/// "table"). Every non-empty word has at least one syllable.
pub fn count_syllables(word: &str) -> usize {
    if word.trim().is_empty() {
        return 0;
    }

    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }

    let mut count = 0usize;
    let mut prev_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    let n = letters.len();
    if n > SILENT_E_MIN_LETTERS && letters[n - 1] == 'e' && count > 1 {
        let consonant_le = letters[n - 2] == 'l' && !is_vowel(letters[n - 3]);
        if !consonant_le {
            count -= 1;
        }
    }

    count.max(1)
}

/// Flesch Reading Ease. Zero when either denominator is zero; otherwise
/// reported as computed, even outside [0, 100].
pub fn flesch_reading_ease(word_count: usize, sentence_count: usize, syllable_count: usize) -> f64 {
    if word_count == 0 || sentence_count == 0 {
        return 0.0;
    }
    let words = word_count as f64;
    let words_per_sentence = words / sentence_count as f64;
    let syllables_per_word = syllable_count as f64 / words;
    FLESCH_BASE - FLESCH_SENTENCE_WEIGHT * words_per_sentence - FLESCH_SYLLABLE_WEIGHT * syllables_per_word
}

/// Lexical diversity and readability metrics for one tokenized submission.
pub fn compute_metrics(tokens: &TokenSet) -> LexicalMetrics {
    let word_count = tokens.word_count();
    let sentence_count = tokens.sentence_count();

    let unique_word_count = tokens
        .words
        .iter()
        .map(|w| fold_case(w))
        .collect::<HashSet<_>>()
        .len();

    let unique_ratio = if word_count == 0 {
        0.0
    } else {
        unique_word_count as f64 / word_count as f64
    };

    let avg_sentence_length = if sentence_count == 0 {
        0.0
    } else {
        word_count as f64 / sentence_count as f64
    };

    let syllable_count: usize = tokens.words.iter().map(|w| count_syllables(w)).sum();

    LexicalMetrics {
        word_count,
        unique_word_count,
        unique_ratio,
        sentence_count,
        avg_sentence_length,
        syllable_count,
        flesch_reading_ease: flesch_reading_ease(word_count, sentence_count, syllable_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::text_processor::tokenize;

    #[test]
    fn test_syllable_rules() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("reading"), 2);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("Rhythm"), 1);
        assert_eq!(count_syllables("be"), 1);
    }

    #[test]
    fn test_syllables_strip_digits_and_punctuation() {
        assert_eq!(count_syllables("HeLLo42!"), count_syllables("hello"));
        assert_eq!(count_syllables("2024"), 1);
        assert_eq!(count_syllables(""), 0);
    }

    #[test]
    fn test_known_fixture() {
        let metrics = compute_metrics(&tokenize("The cat sat on the mat. The dog ran fast."));
        assert_eq!(metrics.word_count, 10);
        assert_eq!(metrics.unique_word_count, 8);
        assert_eq!(metrics.sentence_count, 2);
        assert_eq!(metrics.avg_sentence_length, 5.0);
        assert_eq!(metrics.syllable_count, 10);
        // 206.835 - 1.015 * 5 - 84.6 * 1
        assert!((metrics.flesch_reading_ease - 117.16).abs() < 1e-9);
        assert!((metrics.unique_ratio - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input_defaults_to_zero() {
        let metrics = compute_metrics(&tokenize(""));
        assert_eq!(metrics, LexicalMetrics::default());
        assert_eq!(metrics.flesch_reading_ease, 0.0);
    }

    #[test]
    fn test_flesch_is_not_clamped() {
        // One short word per sentence scores above 100.
        let metrics = compute_metrics(&tokenize("Go. Run. Sit."));
        assert!(metrics.flesch_reading_ease > 100.0);
        let long = "Internationalization considerations notwithstanding, organizational responsibilities unquestionably necessitate extraordinarily comprehensive documentation";
        let metrics = compute_metrics(&tokenize(long));
        assert!(metrics.flesch_reading_ease < 0.0);
    }

    #[test]
    fn test_flesch_guards_denominators() {
        assert_eq!(flesch_reading_ease(0, 3, 0), 0.0);
        assert_eq!(flesch_reading_ease(5, 0, 7), 0.0);
    }

    #[test]
    fn test_unique_ratio_bounds() {
        for text in ["a a a a", "One two three.", "Same same SAME same. same!", "x"] {
            let metrics = compute_metrics(&tokenize(text));
            assert!(metrics.word_count >= metrics.unique_word_count);
            assert!(metrics.unique_ratio > 0.0 && metrics.unique_ratio <= 1.0);
        }
    }

    #[test]
    fn test_flesch_is_deterministic() {
        let text = "Readability formulas are simple. They still matter for screening!";
        let a = compute_metrics(&tokenize(text)).flesch_reading_ease;
        let b = compute_metrics(&tokenize(text)).flesch_reading_ease;
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
