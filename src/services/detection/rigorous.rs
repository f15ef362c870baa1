// Rigorous AI Detector
// Three feature groups computed straight from raw text, each mapped to a [0, 1]
// sub-score with soft thresholds and combined with fixed weights.

use super::{clamp_unit, AiScorer};
use crate::models::LexicalMetrics;
use crate::services::text_processor::{fold_case, normalize_punctuation, split_sentences, split_words};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Below this many words the n-gram statistics are noise; the detector
/// returns `NEUTRAL_SCORE` instead.
pub const RIGOROUS_MIN_WORDS: usize = 40;
pub const NEUTRAL_SCORE: f64 = 0.5;

pub const NGRAM_WEIGHT: f64 = 0.40;
pub const FUNCTION_WORD_WEIGHT: f64 = 0.25;
pub const STYLISTIC_WEIGHT: f64 = 0.35;

/// Normalised bigram entropy of natural prose; almost every bigram is distinct.
const REFERENCE_BIGRAM_ENTROPY: f64 = 0.97;
const ENTROPY_TOLERANCE: f64 = 0.05;
const ENTROPY_K: f64 = 0.03;
/// Share of repeated trigrams that natural prose rarely exceeds.
const TRIGRAM_REPEAT_CENTER: f64 = 0.08;
const TRIGRAM_REPEAT_K: f64 = 0.03;

const FUNCTION_DIVERGENCE_CENTER: f64 = 0.60;
const FUNCTION_DIVERGENCE_K: f64 = 0.15;

const SENTENCE_CV_CENTER: f64 = 0.40;
const SENTENCE_CV_K: f64 = 0.10;
const PUNCT_DIVERSITY_CENTER: f64 = 0.35;
const PUNCT_DIVERSITY_K: f64 = 0.08;
const UNIFORMITY_SHARE: f64 = 0.6;
const PUNCTUATION_SHARE: f64 = 0.4;

/// Closed set of articles, conjunctions and prepositions with their expected
/// share of running English text.
const FUNCTION_WORD_PROFILE: &[(&str, f64)] = &[
    ("the", 0.0600),
    ("of", 0.0300),
    ("and", 0.0280),
    ("to", 0.0250),
    ("a", 0.0230),
    ("in", 0.0190),
    ("for", 0.0080),
    ("on", 0.0065),
    ("with", 0.0065),
    ("as", 0.0055),
    ("at", 0.0045),
    ("by", 0.0045),
    ("but", 0.0045),
    ("from", 0.0040),
    ("an", 0.0035),
    ("or", 0.0035),
    ("if", 0.0020),
    ("so", 0.0020),
    ("into", 0.0018),
    ("about", 0.0017),
    ("over", 0.0010),
    ("after", 0.0008),
    ("because", 0.0008),
    ("between", 0.0006),
    ("through", 0.0006),
    ("under", 0.0005),
    ("while", 0.0005),
    ("yet", 0.0005),
    ("although", 0.0003),
    ("nor", 0.0002),
];

/// Marks a human writer typically mixes.
const PUNCTUATION_PALETTE: &[char] = &['.', ',', ';', ':', '!', '?', '-', '\'', '"', '('];

#[inline]
fn sigmoid(x: f64, center: f64, k: f64) -> f64 {
    1.0 / (1.0 + ((x - center) / k).exp())
}

#[inline]
fn sigmoid_inv(x: f64, center: f64, k: f64) -> f64 {
    1.0 - sigmoid(x, center, k)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigorousBreakdown {
    pub ngram: f64,
    pub function_words: f64,
    pub stylistic: f64,
    pub score: f64,
    /// True when the text was too short and every value is neutral.
    pub fallback: bool,
}

impl RigorousBreakdown {
    fn neutral() -> Self {
        Self {
            ngram: NEUTRAL_SCORE,
            function_words: NEUTRAL_SCORE,
            stylistic: NEUTRAL_SCORE,
            score: NEUTRAL_SCORE,
            fallback: true,
        }
    }
}

fn ngram_counts(tokens: &[String], n: usize) -> BTreeMap<&[String], usize> {
    let mut counts = BTreeMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Shannon entropy of the n-gram distribution divided by its maximum
/// (all n-grams distinct). 1.0 for fewer than two n-grams.
fn normalized_entropy(counts: &BTreeMap<&[String], usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total < 2 {
        return 1.0;
    }
    let total_f = total as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total_f;
            -p * p.log2()
        })
        .sum();
    entropy / total_f.log2()
}

/// Fraction of n-gram occurrences that repeat an earlier one.
fn repeat_rate(counts: &BTreeMap<&[String], usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let repeats: usize = counts.values().filter(|&&c| c >= 2).map(|&c| c - 1).sum();
    repeats as f64 / total as f64
}

fn ngram_subscore(folded: &[String]) -> f64 {
    let bigrams = ngram_counts(folded, 2);
    let trigrams = ngram_counts(folded, 3);

    let entropy = normalized_entropy(&bigrams);
    let entropy_signal = sigmoid(entropy, REFERENCE_BIGRAM_ENTROPY - ENTROPY_TOLERANCE, ENTROPY_K);
    let repeat_signal = sigmoid_inv(repeat_rate(&trigrams), TRIGRAM_REPEAT_CENTER, TRIGRAM_REPEAT_K);

    (entropy_signal + repeat_signal) / 2.0
}

/// Relative L1 distance between observed and expected function-word shares.
/// 0 is a perfect match; 1 means no function words at all.
fn function_word_divergence(folded: &[String]) -> f64 {
    let total = folded.len() as f64;
    let mut observed: BTreeMap<&str, usize> = BTreeMap::new();
    for word in folded {
        if FUNCTION_WORD_PROFILE.iter().any(|(fw, _)| *fw == word.as_str()) {
            *observed.entry(word.as_str()).or_insert(0) += 1;
        }
    }

    let expected_mass: f64 = FUNCTION_WORD_PROFILE.iter().map(|(_, share)| share).sum();
    let distance: f64 = FUNCTION_WORD_PROFILE
        .iter()
        .map(|(fw, share)| {
            let seen = observed.get(fw).copied().unwrap_or(0) as f64 / total;
            (seen - share).abs()
        })
        .sum();

    distance / expected_mass
}

fn function_word_subscore(folded: &[String]) -> f64 {
    sigmoid_inv(
        function_word_divergence(folded),
        FUNCTION_DIVERGENCE_CENTER,
        FUNCTION_DIVERGENCE_K,
    )
}

/// Coefficient of variation of sentence lengths in words. `None` with fewer
/// than two sentences.
fn sentence_length_cv(sentences: &[String]) -> Option<f64> {
    if sentences.len() < 2 {
        return None;
    }
    let lengths: Vec<f64> = sentences.iter().map(|s| split_words(s).len() as f64).collect();
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return None;
    }
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean)
}

fn punctuation_diversity(text: &str) -> f64 {
    let used: BTreeSet<char> = text.chars().filter(|c| PUNCTUATION_PALETTE.contains(c)).collect();
    used.len() as f64 / PUNCTUATION_PALETTE.len() as f64
}

fn stylistic_subscore(text: &str, sentences: &[String]) -> f64 {
    let uniformity = match sentence_length_cv(sentences) {
        Some(cv) => sigmoid(cv, SENTENCE_CV_CENTER, SENTENCE_CV_K),
        None => NEUTRAL_SCORE,
    };
    let punctuation = sigmoid(punctuation_diversity(text), PUNCT_DIVERSITY_CENTER, PUNCT_DIVERSITY_K);
    UNIFORMITY_SHARE * uniformity + PUNCTUATION_SHARE * punctuation
}

/// Full feature breakdown for a document.
pub fn rigorous_breakdown(text: &str) -> RigorousBreakdown {
    let normalized = normalize_punctuation(text);
    let folded: Vec<String> = split_words(&normalized).iter().map(|w| fold_case(w)).collect();
    if folded.len() < RIGOROUS_MIN_WORDS {
        return RigorousBreakdown::neutral();
    }

    let sentences = split_sentences(&normalized);
    let ngram = clamp_unit(ngram_subscore(&folded), NEUTRAL_SCORE);
    let function_words = clamp_unit(function_word_subscore(&folded), NEUTRAL_SCORE);
    let stylistic = clamp_unit(stylistic_subscore(&normalized, &sentences), NEUTRAL_SCORE);

    let score = clamp_unit(
        NGRAM_WEIGHT * ngram + FUNCTION_WORD_WEIGHT * function_words + STYLISTIC_WEIGHT * stylistic,
        NEUTRAL_SCORE,
    );

    RigorousBreakdown {
        ngram,
        function_words,
        stylistic,
        score,
        fallback: false,
    }
}

pub fn rigorous_score(text: &str) -> f64 {
    rigorous_breakdown(text).score
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RigorousScorer;

impl AiScorer for RigorousScorer {
    fn name(&self) -> &'static str {
        "rigorous"
    }

    fn score(&self, text: &str, _metrics: &LexicalMetrics) -> f64 {
        rigorous_score(text)
    }
}
