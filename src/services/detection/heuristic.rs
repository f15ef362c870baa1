// Heuristic AI Scorer
// Low lexical diversity plus smooth, easy readability reads as generated text.

use super::{clamp_unit, AiScorer};
use crate::models::LexicalMetrics;

/// Weight of the lexical-diversity deficit (1 - uniqueRatio).
pub const DIVERSITY_WEIGHT: f64 = 0.6;
/// Weight of the normalised Flesch score.
pub const READABILITY_WEIGHT: f64 = 0.4;
const FLESCH_CEILING: f64 = 100.0;

/// Fast score in [0, 1]. Non-increasing in `unique_ratio`, non-decreasing in
/// the Flesch score; zero when the document has no words.
pub fn heuristic_score(metrics: &LexicalMetrics) -> f64 {
    if metrics.word_count == 0 {
        return 0.0;
    }

    let diversity_deficit = 1.0 - metrics.unique_ratio.clamp(0.0, 1.0);
    let smoothness = metrics.flesch_reading_ease.clamp(0.0, FLESCH_CEILING) / FLESCH_CEILING;

    clamp_unit(
        DIVERSITY_WEIGHT * diversity_deficit + READABILITY_WEIGHT * smoothness,
        0.0,
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicScorer;

impl AiScorer for HeuristicScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn score(&self, _text: &str, metrics: &LexicalMetrics) -> f64 {
        heuristic_score(metrics)
    }
}
