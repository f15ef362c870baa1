// Detection Module
// AI-likelihood scoring strategies behind one capability interface:
// - heuristic: fast score from lexical metrics (diversity + readability)
// - rigorous: n-gram, function-word and stylistic features over raw text

pub mod heuristic;
pub mod rigorous;

use crate::models::LexicalMetrics;

pub use heuristic::{heuristic_score, HeuristicScorer};
pub use rigorous::{rigorous_breakdown, rigorous_score, RigorousBreakdown, RigorousScorer};

/// A stateless AI-likelihood strategy. Implementations must return a value in [0, 1]
/// for every input, including empty text.
pub trait AiScorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, text: &str, metrics: &LexicalMetrics) -> f64;
}

/// Clamp into [0, 1], mapping NaN to the given fallback.
pub(crate) fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}
