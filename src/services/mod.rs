// Candidate Analyzer Core Services
// Pipeline stages: extraction -> text_processor -> readability -> detection, plus autopilot

pub mod autopilot;
pub mod config_store;
pub mod detection;
pub mod engine;
pub mod extraction;
pub mod readability;
pub mod text_processor;

pub use config_store::{AppConfig, ConfigError, ConfigStore};
pub use engine::{resolve_file_kind, AnalysisEngine, AnalysisError};
pub use readability::compute_metrics;
pub use text_processor::tokenize;

pub use detection::{heuristic_score, rigorous_breakdown, rigorous_score, AiScorer};
pub use autopilot::{Autopilot, TestSuite};
