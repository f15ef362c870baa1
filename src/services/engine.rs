// Analysis Engine
// One submission in, one AnalysisReport out:
// extract -> tokenize -> metrics -> {heuristic, rigorous} -> autopilot (Python only)

use crate::models::{AiScoreReport, AnalysisReport, AnalysisWarning, FileKind, Submission};
use crate::services::autopilot::{init_global_suite, Autopilot, SuiteError, TestSuite};
use crate::services::config_store::{AppConfig, ExtractionBackend};
use crate::services::detection::{AiScorer, HeuristicScorer, RigorousScorer};
use crate::services::extraction::{
    decode_text, detect_file_kind, is_python_source, BuiltinPdfExtractor, ExtractionError,
    PdftotextExtractor, TextExtractor,
};
use crate::services::readability::compute_metrics;
use crate::services::text_processor::tokenize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Whole-submission failures. Everything else ends up inside the report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("text extraction failed: {0}")]
    ExtractionFailure(#[from] ExtractionError),
}

/// Resolve the file kind from an explicit choice or the filename.
pub fn resolve_file_kind(filename: &str, explicit: Option<FileKind>) -> Result<FileKind, AnalysisError> {
    explicit
        .or_else(|| detect_file_kind(filename))
        .ok_or_else(|| AnalysisError::UnsupportedFileType(format!("unrecognised extension on '{}'", filename)))
}

pub struct AnalysisEngine {
    extractor: Arc<dyn TextExtractor>,
    extraction_timeout: Duration,
    heuristic: Box<dyn AiScorer>,
    rigorous: Box<dyn AiScorer>,
    autopilot: Option<(Autopilot, &'static TestSuite)>,
}

impl AnalysisEngine {
    pub fn new(extractor: Arc<dyn TextExtractor>, extraction_timeout: Duration) -> Self {
        Self {
            extractor,
            extraction_timeout,
            heuristic: Box::new(HeuristicScorer),
            rigorous: Box::new(RigorousScorer),
            autopilot: None,
        }
    }

    pub fn with_autopilot(mut self, autopilot: Autopilot, suite: &'static TestSuite) -> Self {
        self.autopilot = Some((autopilot, suite));
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SuiteError> {
        let extraction_timeout = Duration::from_millis(config.extraction.timeout_ms);
        let extractor: Arc<dyn TextExtractor> = match config.extraction.backend {
            ExtractionBackend::Pdftotext => Arc::new(PdftotextExtractor::new(
                &config.extraction.pdftotext_path,
                extraction_timeout,
            )),
            ExtractionBackend::Builtin => Arc::new(BuiltinPdfExtractor),
        };

        let engine = Self::new(extractor, extraction_timeout);
        if !config.autopilot.enabled {
            info!("[ENGINE] Autopilot disabled by configuration");
            return Ok(engine);
        }

        let suite = init_global_suite(config.autopilot.suite_path.as_deref())?;
        Ok(engine.with_autopilot(Autopilot::from_config(&config.sandbox), suite))
    }

    pub async fn analyze_submission(&self, submission: &Submission) -> Result<AnalysisReport, AnalysisError> {
        self.analyze(&submission.filename, &submission.raw_bytes, submission.detected_type)
            .await
    }

    pub async fn analyze(
        &self,
        filename: &str,
        content: &[u8],
        kind: FileKind,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        info!(
            "[ENGINE] Analyzing '{}' as {} ({} bytes)",
            filename,
            kind.as_str(),
            content.len()
        );

        let text = self.extract(content, kind).await?;

        let tokens = tokenize(&text);
        let metrics = compute_metrics(&tokens);

        let mut warnings = Vec::new();
        if metrics.word_count == 0 {
            warnings.push(AnalysisWarning::NoWords);
        }
        if metrics.sentence_count == 0 {
            warnings.push(AnalysisWarning::NoSentences);
        }
        for warning in &warnings {
            warn!("[ENGINE] '{}': {}", filename, warning.message());
        }

        let scores = AiScoreReport {
            heuristic_score: self.heuristic.score(&text, &metrics),
            rigorous_score: self.rigorous.score(&text, &metrics),
        };
        debug!(
            "[ENGINE] words={} sentences={} {}={:.4} {}={:.4}",
            metrics.word_count,
            metrics.sentence_count,
            self.heuristic.name(),
            scores.heuristic_score,
            self.rigorous.name(),
            scores.rigorous_score
        );

        let autopilot_result = match &self.autopilot {
            Some((autopilot, suite)) if kind == FileKind::Source && is_python_source(filename, &text) => {
                Some(autopilot.run_autopilot(&text, suite).await)
            }
            _ => None,
        };

        info!(
            "[ENGINE] '{}' analyzed in {} ms (autopilot: {})",
            filename,
            started.elapsed().as_millis(),
            autopilot_result.is_some()
        );

        Ok(AnalysisReport {
            metrics,
            scores,
            autopilot_result,
            warnings,
        })
    }

    async fn extract(&self, content: &[u8], kind: FileKind) -> Result<String, AnalysisError> {
        match kind {
            FileKind::Text | FileKind::Source => decode_text(content).ok_or_else(|| {
                AnalysisError::UnsupportedFileType(format!("binary content declared as {}", kind.as_str()))
            }),
            FileKind::Pdf => {
                let extraction = self.extractor.extract(content);
                match tokio::time::timeout(self.extraction_timeout, extraction).await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(e)) => {
                        warn!("[ENGINE] {} extraction failed: {}", self.extractor.name(), e);
                        Err(e.into())
                    }
                    Err(_) => Err(ExtractionError::Timeout(self.extraction_timeout.as_millis() as u64).into()),
                }
            }
        }
    }
}
