// Candidate Analyzer Data Models
// Every type here is built once by a pipeline stage and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============ Submission ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Source,
    Pdf,
}

impl FileKind {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "source" | "code" => Some(Self::Source),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Source => "source",
            Self::Pdf => "pdf",
        }
    }
}

/// An uploaded document as handed over by the hosting layer.
#[derive(Debug, Clone)]
pub struct Submission {
    pub filename: String,
    pub raw_bytes: Vec<u8>,
    pub detected_type: FileKind,
}

impl Submission {
    pub fn new(filename: impl Into<String>, raw_bytes: Vec<u8>, detected_type: FileKind) -> Self {
        Self {
            filename: filename.into(),
            raw_bytes,
            detected_type,
        }
    }
}

// ============ Tokens & Metrics ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Words in original case, punctuation stripped.
    pub words: Vec<String>,
    pub sentences: Vec<String>,
}

impl TokenSet {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalMetrics {
    pub word_count: usize,
    pub unique_word_count: usize,
    pub unique_ratio: f64,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    pub syllable_count: usize,
    pub flesch_reading_ease: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiScoreReport {
    #[serde(rename = "aiLikelihood")]
    pub heuristic_score: f64,
    #[serde(rename = "aiRigorousScore")]
    pub rigorous_score: f64,
}

// ============ Autopilot ============

/// One entry of the static grading suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    /// Positional arguments passed to the submission's entry point.
    pub input: Value,
    pub expected_output: Value,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    RuntimeError,
    WrongOutput,
    ResourceExceeded,
    SandboxViolation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RuntimeError => "runtime_error",
            Self::WrongOutput => "wrong_output",
            Self::ResourceExceeded => "resource_exceeded",
            Self::SandboxViolation => "sandbox_violation",
        }
    }
}

/// Lifecycle of a single test case. `Passed` and `Failed` are terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum TestState {
    Pending,
    Running,
    Passed,
    Failed(FailureKind),
}

impl TestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed(_))
    }

    /// Pending -> Running. Any other state is returned unchanged.
    pub fn begin(self) -> Self {
        match self {
            Self::Pending => Self::Running,
            other => other,
        }
    }

    /// Running -> Passed / Failed. Terminal states never move again.
    pub fn complete(self, failure: Option<FailureKind>) -> Self {
        match (self, failure) {
            (Self::Running, None) => Self::Passed,
            (Self::Running, Some(kind)) => Self::Failed(kind),
            (other, _) => other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub wall_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_kb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDetail {
    pub id: String,
    pub passed: bool,
    pub state: TestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

impl TestDetail {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.state {
            TestState::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotResult {
    pub suite: String,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub per_test_detail: Vec<TestDetail>,
}

impl AutopilotResult {
    pub fn from_details(suite: impl Into<String>, per_test_detail: Vec<TestDetail>) -> Self {
        let passed = per_test_detail.iter().filter(|d| d.passed).count();
        Self {
            suite: suite.into(),
            total_tests: per_test_detail.len(),
            passed,
            failed: per_test_detail.len() - passed,
            per_test_detail,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.total_tests > 0 && self.passed == self.total_tests
    }
}

// ============ Analysis Report ============

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisWarning {
    NoWords,
    NoSentences,
}

impl AnalysisWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoWords => "document contains no words; metrics default to zero",
            Self::NoSentences => "document contains no sentences; sentence metrics default to zero",
        }
    }
}

/// Flat analysis record returned to the hosting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub metrics: LexicalMetrics,
    #[serde(flatten)]
    pub scores: AiScoreReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autopilot_result: Option<AutopilotResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_flat() {
        let report = AnalysisReport {
            metrics: LexicalMetrics {
                word_count: 3,
                unique_word_count: 2,
                unique_ratio: 2.0 / 3.0,
                sentence_count: 1,
                avg_sentence_length: 3.0,
                syllable_count: 3,
                flesch_reading_ease: 100.0,
            },
            scores: AiScoreReport {
                heuristic_score: 0.4,
                rigorous_score: 0.5,
            },
            autopilot_result: None,
            warnings: vec![],
        };

        let json = serde_json::to_value(&report).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "wordCount",
            "uniqueWordCount",
            "uniqueRatio",
            "sentenceCount",
            "avgSentenceLength",
            "syllableCount",
            "fleschReadingEase",
            "aiLikelihood",
            "aiRigorousScore",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert!(!obj.contains_key("autopilotResult"));
        assert!(!obj.contains_key("warnings"));
    }

    #[test]
    fn test_autopilot_counts_follow_details() {
        let detail = |id: &str, passed: bool| TestDetail {
            id: id.to_string(),
            passed,
            state: if passed { TestState::Passed } else { TestState::Failed(FailureKind::WrongOutput) },
            actual_output: None,
            error_message: None,
            resource_usage: None,
        };
        let result = AutopilotResult::from_details("demo", vec![detail("a", true), detail("b", false), detail("c", true)]);
        assert_eq!(result.total_tests, 3);
        assert_eq!(result.passed, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.all_passed());
    }

    #[test]
    fn test_file_kind_parse() {
        assert_eq!(FileKind::parse("PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::parse(" source "), Some(FileKind::Source));
        assert_eq!(FileKind::parse("docx"), None);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(TestState::Failed(FailureKind::Timeout)).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "timeout");
        assert!(TestState::Passed.is_terminal());
        assert!(!TestState::Running.is_terminal());
    }

    #[test]
    fn test_state_transitions() {
        let running = TestState::Pending.begin();
        assert_eq!(running, TestState::Running);
        assert_eq!(running.complete(None), TestState::Passed);
        assert_eq!(
            running.complete(Some(FailureKind::Timeout)),
            TestState::Failed(FailureKind::Timeout)
        );
        // no retries: a finished test stays finished
        let failed = TestState::Failed(FailureKind::WrongOutput);
        assert_eq!(failed.begin(), failed);
        assert_eq!(failed.complete(None), failed);
        assert_eq!(TestState::Pending.complete(None), TestState::Pending);
    }
}
