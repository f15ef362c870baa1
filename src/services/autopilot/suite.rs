// Autopilot Test Suite
// Static grading configuration: loaded once, read-only for the life of the process.

use crate::models::TestCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_SUITE_JSON: &str = include_str!("default_suite.json");

static GLOBAL_SUITE: OnceLock<TestSuite> = OnceLock::new();

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("failed to read test suite {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse test suite: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("test suite contains no tests")]
    Empty,
    #[error("duplicate test id '{0}'")]
    DuplicateId(String),
    #[error("test '{0}' input must be a JSON array of positional arguments")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub name: String,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default = "default_float_tolerance")]
    pub float_tolerance: f64,
    pub tests: Vec<TestCase>,
}

fn default_entry_point() -> String { "solve".to_string() }
fn default_float_tolerance() -> f64 { 1e-9 }

impl TestSuite {
    pub fn from_json(content: &str) -> Result<Self, SuiteError> {
        let suite: TestSuite = serde_json::from_str(content)?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let content = std::fs::read_to_string(path).map_err(|source| SuiteError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// The suite compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_json(DEFAULT_SUITE_JSON).expect("embedded default suite")
    }

    fn validate(&self) -> Result<(), SuiteError> {
        if self.tests.is_empty() {
            return Err(SuiteError::Empty);
        }
        let mut seen = HashSet::new();
        for case in &self.tests {
            if !seen.insert(case.id.as_str()) {
                return Err(SuiteError::DuplicateId(case.id.clone()));
            }
            if !case.input.is_array() {
                return Err(SuiteError::InvalidInput(case.id.clone()));
            }
        }
        Ok(())
    }

    /// Positional arguments for a test case.
    pub fn args_for(case: &TestCase) -> Vec<Value> {
        case.input.as_array().cloned().unwrap_or_default()
    }
}

/// Install the process-wide suite. The first successful call wins; later calls
/// return the already-installed suite.
pub fn init_global_suite(path: Option<&Path>) -> Result<&'static TestSuite, SuiteError> {
    if let Some(existing) = GLOBAL_SUITE.get() {
        if path.is_some() {
            warn!("[AUTOPILOT] Test suite already initialised; ignoring {:?}", path);
        }
        return Ok(existing);
    }

    let suite = match path {
        Some(p) => TestSuite::load(p)?,
        None => TestSuite::builtin(),
    };
    info!("[AUTOPILOT] Loaded test suite '{}' ({} tests)", suite.name, suite.tests.len());
    Ok(GLOBAL_SUITE.get_or_init(|| suite))
}

/// The process-wide suite, falling back to the built-in one.
pub fn global_suite() -> &'static TestSuite {
    GLOBAL_SUITE.get_or_init(TestSuite::builtin)
}

fn floats_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * 1f64.max(a.abs()).max(b.abs())
}

/// Structural JSON comparison. Integers must match exactly; any comparison
/// involving a float uses a relative tolerance.
pub fn outputs_match(actual: &Value, expected: &Value, tolerance: f64) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                return x == y;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => floats_close(x, y, tolerance),
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| outputs_match(x, y, tolerance))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).map_or(false, |w| outputs_match(v, w, tolerance)))
        }
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_builtin_suite_is_valid() {
        let suite = TestSuite::builtin();
        assert_eq!(suite.entry_point, "solve");
        assert!(suite.tests.len() >= 5);
        assert!(suite.tests.iter().all(|t| t.input.is_array()));
    }

    #[test]
    fn test_global_suite_is_stable() {
        let a = global_suite() as *const TestSuite;
        let b = global_suite() as *const TestSuite;
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            TestSuite::from_json(r#"{"name":"x","tests":[]}"#),
            Err(SuiteError::Empty)
        ));
        let dup = r#"{"name":"x","tests":[
            {"id":"a","input":[1],"expectedOutput":1},
            {"id":"a","input":[2],"expectedOutput":2}]}"#;
        assert!(matches!(TestSuite::from_json(dup), Err(SuiteError::DuplicateId(_))));
        let scalar = r#"{"name":"x","tests":[{"id":"a","input":3,"expectedOutput":1}]}"#;
        assert!(matches!(TestSuite::from_json(scalar), Err(SuiteError::InvalidInput(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name":"square","entryPoint":"square","tests":[{{"id":"two","input":[2],"expectedOutput":4}}]}}"#
        )
        .unwrap();
        let suite = TestSuite::load(file.path()).unwrap();
        assert_eq!(suite.name, "square");
        assert_eq!(suite.entry_point, "square");
        assert_eq!(suite.float_tolerance, 1e-9);
        assert_eq!(TestSuite::args_for(&suite.tests[0]), vec![json!(2)]);
    }

    #[test]
    fn test_outputs_match() {
        assert!(outputs_match(&json!(6), &json!(6), 1e-9));
        assert!(!outputs_match(&json!(6), &json!(7), 1e-9));
        assert!(outputs_match(&json!(6), &json!(6.0), 1e-9));
        assert!(outputs_match(&json!(0.1 + 0.2), &json!(0.3), 1e-9));
        assert!(!outputs_match(&json!(0.31), &json!(0.3), 1e-9));
        assert!(outputs_match(&json!([1, [2.0, "a"]]), &json!([1, [2, "a"]]), 1e-9));
        assert!(!outputs_match(&json!([1, 2]), &json!([1, 2, 3]), 1e-9));
        assert!(outputs_match(&json!({"a": 1.0}), &json!({"a": 1}), 1e-9));
        assert!(!outputs_match(&json!(true), &json!(1), 1e-9));
        assert!(outputs_match(&json!("done"), &json!("done"), 1e-9));
    }
}
