// Autopilot Sandbox Executor
// Runs a Python submission against the static test suite, one fresh worker
// process per test case, and folds the outcomes into an AutopilotResult.

pub mod sandbox;
pub mod suite;

pub use sandbox::{
    PythonSandbox, SandboxError, SandboxLimits, SandboxWorker, WorkerOutcome, WorkerRequest,
    WorkerResponse,
};
pub use suite::{global_suite, init_global_suite, outputs_match, SuiteError, TestSuite};

use crate::models::{AutopilotResult, FailureKind, ResourceUsage, TestCase, TestDetail, TestState};
use crate::services::config_store::SandboxConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct Autopilot {
    worker: Arc<dyn SandboxWorker>,
    timeout: Duration,
    allowed_modules: Vec<String>,
    max_output_bytes: usize,
}

struct CaseOutcome {
    failure: Option<FailureKind>,
    actual_output: Option<Value>,
    error_message: Option<String>,
    usage: ResourceUsage,
}

impl Autopilot {
    pub fn new(worker: Arc<dyn SandboxWorker>, config: &SandboxConfig) -> Self {
        Self {
            worker,
            timeout: config.timeout(),
            allowed_modules: config.allowed_modules.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(Arc::new(PythonSandbox::from_config(config)), config)
    }

    /// Bounded by `tests × timeout`: every case ends Passed or Failed and
    /// a failing case never stops the ones after it.
    pub async fn run_autopilot(&self, source_code: &str, suite: &TestSuite) -> AutopilotResult {
        info!(
            "[AUTOPILOT] Running suite '{}' ({} tests, {} bytes of source)",
            suite.name,
            suite.tests.len(),
            source_code.len()
        );
        let started = Instant::now();
        let mut details = Vec::with_capacity(suite.tests.len());

        for case in &suite.tests {
            let state = TestState::Pending.begin();
            let outcome = self.run_case(source_code, suite, case).await;
            let state = state.complete(outcome.failure);
            debug!(
                "[AUTOPILOT] Test '{}' finished: {:?} in {} ms",
                case.id, state, outcome.usage.wall_time_ms
            );
            details.push(TestDetail {
                id: case.id.clone(),
                passed: state == TestState::Passed,
                state,
                actual_output: outcome.actual_output,
                error_message: outcome.error_message,
                resource_usage: Some(outcome.usage),
            });
        }

        let result = AutopilotResult::from_details(suite.name.clone(), details);
        info!(
            "[AUTOPILOT] Suite '{}' done: {}/{} passed in {} ms",
            suite.name,
            result.passed,
            result.total_tests,
            started.elapsed().as_millis()
        );
        result
    }

    async fn run_case(&self, source_code: &str, suite: &TestSuite, case: &TestCase) -> CaseOutcome {
        let request = WorkerRequest {
            code: source_code.to_string(),
            entry_point: suite.entry_point.clone(),
            args: TestSuite::args_for(case),
            allowed_modules: self.allowed_modules.clone(),
            max_output_bytes: self.max_output_bytes,
        };

        let started = Instant::now();
        // Dropping the pending future kills the worker process.
        let response = match tokio::time::timeout(self.timeout, self.worker.execute(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("[AUTOPILOT] Sandbox failure on test '{}': {}", case.id, e);
                return CaseOutcome {
                    failure: Some(FailureKind::RuntimeError),
                    actual_output: None,
                    error_message: Some(e.to_string()),
                    usage: elapsed_usage(started),
                };
            }
            Err(_) => {
                return CaseOutcome {
                    failure: Some(FailureKind::Timeout),
                    actual_output: None,
                    error_message: Some(format!(
                        "test exceeded the {} ms time limit",
                        self.timeout.as_millis()
                    )),
                    usage: elapsed_usage(started),
                };
            }
        };

        match response.outcome {
            WorkerOutcome::Failed { kind, message } => CaseOutcome {
                failure: Some(kind),
                actual_output: None,
                error_message: Some(message),
                usage: response.usage,
            },
            WorkerOutcome::Returned { value, stdout } => {
                let actual = value.unwrap_or_else(|| Value::String(stdout.trim().to_string()));
                if outputs_match(&actual, &case.expected_output, suite.float_tolerance) {
                    CaseOutcome {
                        failure: None,
                        actual_output: Some(actual),
                        error_message: None,
                        usage: response.usage,
                    }
                } else {
                    CaseOutcome {
                        failure: Some(FailureKind::WrongOutput),
                        error_message: Some(format!("expected {}, got {}", case.expected_output, actual)),
                        actual_output: Some(actual),
                        usage: response.usage,
                    }
                }
            }
        }
    }
}

fn elapsed_usage(started: Instant) -> ResourceUsage {
    ResourceUsage {
        wall_time_ms: started.elapsed().as_millis() as u64,
        peak_memory_kb: None,
    }
}
