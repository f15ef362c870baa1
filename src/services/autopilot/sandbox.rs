// Sandbox Worker
// Host side of the isolation boundary: every request runs in a fresh Python
// interpreter with kernel-enforced ceilings, a cleared environment and a
// throw-away working directory.

use crate::models::{FailureKind, ResourceUsage};
use crate::services::config_store::SandboxConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Worker script, passed to the interpreter with `-c`.
pub const HARNESS_SCRIPT: &str = include_str!("harness.py");

const STDERR_CAPTURE_BYTES: usize = 16 * 1024;
/// Room for the report envelope on top of the captured submission output.
const REPORT_OVERHEAD_BYTES: usize = 64 * 1024;
const INTERPRETER_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("python interpreter '{0}' not found")]
    InterpreterMissing(String),
    #[error("failed to start sandbox worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sandbox protocol error: {0}")]
    Protocol(String),
}

/// One execution request sent across the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerRequest {
    pub code: String,
    pub entry_point: String,
    pub args: Vec<Value>,
    pub allowed_modules: Vec<String>,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    /// The entry point returned. `value` is `None` when it returned Python `None`.
    Returned { value: Option<Value>, stdout: String },
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResponse {
    pub outcome: WorkerOutcome,
    pub usage: ResourceUsage,
}

/// An isolated execution context. Implementations must not share state
/// between calls; timeouts are enforced by the caller dropping the future.
#[async_trait]
pub trait SandboxWorker: Send + Sync {
    async fn execute(&self, request: &WorkerRequest) -> Result<WorkerResponse, SandboxError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxLimits {
    pub memory_limit_mb: u64,
    pub cpu_limit_secs: u64,
}

impl From<&SandboxConfig> for SandboxLimits {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            memory_limit_mb: config.memory_limit_mb,
            cpu_limit_secs: config.cpu_limit_secs,
        }
    }
}

#[derive(Serialize)]
struct HarnessRequest<'a> {
    nonce: &'a str,
    code: &'a str,
    entry_point: &'a str,
    args: &'a [Value],
    allowed_modules: &'a [String],
    max_output_bytes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HarnessReport {
    Returned {
        has_value: bool,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        stdout: String,
        #[serde(default)]
        stdout_truncated: bool,
        peak_memory_kb: Option<u64>,
    },
    Raised {
        kind: FailureKind,
        message: String,
        peak_memory_kb: Option<u64>,
    },
}

/// Launches `python -I -S -B` per request.
#[derive(Debug)]
pub struct PythonSandbox {
    python: PathBuf,
    limits: SandboxLimits,
    scratch_root: Option<PathBuf>,
    resolved: OnceCell<PathBuf>,
}

/// Kills the worker's whole process group, so nothing the submission
/// started outlives its test. Runs on drop, which covers timeouts and
/// cancelled callers.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // The shell's kill builtin takes a negative id as "every process in the group".
    let result = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(format!("kill -s KILL -- -{} 2>/dev/null", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        warn!("[AUTOPILOT] Failed to kill worker process group {}: {}", pgid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

impl PythonSandbox {
    pub fn new(python: impl Into<PathBuf>, limits: SandboxLimits) -> Self {
        Self {
            python: python.into(),
            limits,
            scratch_root: None,
            resolved: OnceCell::new(),
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        let sandbox = Self::new(&config.python_path, SandboxLimits::from(config));
        match &config.scratch_dir {
            Some(root) => sandbox.with_scratch_root(root.clone()),
            None => sandbox,
        }
    }

    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("autopilot_");
        match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    /// Absolute path of the real interpreter, so the worker can run with an
    /// empty environment even when `python3` is a shim.
    async fn interpreter(&self) -> Result<&Path, SandboxError> {
        let path = self
            .resolved
            .get_or_try_init(|| async {
                let probe = Command::new(&self.python)
                    .args(["-c", "import sys; print(sys.executable)"])
                    .stdin(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .output();
                let output = match tokio::time::timeout(INTERPRETER_PROBE_TIMEOUT, probe).await {
                    Ok(Ok(output)) if output.status.success() => output,
                    Ok(Err(e)) if e.kind() != std::io::ErrorKind::NotFound => {
                        return Err(SandboxError::Spawn(e));
                    }
                    _ => {
                        return Err(SandboxError::InterpreterMissing(
                            self.python.display().to_string(),
                        ))
                    }
                };
                let executable = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if executable.is_empty() {
                    return Err(SandboxError::InterpreterMissing(self.python.display().to_string()));
                }
                debug!("[AUTOPILOT] Resolved interpreter {}", executable);
                Ok(PathBuf::from(executable))
            })
            .await?;
        Ok(path.as_path())
    }

    fn command(&self, interpreter: &Path, scratch: &Path) -> Command {
        let mut cmd = if cfg!(unix) {
            // Limits are set by the launcher shell before the interpreter exists.
            let launcher = format!(
                "ulimit -v {} && ulimit -t {} && ulimit -f 0 && exec \"$0\" -I -S -B -c \"$1\"",
                self.limits.memory_limit_mb.saturating_mul(1024),
                self.limits.cpu_limit_secs.max(1),
            );
            let mut cmd = Command::new("/bin/sh");
            cmd.arg("-c").arg(launcher).arg(interpreter).arg(HARNESS_SCRIPT);
            cmd
        } else {
            warn!("[AUTOPILOT] Kernel resource limits unavailable on this platform; relying on timeout");
            let mut cmd = Command::new(interpreter);
            cmd.args(["-I", "-S", "-B", "-c", HARNESS_SCRIPT]);
            cmd
        };
        cmd.current_dir(scratch)
            .env_clear()
            .env("LC_ALL", "C.UTF-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Read a stream to its end, keeping at most `limit` bytes.
/// Returns the kept bytes and whether anything was discarded.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut overflow = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        if n > room {
            overflow = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((kept, overflow))
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join(" | ")
}

#[cfg(unix)]
fn termination_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Classify a worker that exited without a report.
fn classify_unreported(status: &std::process::ExitStatus, stderr: &str, stdout_overflow: bool) -> WorkerOutcome {
    let (kind, message) = match termination_signal(status) {
        Some(9) | Some(24) => (
            FailureKind::ResourceExceeded,
            "worker killed after exceeding its CPU or memory ceiling".to_string(),
        ),
        Some(25) => (
            FailureKind::SandboxViolation,
            "worker attempted to write a file".to_string(),
        ),
        Some(sig) => (
            FailureKind::RuntimeError,
            format!("worker terminated by signal {}", sig),
        ),
        None if stdout_overflow => (
            FailureKind::ResourceExceeded,
            "worker output exceeded the capture limit".to_string(),
        ),
        None if stderr.contains("MemoryError") => (
            FailureKind::ResourceExceeded,
            "MemoryError: memory limit exceeded".to_string(),
        ),
        None => {
            let detail = tail(stderr, 3);
            let message = if detail.is_empty() {
                format!("worker exited with {} and no report", status)
            } else {
                format!("worker exited with {}: {}", status, detail)
            };
            (FailureKind::RuntimeError, message)
        }
    };
    WorkerOutcome::Failed { kind, message }
}

fn parse_report(stdout: &str, nonce: &str) -> Option<Result<HarnessReport, SandboxError>> {
    let line = stdout.lines().rev().find_map(|l| l.strip_prefix(nonce))?;
    Some(serde_json::from_str(line).map_err(|e| SandboxError::Protocol(e.to_string())))
}

fn outcome_from_report(report: HarnessReport, max_output_bytes: usize) -> (WorkerOutcome, Option<u64>) {
    match report {
        HarnessReport::Returned {
            stdout_truncated: true,
            peak_memory_kb,
            ..
        } => (
            WorkerOutcome::Failed {
                kind: FailureKind::ResourceExceeded,
                message: format!("captured output exceeded {} bytes", max_output_bytes),
            },
            peak_memory_kb,
        ),
        HarnessReport::Returned {
            has_value,
            value,
            stdout,
            peak_memory_kb,
            ..
        } => (
            WorkerOutcome::Returned {
                value: has_value.then_some(value),
                stdout,
            },
            peak_memory_kb,
        ),
        HarnessReport::Raised {
            kind,
            message,
            peak_memory_kb,
        } => (WorkerOutcome::Failed { kind, message }, peak_memory_kb),
    }
}

#[async_trait]
impl SandboxWorker for PythonSandbox {
    async fn execute(&self, request: &WorkerRequest) -> Result<WorkerResponse, SandboxError> {
        let interpreter = self.interpreter().await?;
        let scratch = self.scratch_dir()?;
        let nonce = uuid::Uuid::new_v4().simple().to_string();

        let payload = serde_json::to_vec(&HarnessRequest {
            nonce: &nonce,
            code: &request.code,
            entry_point: &request.entry_point,
            args: &request.args,
            allowed_modules: &request.allowed_modules,
            max_output_bytes: request.max_output_bytes,
        })
        .map_err(|e| SandboxError::Protocol(e.to_string()))?;

        let started = Instant::now();
        let mut child = self
            .command(interpreter, scratch.path())
            .spawn()
            .map_err(SandboxError::Spawn)?;
        // The worker leads its own group, so the group id is its pid.
        let mut group = ProcessGroupGuard::new(if cfg!(unix) { child.id() } else { None });

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Protocol("worker stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Protocol("worker stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::Protocol("worker stderr unavailable".to_string()))?;

        let write = async move {
            let result = stdin.write_all(&payload).await;
            drop(stdin);
            result
        };
        let stdout_limit = request.max_output_bytes.saturating_add(REPORT_OVERHEAD_BYTES);
        let (write_result, stdout_result, stderr_result) = tokio::join!(
            write,
            read_capped(stdout, stdout_limit),
            read_capped(stderr, STDERR_CAPTURE_BYTES)
        );
        if let Err(e) = write_result {
            // The worker may die before reading its request; its exit status tells the story.
            debug!("[AUTOPILOT] Failed to deliver request to worker: {}", e);
        }
        let (stdout_bytes, stdout_overflow) = stdout_result?;
        let (stderr_bytes, _) = stderr_result?;
        // Before reaping the leader, so the group id cannot have been reused.
        group.kill();
        let status = child.wait().await?;
        let wall_time_ms = started.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&stdout_bytes);
        let stderr = String::from_utf8_lossy(&stderr_bytes);

        let (outcome, peak_memory_kb) = match parse_report(&stdout, &nonce) {
            Some(report) => outcome_from_report(report?, request.max_output_bytes),
            None => (classify_unreported(&status, &stderr, stdout_overflow), None),
        };

        debug!(
            "[AUTOPILOT] Worker finished status={} wall_ms={} peak_kb={:?}",
            status, wall_time_ms, peak_memory_kb
        );

        Ok(WorkerResponse {
            outcome,
            usage: ResourceUsage {
                wall_time_ms,
                peak_memory_kb,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Real-interpreter tests are skipped on hosts without python3.
    pub(crate) async fn python_sandbox() -> Option<PythonSandbox> {
        let sandbox = PythonSandbox::from_config(&SandboxConfig::default());
        match sandbox.interpreter().await {
            Ok(_) => Some(sandbox),
            Err(e) => {
                eprintln!("skipping sandbox test: {}", e);
                None
            }
        }
    }

    /// Live (non-zombie) processes whose cwd is under `dir`.
    #[cfg(target_os = "linux")]
    pub(crate) fn live_processes_in(dir: &Path) -> Vec<u32> {
        let Ok(dir) = dir.canonicalize() else { return Vec::new() };
        let Ok(entries) = std::fs::read_dir("/proc") else { return Vec::new() };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok())
            .filter(|pid| {
                let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).unwrap_or_default();
                let state = stat.rsplit_once(')').and_then(|(_, rest)| rest.trim_start().chars().next());
                if matches!(state, None | Some('Z') | Some('X')) {
                    return false;
                }
                std::fs::read_link(format!("/proc/{}/cwd", pid))
                    .map(|cwd| cwd.starts_with(&dir))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Polls until nothing runs under `dir`, returning what is still alive on give-up.
    #[cfg(target_os = "linux")]
    pub(crate) async fn wait_until_gone(dir: &Path, within: Duration) -> Vec<u32> {
        let deadline = Instant::now() + within;
        loop {
            let alive = live_processes_in(dir);
            if alive.is_empty() || Instant::now() >= deadline {
                return alive;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    fn request(code: &str, args: Vec<Value>) -> WorkerRequest {
        let config = SandboxConfig::default();
        WorkerRequest {
            code: code.to_string(),
            entry_point: "solve".to_string(),
            args,
            allowed_modules: config.allowed_modules,
            max_output_bytes: config.max_output_bytes,
        }
    }

    #[test]
    fn test_parse_report_uses_nonce_line() {
        let stdout = "noise\nabc{\"status\":\"returned\",\"has_value\":true,\"value\":3,\"stdout\":\"\",\"stdout_truncated\":false,\"peak_memory_kb\":100}\n";
        let report = parse_report(stdout, "abc").unwrap().unwrap();
        let (outcome, peak) = outcome_from_report(report, 10);
        assert_eq!(outcome, WorkerOutcome::Returned { value: Some(json!(3)), stdout: String::new() });
        assert_eq!(peak, Some(100));
        assert!(parse_report(stdout, "zzz").is_none());
    }

    #[test]
    fn test_truncated_output_is_resource_exceeded() {
        let report = HarnessReport::Returned {
            has_value: false,
            value: Value::Null,
            stdout: "x".repeat(10),
            stdout_truncated: true,
            peak_memory_kb: None,
        };
        let (outcome, _) = outcome_from_report(report, 10);
        assert!(matches!(outcome, WorkerOutcome::Failed { kind: FailureKind::ResourceExceeded, .. }));
    }

    #[tokio::test]
    async fn test_read_capped_drains_and_flags_overflow() {
        let data = vec![7u8; 20_000];
        let (kept, overflow) = read_capped(&data[..], 100).await.unwrap();
        assert_eq!(kept.len(), 100);
        assert!(overflow);
        let (kept, overflow) = read_capped(&data[..50], 100).await.unwrap();
        assert_eq!(kept.len(), 50);
        assert!(!overflow);
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let sandbox = PythonSandbox::new(
            "/nonexistent/python-for-tests",
            SandboxLimits { memory_limit_mb: 64, cpu_limit_secs: 1 },
        );
        let err = sandbox.execute(&request("def solve(): pass", vec![])).await.unwrap_err();
        assert!(matches!(err, SandboxError::InterpreterMissing(_)));
    }

    #[tokio::test]
    async fn test_python_returns_value_and_stdout() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "def solve(xs):\n    print('evens')\n    return sum(x for x in xs if x % 2 == 0)\n";
        let response = sandbox.execute(&request(code, vec![json!([1, 2, 3, 4])])).await.unwrap();
        assert_eq!(
            response.outcome,
            WorkerOutcome::Returned { value: Some(json!(6)), stdout: "evens\n".to_string() }
        );
    }

    #[tokio::test]
    async fn test_python_disallowed_import_is_violation() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "import socket\ndef solve(xs):\n    return 0\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        match response.outcome {
            WorkerOutcome::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::SandboxViolation);
                assert!(message.contains("socket"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_python_swallowed_violation_is_still_reported() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "def solve(xs):\n    try:\n        open('/etc/hostname')\n    except Exception:\n        pass\n    return 0\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        assert!(matches!(
            response.outcome,
            WorkerOutcome::Failed { kind: FailureKind::SandboxViolation, .. }
        ));
    }

    #[tokio::test]
    async fn test_python_runtime_error() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "def solve(xs):\n    return xs[10]\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        match response.outcome {
            WorkerOutcome::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::RuntimeError);
                assert!(message.starts_with("IndexError"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_python_memory_ceiling() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "def solve(xs):\n    return len(bytearray(2 * 1024 * 1024 * 1024))\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        assert!(matches!(
            response.outcome,
            WorkerOutcome::Failed { kind: FailureKind::ResourceExceeded, .. }
        ));
    }

    fn assert_violation(outcome: WorkerOutcome) {
        match outcome {
            WorkerOutcome::Failed { kind, .. } => assert_eq!(kind, FailureKind::SandboxViolation),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_python_private_module_attribute_is_violation() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = "import random\ndef solve(xs):\n    return random._os.listdir('/')\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        assert_violation(response.outcome);

        let code = "import random\ndef solve(xs):\n    try:\n        random._os.getcwd()\n    except Exception:\n        pass\n    return 0\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        assert_violation(response.outcome);

        let code = "from random import _os\ndef solve(xs):\n    return 0\n";
        let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
        assert_violation(response.outcome);
    }

    #[tokio::test]
    async fn test_python_reexported_modules_are_hidden() {
        let Some(sandbox) = python_sandbox().await else { return };
        for code in [
            "import typing\ndef solve(xs):\n    return typing.sys.platform\n",
            "import statistics\ndef solve(xs):\n    return statistics.sys.platform\n",
            "import collections._sys\ndef solve(xs):\n    return 0\n",
        ] {
            let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
            assert_violation(response.outcome);
        }
    }

    #[tokio::test]
    async fn test_python_introspection_attributes_are_violation() {
        let Some(sandbox) = python_sandbox().await else { return };
        for code in [
            "def solve(xs):\n    return solve.__globals__['__builtins__']\n",
            "def solve(xs):\n    return getattr(print, '__self__')\n",
            "import operator\ndef solve(xs):\n    return operator.attrgetter('__self__')(print)\n",
        ] {
            let response = sandbox.execute(&request(code, vec![json!([])])).await.unwrap();
            assert_violation(response.outcome);
        }
    }

    #[tokio::test]
    async fn test_python_whitelisted_modules_still_work() {
        let Some(sandbox) = python_sandbox().await else { return };
        let code = r#"import math, random, heapq
from collections import Counter, deque
from collections.abc import Iterable
from typing import List
from dataclasses import dataclass, field
from functools import reduce, lru_cache

@dataclass
class Acc:
    items: List[int] = field(default_factory=list)

@lru_cache(maxsize=None)
def double(x):
    return x * 2

def solve(xs):
    random.seed(1)
    acc = Acc()
    for x in deque(xs):
        if x % 2 == 0:
            heapq.heappush(acc.items, double(x) // 2)
    assert isinstance(acc.items, Iterable)
    assert Counter(xs)[1] == 1
    return int(math.fsum(acc.items)) + reduce(lambda a, b: a + b, [], 0)
"#;
        let response = sandbox.execute(&request(code, vec![json!([1, 2, 3, 4])])).await.unwrap();
        assert_eq!(
            response.outcome,
            WorkerOutcome::Returned { value: Some(json!(6)), stdout: String::new() }
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_group_kill_reaches_forked_processes() {
        let root = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg("sleep 30 & sleep 30 & wait")
            .current_dir(root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .process_group(0);
        let child = cmd.spawn().unwrap();
        let group = ProcessGroupGuard::new(child.id());

        let deadline = Instant::now() + Duration::from_secs(5);
        while live_processes_in(root.path()).len() < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(live_processes_in(root.path()).len(), 3);

        drop(group);
        drop(child);
        let alive = wait_until_gone(root.path(), Duration::from_secs(2)).await;
        assert!(alive.is_empty(), "still running: {:?}", alive);
    }
}
