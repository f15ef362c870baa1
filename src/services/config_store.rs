// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_VERSION: &str = "1.0.0";
const MAX_BACKUPS: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub autopilot: AutopilotConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            sandbox: SandboxConfig::default(),
            extraction: ExtractionConfig::default(),
            autopilot: AutopilotConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    #[serde(default = "default_python_path")]
    pub python_path: String,
    /// Wall-clock limit per test case.
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_memory_limit")]
    pub memory_limit_mb: u64,
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit_secs: u64,
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
    #[serde(default = "default_allowed_modules")]
    pub allowed_modules: Vec<String>,
    /// Parent for per-test scratch directories; the system temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python_path: default_python_path(),
            timeout_ms: default_sandbox_timeout(),
            memory_limit_mb: default_memory_limit(),
            cpu_limit_secs: default_cpu_limit(),
            max_output_bytes: default_max_output(),
            allowed_modules: default_allowed_modules(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    Pdftotext,
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    #[serde(default = "default_backend")]
    pub backend: ExtractionBackend,
    #[serde(default = "default_pdftotext_path")]
    pub pdftotext_path: String,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            pdftotext_path: default_pdftotext_path(),
            timeout_ms: default_extraction_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON suite replacing the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_path: Option<PathBuf>,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suite_path: None,
        }
    }
}

fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_python_path() -> String { "python3".to_string() }
fn default_sandbox_timeout() -> u64 { 2000 }
fn default_memory_limit() -> u64 { 256 }
fn default_cpu_limit() -> u64 { 2 }
fn default_max_output() -> usize { 65536 }
fn default_backend() -> ExtractionBackend { ExtractionBackend::Pdftotext }
fn default_pdftotext_path() -> String { "pdftotext".to_string() }
fn default_extraction_timeout() -> u64 { 15000 }
fn default_true() -> bool { true }

fn default_allowed_modules() -> Vec<String> {
    [
        "math", "string", "re", "collections", "itertools", "functools", "operator", "heapq",
        "bisect", "statistics", "fractions", "decimal", "typing", "dataclasses", "json", "random",
        "enum", "copy",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store rooted at an explicit config file; backups go next to it.
    pub fn for_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("candidate-analyzer"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_error(&self.config_dir))
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_error(&self.config_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_error(&self.config_file))
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_error(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_error(&backup_file))?;

        self.cleanup_old_backups(&backup_dir, MAX_BACKUPS)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_error(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first.
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sandbox.python_path, "python3");
        assert_eq!(config.sandbox.timeout(), Duration::from_millis(2000));
        assert!(config.sandbox.allowed_modules.iter().any(|m| m == "math"));
        assert!(!config.sandbox.allowed_modules.iter().any(|m| m == "os"));
        assert_eq!(config.extraction.backend, ExtractionBackend::Pdftotext);
        assert!(config.autopilot.enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"sandbox":{"timeoutMs":500},"extraction":{"backend":"builtin"}}"#).unwrap();
        assert_eq!(parsed.sandbox.timeout_ms, 500);
        assert_eq!(parsed.sandbox.memory_limit_mb, 256);
        assert_eq!(parsed.extraction.backend, ExtractionBackend::Builtin);
        assert_eq!(parsed.version, CONFIG_VERSION);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_round_trip_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        let mut config = AppConfig::default();
        config.autopilot.enabled = false;

        for _ in 0..13 {
            store.save(&config).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(store.load().unwrap(), config);

        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, MAX_BACKUPS);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ConfigStore::for_file(path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
