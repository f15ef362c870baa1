use anyhow::{bail, Context, Result};
use candidate_analyzer_lib::init_logging;
use candidate_analyzer_lib::models::{FileKind, Submission};
use candidate_analyzer_lib::services::{resolve_file_kind, AnalysisEngine, AppConfig, ConfigStore};
use std::path::{Path, PathBuf};
use tracing::info;

const USAGE: &str = "Usage:
  candidate-analyzer <file> [--kind text|source|pdf] [--config <path>] [--suite <path>] [--out <json_path>] [--no-autopilot]
  candidate-analyzer --init-config [--config <path>]

Notes:
  - The report is printed to stdout as JSON; logs go to stderr and the session log file.
  - Autopilot grading runs only for Python sources (.py/.pyw or a python shebang).";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn config_store(args: &[String]) -> Result<ConfigStore> {
    match parse_arg_value(args, "--config") {
        Some(path) => Ok(ConfigStore::for_file(PathBuf::from(path))),
        None => ConfigStore::default_config_dir()
            .map(ConfigStore::new)
            .context("no configuration directory available on this platform"),
    }
}

fn init_config(args: &[String]) -> Result<()> {
    let store = config_store(args)?;
    let config = store.load().context("failed to load existing configuration")?;
    store.save(&config).context("failed to write configuration")?;
    println!("Configuration written to {}", store.config_file().display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") || has_flag(&args, "-h") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    if has_flag(&args, "--init-config") {
        return init_config(&args);
    }

    let path = PathBuf::from(&args[1]);
    if args[1].starts_with("--") {
        bail!("expected a file path as the first argument\n\n{}", USAGE);
    }

    let explicit_kind = match parse_arg_value(&args, "--kind") {
        Some(kind) => Some(FileKind::parse(&kind).with_context(|| format!("unknown --kind '{}'", kind))?),
        None => None,
    };

    let mut config: AppConfig = config_store(&args)?.load().context("failed to load configuration")?;
    if let Some(suite) = parse_arg_value(&args, "--suite") {
        config.autopilot.suite_path = Some(PathBuf::from(suite));
    }
    if has_flag(&args, "--no-autopilot") {
        config.autopilot.enabled = false;
    }

    let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let kind = resolve_file_kind(&filename, explicit_kind)?;

    let engine = AnalysisEngine::from_config(&config).context("failed to load autopilot test suite")?;
    let submission = Submission::new(filename, bytes, kind);
    let report = engine.analyze_submission(&submission).await?;

    let json = serde_json::to_string_pretty(&report)?;
    match parse_arg_value(&args, "--out") {
        Some(out) => {
            std::fs::write(Path::new(&out), &json).with_context(|| format!("failed to write {}", out))?;
            info!("Report written to {}", out);
        }
        None => println!("{}", json),
    }
    Ok(())
}
