// Text Extraction Service
// Turns uploaded bytes into plain text: direct decode for text/source files,
// an injected PDF extractor for PDFs.

use crate::models::FileKind;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Bytes inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8192;
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const PDF_MAGIC: &[u8] = b"%PDF-";

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "rst"];
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyw", "rs", "js", "ts", "java", "c", "cc", "cpp", "h", "hpp", "go", "rb", "cs", "kt",
    "swift", "sh", "php",
];
const PYTHON_EXTENSIONS: &[&str] = &["py", "pyw"];

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF text extractor '{0}' is not installed or not on PATH")]
    ToolMissing(String),
    #[error("PDF text extractor failed (exit status {status}): {stderr}")]
    ToolFailed { status: String, stderr: String },
    #[error("PDF text extraction timed out after {0} ms")]
    Timeout(u64),
    #[error("content is not a PDF document")]
    NotPdf,
    #[error("PDF parse error: {0}")]
    Parse(String),
    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Classify an upload by its file extension.
pub fn detect_file_kind(filename: &str) -> Option<FileKind> {
    let ext = extension_of(filename)?;
    if ext == "pdf" {
        Some(FileKind::Pdf)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Text)
    } else if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Source)
    } else {
        None
    }
}

/// Python sources are recognised by extension or by a python shebang.
pub fn is_python_source(filename: &str, text: &str) -> bool {
    if let Some(ext) = extension_of(filename) {
        if PYTHON_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    text.lines()
        .next()
        .map(|first| first.starts_with("#!") && first.contains("python"))
        .unwrap_or(false)
}

pub fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}

/// Decode text/source uploads. Returns `None` for binary content.
pub fn decode_text(content: &[u8]) -> Option<String> {
    if looks_binary(content) {
        return None;
    }
    let body = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    Some(String::from_utf8_lossy(body).into_owned())
}

/// Collaborator that turns PDF bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Wraps the external `pdftotext` utility (poppler/xpdf).
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: PathBuf,
    timeout: Duration,
}

impl PdftotextExtractor {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new("pdftotext", Duration::from_secs(15))
    }
}

#[async_trait]
impl TextExtractor for PdftotextExtractor {
    fn name(&self) -> &str {
        "pdftotext"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut input = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(".pdf")
            .tempfile()?;
        input.write_all(bytes)?;
        input.flush()?;

        let program = self.program.to_string_lossy().to_string();
        debug!("[EXTRACT] Running {} on {} bytes", program, bytes.len());

        let child = Command::new(&self.program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(input.path())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("[EXTRACT] {} not found", program);
                return Err(ExtractionError::ToolMissing(program));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("[EXTRACT] {} timed out after {:?}", program, self.timeout);
                return Err(ExtractionError::Timeout(self.timeout.as_millis() as u64));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractionError::ToolFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("[EXTRACT] {} produced {} chars", program, text.chars().count());
        Ok(text)
    }
}

/// In-process extraction through the `pdf-extract` crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinPdfExtractor;

#[async_trait]
impl TextExtractor for BuiltinPdfExtractor {
    fn name(&self) -> &str {
        "pdf-extract"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotPdf);
        }
        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;
        info!("[EXTRACT] pdf-extract produced {} chars", text.chars().count());
        Ok(text)
    }
}
