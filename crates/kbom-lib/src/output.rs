//! Output sinks for encoded documents
//!
//! A document is encoded completely before anything is written, so a failed
//! run never leaves a truncated file or a half-printed document behind.

use crate::encode::Format;
use crate::error::{KbomError, Result};
use crate::models::Snapshot;
use crate::observability::RunLogger;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

const FILE_KEY_LEN: usize = 8;

/// Where a document goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Stdout,
    File,
}

impl Output {
    pub fn from_name(name: &str) -> Result<Output> {
        match name {
            "stdout" => Ok(Output::Stdout),
            "file" => Ok(Output::File),
            other => Err(KbomError::UnsupportedOutput(other.to_string())),
        }
    }

    pub fn names() -> Vec<&'static str> {
        vec!["stdout", "file"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Output::Stdout => "stdout",
            Output::File => "file",
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name for a document: `kbom-<key>-<timestamp>.<ext>`
pub fn file_name(snapshot: &Snapshot, format: Format) -> String {
    let digest = &snapshot.cluster.ca_cert_digest;
    let key = if digest.len() > FILE_KEY_LEN {
        &digest[..FILE_KEY_LEN]
    } else {
        let id = &snapshot.id;
        &id[..id.len().min(FILE_KEY_LEN)]
    };
    format!(
        "kbom-{}-{}.{}",
        key,
        snapshot.generated_at.format("%Y-%m-%d-%H-%M-%S"),
        format.extension
    )
}

/// Encodes a snapshot and delivers it to stdout or a file
#[derive(Debug, Clone)]
pub struct OutputSink {
    output: Output,
    out_path: PathBuf,
}

impl OutputSink {
    pub fn new(output: Output, out_path: impl Into<PathBuf>) -> Self {
        Self {
            output,
            out_path: out_path.into(),
        }
    }

    /// Encode and write the document. Returns the file path in file mode.
    pub fn write(
        &self,
        snapshot: &Snapshot,
        format: Format,
        logger: &RunLogger,
    ) -> Result<Option<PathBuf>> {
        let bytes = format.encode(snapshot)?;

        match self.output {
            Output::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                write_all(&mut handle, &bytes)?;
                logger.log_document_written(format.name, "stdout", bytes.len());
                Ok(None)
            }
            Output::File => {
                let path = self.out_path.join(file_name(snapshot, format));
                write_file(&path, &bytes)?;
                logger.log_document_written(format.name, &path.display().to_string(), bytes.len());
                Ok(Some(path))
            }
        }
    }
}

fn write_all(writer: &mut impl Write, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| KbomError::EncodingFailed(format!("failed to write document: {}", e)))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| {
        KbomError::EncodingFailed(format!("failed to write {}: {}", path.display(), e))
    })
}
