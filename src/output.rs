//! Delivery of the finished document

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Receives the serialized output once processing has fully succeeded
pub trait OutputSink {
    /// Deliver `bytes` under `file_name`, returning where they ended up
    fn deliver(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> Result<PathBuf>;
}

/// Writes output files into a directory
///
/// Bytes go to a temporary file in the same directory, which is renamed into
/// place once complete. The temporary file is removed on any failure.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OutputSink for DirectorySink {
    fn deliver(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> Result<PathBuf> {
        let target = self.dir.join(file_name);

        let mut partial = NamedTempFile::new_in(&self.dir)?;
        partial.write_all(bytes)?;
        partial.flush()?;
        partial.persist(&target).map_err(|e| e.error)?;

        tracing::info!(path = %target.display(), mime_type, size = bytes.len(), "wrote output");
        Ok(target)
    }
}
