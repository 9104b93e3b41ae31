//! Upload payload references: a file on disk or an in-memory buffer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum SourceBody {
    /// Read from disk by the transport when the upload starts.
    Path(PathBuf),
    /// Already in memory (e.g. pasted from a clipboard).
    Bytes(Arc<[u8]>),
}

/// Immutable reference to one file's payload plus its display name and length.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    size: u64,
    body: SourceBody,
}

impl FileSource {
    /// Stat `path` and build a source named after its final component.
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("{} is not a regular file", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self {
            name,
            size: meta.len(),
            body: SourceBody::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            body: SourceBody::Bytes(Arc::from(bytes)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte length of the payload.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn body(&self) -> &SourceBody {
        &self.body
    }
}
