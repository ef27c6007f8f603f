mod conversion;

pub use conversion::{ConversionSpec, OpArg, Operation};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file staged for conversion and upload.
///
/// The pipeline updates `size`, `url` and (for timestamped uploads) `name`
/// in place; the caller owns the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size: 0,
            url: None,
        }
    }

    /// Builds a descriptor named after the file's own name, with its current size.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            url: None,
        })
    }
}

/// Result of a completed download. The destination file is closed and synced.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub uri: String,
    pub path: PathBuf,
    /// Declared Content-Length, if the server sent one
    pub total: Option<u64>,
    pub downloaded: u64,
}

impl DownloadOutcome {
    pub fn percent(&self) -> Option<f64> {
        crate::services::progress::percent_of(self.downloaded, self.total)
    }
}
