use std::fs;
use std::path::{Path, PathBuf};

use spark_config::{PropertyMap, PropertyProvider, SourceError, Snapshot};
use tracing::debug;

/// 每次读取都重新打开文件，Refresh 因此能观察到文件内容的变化。
#[derive(Clone, Debug)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertyProvider for FileProvider {
    fn read_bytes(&self, _staged: &Snapshot) -> Result<Vec<u8>, SourceError> {
        let bytes = fs::read(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "configuration file read");
        Ok(bytes)
    }

    fn read(&self, _staged: &Snapshot) -> Result<PropertyMap, SourceError> {
        Err(SourceError::Unsupported {
            provider: "file",
            operation: "read",
        })
    }
}
