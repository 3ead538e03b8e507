//! Filesystem-based persistence backend.
//!
//! Stores each history document as `<base_path>/<name>.json`. Writes are
//! "open, truncate, write, close"; there is one writer per profile so no
//! locking is attempted.
//!
//! # Security
//!
//! - **Path traversal**: document names are validated to prevent directory escape
//! - **File size limits**: maximum file size enforced to prevent memory exhaustion

use crate::storage::traits::HistoryPersistence;
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum file size for history documents (4MB).
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Filesystem-based persistence backend.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    /// Base directory for storage.
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Creates a new filesystem backend.
    ///
    /// The directory is created lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Creates a new filesystem backend with checked directory creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).map_err(|e| Error::OperationFailed {
            operation: "create_storage_dir".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self { base_path })
    }

    /// Returns the path for a document.
    fn document_path(&self, name: &str) -> Result<PathBuf> {
        if !Self::is_safe_filename(name) {
            return Err(Error::InvalidInput(format!(
                "Document name contains invalid characters: {name}",
            )));
        }

        Ok(self.base_path.join(format!("{name}.json")))
    }

    /// Checks if a filename is safe (no path traversal).
    fn is_safe_filename(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 128
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl HistoryPersistence for FilesystemBackend {
    fn read_document(&self, name: &str) -> Result<Option<String>> {
        let path = self.document_path(name)?;

        if !path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&path).map_err(|e| Error::OperationFailed {
            operation: "read_file_metadata".to_string(),
            cause: e.to_string(),
        })?;

        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "History document exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
            operation: "read_history_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Ok(Some(contents))
    }

    fn write_document(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.document_path(name)?;

        fs::create_dir_all(&self.base_path).map_err(|e| Error::OperationFailed {
            operation: "create_storage_dir".to_string(),
            cause: e.to_string(),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::OperationFailed {
                operation: "open_history_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| Error::OperationFailed {
                operation: "write_history_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Ok(())
    }

    fn remove_document(&self, name: &str) -> Result<bool> {
        let path = self.document_path(name)?;

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).map_err(|e| Error::OperationFailed {
            operation: "delete_history_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(true)
    }
}
