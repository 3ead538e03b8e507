//! Persistence backend trait.

use crate::Result;

/// Durable storage for whole history documents.
///
/// Documents are addressed by a short name (`teleport_history`,
/// `typed_locations`) and always read and written in full. There is no
/// partial or incremental write.
pub trait HistoryPersistence: Send + Sync {
    /// Reads a document. Returns `Ok(None)` if it does not exist.
    fn read_document(&self, name: &str) -> Result<Option<String>>;

    /// Replaces a document with `contents`.
    fn write_document(&self, name: &str, contents: &str) -> Result<()>;

    /// Deletes a document. Returns `false` if it did not exist.
    fn remove_document(&self, name: &str) -> Result<bool>;

    /// Checks if a document exists.
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.read_document(name)?.is_some())
    }
}
