//! In-memory persistence backend.
//!
//! Keeps documents in a map for tests and for sessions that should not
//! touch disk.

use crate::storage::traits::HistoryPersistence;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory persistence backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().map_or(0, |docs| docs.len())
    }

    /// Returns `true` if no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error<T>(e: &std::sync::PoisonError<T>) -> Error {
    Error::OperationFailed {
        operation: "lock_memory_backend".to_string(),
        cause: e.to_string(),
    }
}

impl HistoryPersistence for MemoryBackend {
    fn read_document(&self, name: &str) -> Result<Option<String>> {
        let docs = self.documents.lock().map_err(|e| lock_error(&e))?;
        Ok(docs.get(name).cloned())
    }

    fn write_document(&self, name: &str, contents: &str) -> Result<()> {
        let mut docs = self.documents.lock().map_err(|e| lock_error(&e))?;
        docs.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn remove_document(&self, name: &str) -> Result<bool> {
        let mut docs = self.documents.lock().map_err(|e| lock_error(&e))?;
        Ok(docs.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_remove() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());

        backend.write_document("a", "1").unwrap();
        backend.write_document("a", "2").unwrap();
        assert_eq!(backend.read_document("a").unwrap().as_deref(), Some("2"));
        assert_eq!(backend.len(), 1);

        assert!(backend.remove_document("a").unwrap());
        assert!(backend.read_document("a").unwrap().is_none());
    }
}
