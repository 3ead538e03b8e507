//! Storage layer abstraction.
//!
//! History documents are persisted through [`HistoryPersistence`]:
//! - **Filesystem**: one JSON file per document under the profile data dir
//! - **Memory**: a process-local map, for tests and ephemeral sessions

pub mod persistence;
pub mod traits;

pub use persistence::{FilesystemBackend, MemoryBackend};
pub use traits::HistoryPersistence;
