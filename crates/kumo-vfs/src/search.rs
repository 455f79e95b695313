//! Search index hooks.
//!
//! The full-text indexer lives outside this crate. The engine only tells it
//! what changed, after the change is committed, and never lets an index
//! failure fail the mutation.

use std::sync::Arc;

use thiserror::Error;

use crate::node::VirtualFile;

/// Errors reported by a searcher. Logged by the engine, never propagated.
#[derive(Debug, Error)]
pub enum SearcherError {
    #[error("searcher unavailable: {0}")]
    Unavailable(String),

    #[error("index error: {0}")]
    Index(String),
}

/// Receives change notifications for one mount.
pub trait Searcher: Send + Sync {
    /// Index `file` and, for folders, everything below it.
    fn add(&self, file: VirtualFile<'_>) -> Result<(), SearcherError>;

    /// Re-index a single node whose content or properties changed.
    fn update(&self, file: VirtualFile<'_>) -> Result<(), SearcherError>;

    /// Drop `path` (and, for folders, everything below it) from the index.
    fn delete(&self, path: &str, is_file: bool) -> Result<(), SearcherError>;
}

/// Hands out the searcher for a mount, creating it on demand.
pub trait SearcherProvider: Send + Sync {
    /// The searcher, or `None` if there is none and `create` is false.
    fn searcher(&self, create: bool) -> Result<Option<Arc<dyn Searcher>>, SearcherError>;

    /// Release index resources.
    fn close(&self) {}
}

/// Provider that always returns the same searcher.
pub struct FixedSearcherProvider {
    searcher: Arc<dyn Searcher>,
}

impl FixedSearcherProvider {
    pub fn new(searcher: Arc<dyn Searcher>) -> Self {
        Self { searcher }
    }
}

impl SearcherProvider for FixedSearcherProvider {
    fn searcher(&self, _create: bool) -> Result<Option<Arc<dyn Searcher>>, SearcherError> {
        Ok(Some(Arc::clone(&self.searcher)))
    }
}

impl std::fmt::Debug for FixedSearcherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedSearcherProvider").finish_non_exhaustive()
    }
}
