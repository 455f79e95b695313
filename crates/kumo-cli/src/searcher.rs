//! Searcher that logs index notifications instead of indexing.

use std::sync::Arc;

use kumo_vfs::{FixedSearcherProvider, Searcher, SearcherError, SearcherProvider, VirtualFile};

pub struct TracingSearcher;

impl TracingSearcher {
    /// Provider handing out a shared `TracingSearcher`.
    pub fn provider() -> Arc<dyn SearcherProvider> {
        Arc::new(FixedSearcherProvider::new(Arc::new(TracingSearcher)))
    }
}

impl Searcher for TracingSearcher {
    fn add(&self, file: VirtualFile<'_>) -> Result<(), SearcherError> {
        tracing::debug!(path = %file.path(), folder = file.is_folder(), "index add");
        Ok(())
    }

    fn update(&self, file: VirtualFile<'_>) -> Result<(), SearcherError> {
        tracing::debug!(path = %file.path(), "index update");
        Ok(())
    }

    fn delete(&self, path: &str, is_file: bool) -> Result<(), SearcherError> {
        tracing::debug!(path, is_file, "index delete");
        Ok(())
    }
}
