use std::sync::Arc;

use crate::{catalog::CatalogLookup, packer::TypeAlignmentCache};

/// The context stores everything a session needs to pack columns.
pub struct PackContext {
    pub catalog: Box<dyn CatalogLookup>,
    pub cache: Arc<TypeAlignmentCache>,
}

impl PackContext {
    pub fn new(catalog: impl CatalogLookup + 'static) -> Self {
        Self {
            catalog: Box::new(catalog),
            cache: Arc::new(TypeAlignmentCache::new()),
        }
    }

    /// Shares an existing cache, so classifications survive across sessions.
    pub fn with_cache(catalog: impl CatalogLookup + 'static, cache: Arc<TypeAlignmentCache>) -> Self {
        Self {
            catalog: Box::new(catalog),
            cache,
        }
    }
}
