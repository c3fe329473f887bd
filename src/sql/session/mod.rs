pub mod context;

use std::{path::Path, sync::Arc};

use log::{debug, info};

use self::context::PackContext;
use crate::{
    core::{AlignmentClass, ColumnDescriptor, PackError},
    packer::{DumpRewriter, TableReorderer, TypeAlignmentCache, TypeClassifier},
};

pub struct Session {
    ctx: PackContext,
}

impl Session {
    pub fn new(ctx: PackContext) -> Self {
        Self { ctx }
    }

    pub fn classify(&self, sql_type: &str, schema: Option<&str>) -> Result<AlignmentClass, PackError> {
        TypeClassifier::new(self.ctx.catalog.as_ref(), &self.ctx.cache).classify(sql_type, schema)
    }

    pub fn reorder_columns(
        &self,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<Vec<ColumnDescriptor>, PackError> {
        self.table_reorderer().reorder_columns(columns)
    }

    pub fn reorder_create_table(&self, sql_text: &str) -> Result<String, PackError> {
        debug!("Reordering table: {}", sql_text);
        self.table_reorderer().reorder_create_table(sql_text)
    }

    pub fn rewrite_dump(&self, dump: &str) -> Result<String, PackError> {
        self.dump_rewriter().rewrite(dump)
    }

    pub fn rewrite_dump_file(&self, path: &Path) -> Result<(), PackError> {
        info!("Rewriting dump file: {}", path.display());
        self.dump_rewriter().rewrite_file(path)
    }

    /// Forgets every cached classification. Call after types change in the
    /// catalog.
    pub fn reset_cache(&self) {
        self.ctx.cache.reset();
    }

    pub fn cache(&self) -> &Arc<TypeAlignmentCache> {
        &self.ctx.cache
    }

    fn table_reorderer(&self) -> TableReorderer<'_> {
        TableReorderer::new(self.ctx.catalog.as_ref(), &self.ctx.cache)
    }

    fn dump_rewriter(&self) -> DumpRewriter<'_> {
        DumpRewriter::new(self.ctx.catalog.as_ref(), &self.ctx.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    #[test]
    fn cache_is_shared_and_resettable() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = Arc::new(TypeAlignmentCache::new());
        let first = Session::new(PackContext::with_cache(catalog.clone(), cache.clone()));
        let second = Session::new(PackContext::with_cache(catalog.clone(), cache.clone()));

        assert_eq!(first.classify("uuid", None).unwrap(), AlignmentClass::Char);
        assert_eq!(second.classify("uuid", None).unwrap(), AlignmentClass::Char);
        assert_eq!(catalog.type_lookups(), 1);
        assert_eq!(cache.len(), 1);

        second.reset_cache();
        assert!(first.cache().is_empty());
    }

    #[test]
    fn reorders_statements() {
        let session = Session::new(PackContext::new(InMemoryCatalog::new()));
        let packed = session
            .reorder_create_table("CREATE TABLE t (flag boolean, id bigint)")
            .unwrap();
        assert_eq!(packed, "CREATE TABLE t (id bigint, flag boolean)");
    }
}
