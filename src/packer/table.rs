use log::debug;

use super::{
    cache::TypeAlignmentCache,
    classifier::TypeClassifier,
    order::{order_key, sort_columns},
};
use crate::{
    catalog::CatalogLookup,
    core::{ColumnDescriptor, PackError},
    sql::parser::{parse_create_table, ParsedColumn},
};

/// Reorders table definitions before they are created.
pub struct TableReorderer<'a> {
    classifier: TypeClassifier<'a>,
}

impl<'a> TableReorderer<'a> {
    pub fn new(catalog: &'a dyn CatalogLookup, cache: &'a TypeAlignmentCache) -> Self {
        Self {
            classifier: TypeClassifier::new(catalog, cache),
        }
    }

    /// Returns `columns`, given in declaration order, in packed order.
    pub fn reorder_columns(
        &self,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<Vec<ColumnDescriptor>, PackError> {
        sort_columns(&self.classifier, columns)
    }

    /// Rewrites a `CREATE TABLE` statement with its columns in packed order.
    /// Column and constraint text is kept as written; constraints follow the
    /// columns in their original order.
    pub fn reorder_create_table(&self, sql: &str) -> Result<String, PackError> {
        let statement = parse_create_table(sql)?;
        let primary_key = statement.primary_key_columns();

        let mut columns = vec![];
        let mut others = vec![];
        for element in &statement.elements {
            match &element.column {
                Some(column) => {
                    let descriptor = describe_column(column, &primary_key);
                    let alignment = self.classifier.classify(&descriptor.raw_type, None)?;
                    columns.push((order_key(&descriptor, alignment), element.text.as_str()));
                }
                None => others.push(element.text.as_str()),
            }
        }
        columns.sort_by(|(a, _), (b, _)| a.cmp(b));

        debug!(
            "Packed {}: {}",
            statement.name.name,
            columns
                .iter()
                .map(|(key, _)| format!("{} ({})", key.name(), key.alignment()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let elements = columns
            .into_iter()
            .map(|(_, text)| text)
            .chain(others)
            .collect::<Vec<_>>();

        Ok(format!(
            "{}{}{}",
            statement.head,
            elements.join(", "),
            statement.tail
        ))
    }
}

/// Primary key columns are NOT NULL whether or not the statement says so.
fn describe_column(column: &ParsedColumn, primary_key: &[String]) -> ColumnDescriptor {
    let is_primary_key = column.primary_key || primary_key.contains(&column.name);

    ColumnDescriptor::new(
        column.name.clone(),
        column.data_type.clone(),
        None,
        is_primary_key,
        !(column.not_null || is_primary_key),
        column.has_default,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::InMemoryCatalog, core::ErrorKind};

    fn reorder(catalog: &InMemoryCatalog, sql: &str) -> Vec<String> {
        let cache = TypeAlignmentCache::new();
        let packed = TableReorderer::new(catalog, &cache)
            .reorder_create_table(sql)
            .unwrap();
        column_names(&packed)
    }

    fn column_names(sql: &str) -> Vec<String> {
        parse_create_table(sql)
            .unwrap()
            .columns()
            .map(|c| c.name.clone())
            .collect()
    }

    #[test]
    fn orders_by_alignment() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (a_int4 integer, b_int8 bigint, c_int8 bigint, d_int4 integer)",
        );
        assert_eq!(names, vec!["b_int8", "c_int8", "a_int4", "d_int4"]);
    }

    #[test]
    fn orders_defaults_between_not_null_and_nullable() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (a_text text, c_text text default '5', b_text text not null, \
             a_int integer, c_int integer default 5, b_int integer not null)",
        );
        assert_eq!(
            names,
            vec!["b_int", "c_int", "a_int", "b_text", "c_text", "a_text"]
        );
    }

    #[test]
    fn serial_primary_key_leads() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (a_int8 bigint not null, z_int8 bigint not null, \
             created_at timestamp not null, updated_at timestamp not null, id bigserial primary key)",
        );
        assert_eq!(
            names,
            vec!["id", "a_int8", "created_at", "updated_at", "z_int8"]
        );

        let names = reorder(
            &catalog,
            "CREATE TABLE tests (a integer, b integer, PRIMARY KEY (b))",
        );
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn serials_count_as_not_null() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (d_serial serial, b_int4 integer not null, a_serial serial, c_int4 integer not null)",
        );
        assert_eq!(names, vec!["a_serial", "b_int4", "c_int4", "d_serial"]);
    }

    #[test]
    fn varchar_length_decides_bucket() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (d_integer integer, b_varchar varchar(128), a_short varchar(126), c_text text, e_flag boolean)",
        );
        assert_eq!(
            names,
            vec!["d_integer", "b_varchar", "c_text", "e_flag", "a_short"]
        );
    }

    #[test]
    fn enums_order_with_int4() {
        let mut catalog = InMemoryCatalog::new();
        catalog.create_enum("public", "mood").unwrap();
        let names = reorder(
            &catalog,
            "CREATE TABLE tests (d_enum mood, b_int4 integer, a_enum public.mood, c_int4 integer, e_int8 bigint)",
        );
        assert_eq!(names, vec!["e_int8", "a_enum", "b_int4", "c_int4", "d_enum"]);
    }

    #[test]
    fn constraints_survive() {
        let catalog = InMemoryCatalog::new();
        let cache = TypeAlignmentCache::new();
        let packed = TableReorderer::new(&catalog, &cache)
            .reorder_create_table(
                "CREATE TABLE tests (a integer, b bigint, CONSTRAINT a_positive CHECK (a > 0))",
            )
            .unwrap();

        assert_eq!(
            packed,
            "CREATE TABLE tests (b bigint, a integer, CONSTRAINT a_positive CHECK (a > 0))"
        );
    }

    #[test]
    fn keeps_columns_the_grammar_rejects() {
        let catalog = InMemoryCatalog::new();
        let cache = TypeAlignmentCache::new();
        let packed = TableReorderer::new(&catalog, &cache)
            .reorder_create_table(
                "CREATE TABLE public.t (flag boolean, bits bit varying, \
                 total bigint GENERATED ALWAYS AS ((a * 2)) STORED, a integer, \
                 short_bits bit varying(5), CONSTRAINT c CHECK ((a > 0)));",
            )
            .unwrap();

        assert_eq!(
            packed,
            "CREATE TABLE public.t (total bigint GENERATED ALWAYS AS ((a * 2)) STORED, \
             a integer, bits bit varying, flag boolean, short_bits bit varying(5), \
             CONSTRAINT c CHECK ((a > 0)));"
        );
    }

    #[test]
    fn keeps_text_after_the_element_list() {
        let catalog = InMemoryCatalog::new();
        let names = reorder(
            &catalog,
            "CREATE UNLOGGED TABLE IF NOT EXISTS \"Odd\" (\n  a integer,\n  b bigint\n) WITH (fillfactor = 70)",
        );
        assert_eq!(names, vec!["b", "a"]);

        let cache = TypeAlignmentCache::new();
        let packed = TableReorderer::new(&catalog, &cache)
            .reorder_create_table("CREATE TABLE t (a integer, b bigint) WITH (fillfactor = 70)")
            .unwrap();
        assert_eq!(
            packed,
            "CREATE TABLE t (b bigint, a integer) WITH (fillfactor = 70)"
        );
    }

    #[test]
    fn rejects_other_statements() {
        let catalog = InMemoryCatalog::new();
        let cache = TypeAlignmentCache::new();
        let err = TableReorderer::new(&catalog, &cache)
            .reorder_create_table("SELECT 1")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
    }

    #[test]
    fn reorders_descriptor_lists() {
        let catalog = InMemoryCatalog::new();
        let cache = TypeAlignmentCache::new();
        let columns = TableReorderer::new(&catalog, &cache)
            .reorder_columns(vec![
                ColumnDescriptor::new("flag", "boolean", None, false, true, false),
                ColumnDescriptor::new("id", "bigint", None, true, false, false),
                ColumnDescriptor::new("label", "text", None, false, true, false),
            ])
            .unwrap();
        let names = columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["id", "label", "flag"]);
    }
}
