use std::{fs, path::Path};

use enum_as_inner::EnumAsInner;
use log::{debug, info, warn};
use regex::Regex;

use super::{
    cache::TypeAlignmentCache,
    classifier::TypeClassifier,
    order::{order_key, OrderKey},
};
use crate::{
    catalog::{CatalogLookup, DEFAULT_SCHEMA},
    core::{ColumnDescriptor, ErrorKind, PackError},
    sql::parser::{parse_column_fragment, parse_qualified_name, QualifiedName},
};

lazy_static! {
    static ref BLOCK_START: Regex = Regex::new(
        r"^CREATE (?:(?:GLOBAL |LOCAL )?(?:TEMPORARY|TEMP) |UNLOGGED )?TABLE (?:IF NOT EXISTS )?(?P<name>.+) \(\s*$"
    )
    .unwrap();
}

/// Where the scanner is relative to a table block.
enum ScanState {
    Outside,
    InBlock(PendingBlock),
}

struct PendingBlock {
    start_line: String,
    table: QualifiedName,
    body: Vec<String>,
}

#[derive(Debug, EnumAsInner)]
enum BlockLine {
    Column(OrderKey, String),
    /// Constraints and anything else that is not a column definition.
    Other(String),
}

/// Reorders the columns of every `CREATE TABLE` block in a schema dump.
pub struct DumpRewriter<'a> {
    catalog: &'a dyn CatalogLookup,
    classifier: TypeClassifier<'a>,
}

impl<'a> DumpRewriter<'a> {
    pub fn new(catalog: &'a dyn CatalogLookup, cache: &'a TypeAlignmentCache) -> Self {
        Self {
            catalog,
            classifier: TypeClassifier::new(catalog, cache),
        }
    }

    /// Rewrites a whole dump. Text outside table blocks, and the opening and
    /// closing line of each block, is copied byte for byte.
    pub fn rewrite(&self, input: &str) -> Result<String, PackError> {
        let mut output = String::with_capacity(input.len());
        let mut state = ScanState::Outside;

        for line in input.split_inclusive('\n') {
            state = match state {
                ScanState::Outside => {
                    output.push_str(line);
                    match self.block_start(line) {
                        Some(table) => ScanState::InBlock(PendingBlock {
                            start_line: line.to_string(),
                            table,
                            body: vec![],
                        }),
                        None => ScanState::Outside,
                    }
                }
                ScanState::InBlock(mut block) => {
                    if is_block_end(line) {
                        for body_line in self.finalize_block(&block)? {
                            output.push_str(&body_line);
                        }
                        output.push_str(line);
                        ScanState::Outside
                    } else {
                        block.body.push(line.to_string());
                        ScanState::InBlock(block)
                    }
                }
            };
        }

        if let ScanState::InBlock(block) = state {
            warn!(
                "Table block {} has no closing line, leaving it unchanged",
                block.start_line.trim_end()
            );
            for body_line in block.body {
                output.push_str(&body_line);
            }
        }

        Ok(output)
    }

    /// Rewrites a dump file in place. Nothing is written unless every block
    /// was reordered.
    pub fn rewrite_file(&self, path: &Path) -> Result<(), PackError> {
        let input = fs::read_to_string(path)?;
        let output = self.rewrite(&input)?;

        if output == input {
            info!("{} is already packed", path.display());
            return Ok(());
        }

        replace_file(path, &output)?;

        info!("Rewrote {}", path.display());
        Ok(())
    }

    fn block_start(&self, line: &str) -> Option<QualifiedName> {
        let (content, _) = split_line_ending(line);
        let captures = BLOCK_START.captures(content)?;
        let name = &captures["name"];

        match parse_qualified_name(name) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Skipping table {}: {}", name, e);
                None
            }
        }
    }

    /// Returns the block body in packed order with commas repaired.
    fn finalize_block(&self, block: &PendingBlock) -> Result<Vec<String>, PackError> {
        let schema = block.table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        debug!("Packing table {}.{}", schema, block.table.name);

        let lines = block
            .body
            .iter()
            .map(|line| self.classify_line(schema, &block.table.name, line))
            .collect::<Result<Vec<_>, _>>()?;

        let (columns, others): (Vec<_>, Vec<_>) = lines
            .into_iter()
            .partition(|line| line.as_column().is_some());
        if columns.is_empty() {
            return Ok(block.body.clone());
        }

        let mut columns = columns
            .into_iter()
            .filter_map(|line| line.into_column().ok())
            .collect::<Vec<_>>();
        columns.sort_by(|(a, _), (b, _)| a.cmp(b));
        debug!(
            "Packed {}.{}: {}",
            schema,
            block.table.name,
            columns
                .iter()
                .map(|(key, _)| format!("{} ({})", key.name(), key.alignment()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let ordered = columns
            .into_iter()
            .map(|(_, text)| text)
            .chain(others.into_iter().filter_map(|line| line.into_other().ok()))
            .collect::<Vec<_>>();

        let last = ordered.len() - 1;
        Ok(ordered
            .iter()
            .enumerate()
            .map(|(index, line)| repair_trailing_comma(line, index != last))
            .collect())
    }

    fn classify_line(&self, schema: &str, table: &str, line: &str) -> Result<BlockLine, PackError> {
        let (content, _) = split_line_ending(line);
        let fragment = content.trim_end();
        let fragment = fragment.strip_suffix(',').unwrap_or(fragment);

        let Some(column) = parse_column_fragment(fragment)? else {
            return Ok(BlockLine::Other(line.to_string()));
        };

        let row = self
            .catalog
            .lookup_column(schema, table, &column.name)?
            .ok_or_else(|| {
                PackError::new(
                    ErrorKind::ColumnNotFound,
                    format!("{}.{} has no column {:?}", schema, table, column.name),
                )
            })?;

        let descriptor = ColumnDescriptor::new(
            column.name,
            row.formatted_type,
            None,
            row.primary_key,
            !row.not_null,
            row.has_default,
        );
        let alignment = self.classifier.classify(&descriptor.raw_type, None)?;

        Ok(BlockLine::Column(
            order_key(&descriptor, alignment),
            line.to_string(),
        ))
    }
}

/// Writes `contents` next to `path` and renames it over `path`.
fn replace_file(path: &Path, contents: &str) -> Result<(), PackError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".colpack-tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, contents)?;
    if let Err(e) = fs::rename(tmp_path, path) {
        let _ = fs::remove_file(tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// `);` closes a block, as does any line opening with `)`, which pg_dump
/// writes when storage options or inheritance follow.
fn is_block_end(line: &str) -> bool {
    let (content, _) = split_line_ending(line);
    content == ");" || content.starts_with(')')
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Adds or removes one trailing comma, keeping trailing whitespace and the
/// line ending.
fn repair_trailing_comma(line: &str, needs_comma: bool) -> String {
    let (content, ending) = split_line_ending(line);
    let body = content.trim_end();
    let trailing = &content[body.len()..];

    match (body.strip_suffix(','), needs_comma) {
        (None, true) => format!("{},{}{}", body, trailing, ending),
        (Some(stripped), false) => format!("{}{}{}", stripped, trailing, ending),
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn catalog_with(ddl: &[&str]) -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        for sql in ddl {
            catalog.create_table_from_sql(sql).unwrap();
        }
        catalog
    }

    fn rewrite(catalog: &InMemoryCatalog, input: &str) -> Result<String, PackError> {
        let cache = TypeAlignmentCache::new();
        DumpRewriter::new(catalog, &cache).rewrite(input)
    }

    #[test]
    fn reorders_columns_and_repairs_commas() {
        let catalog = catalog_with(&[
            "CREATE TABLE tests (a_int4 integer, b_int8 bigint, c_int8 bigint, d_int4 integer)",
        ]);
        let input = "\
CREATE TABLE public.tests (
    a_int4 integer,
    b_int8 bigint,
    c_int8 bigint,
    d_int4 integer
);
";
        let expected = "\
CREATE TABLE public.tests (
    b_int8 bigint,
    c_int8 bigint,
    a_int4 integer,
    d_int4 integer
);
";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn constraints_stay_last_in_original_order() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer, b bigint)"]);
        let input = "\
CREATE TABLE public.tests (
    a integer,
    b bigint,
    CONSTRAINT a_positive CHECK ((a > 0)),
    CONSTRAINT b_positive CHECK ((b > 0))
);
";
        let expected = "\
CREATE TABLE public.tests (
    b bigint,
    a integer,
    CONSTRAINT a_positive CHECK ((a > 0)),
    CONSTRAINT b_positive CHECK ((b > 0))
);
";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn constraint_moves_after_columns_and_loses_its_comma_if_last() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer, b bigint)"]);
        let input = "\
CREATE TABLE public.tests (
    CONSTRAINT a_positive CHECK ((a > 0)),
    a integer,
    b bigint
);
";
        let expected = "\
CREATE TABLE public.tests (
    b bigint,
    a integer,
    CONSTRAINT a_positive CHECK ((a > 0))
);
";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn passes_text_outside_blocks_through() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer, b bigint)"]);
        let input = "\
--
-- Name: tests; Type: TABLE; Schema: public; Owner: -
--

CREATE TABLE public.tests (
    a integer,
    b bigint
)
WITH (fillfactor='70');


ALTER TABLE public.tests OWNER TO postgres;
";
        let expected = "\
--
-- Name: tests; Type: TABLE; Schema: public; Owner: -
--

CREATE TABLE public.tests (
    b bigint,
    a integer
)
WITH (fillfactor='70');


ALTER TABLE public.tests OWNER TO postgres;
";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn quoted_names_and_qualified_types() {
        let mut catalog = InMemoryCatalog::new();
        catalog.create_schema("Odd Schema").unwrap();
        catalog.create_enum("Odd Schema", "odd type").unwrap();
        catalog
            .create_table_from_sql(
                r#"CREATE TABLE public."Weird Table" ("select" text, "Odd" "Odd Schema"."odd type", tags text[], id bigint NOT NULL)"#,
            )
            .unwrap();

        let input = r#"CREATE TABLE public."Weird Table" (
    "select" text,
    "Odd" "Odd Schema"."odd type",
    tags text[],
    id bigint NOT NULL
);
"#;
        let expected = r#"CREATE TABLE public."Weird Table" (
    id bigint NOT NULL,
    "Odd" "Odd Schema"."odd type",
    "select" text,
    tags text[]
);
"#;
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let catalog = catalog_with(&[
            "CREATE TABLE tests (a text, c text DEFAULT '5', b text NOT NULL, a_int integer, c_int integer DEFAULT 5, b_int integer NOT NULL)",
        ]);
        let input = "\
CREATE TABLE public.tests (
    a text,
    c text DEFAULT '5'::text,
    b text NOT NULL,
    a_int integer,
    c_int integer DEFAULT 5,
    b_int integer NOT NULL
);
";
        let once = rewrite(&catalog, input).unwrap();
        let twice = rewrite(&catalog, &once).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("    b_int integer NOT NULL,\n    c_int integer DEFAULT 5,\n"));
        assert!(once.ends_with("    a text\n);\n"));
    }

    #[test]
    fn keeps_crlf_and_trailing_whitespace() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer, b bigint)"]);
        let input = "CREATE TABLE public.tests (\r\n    a integer,  \r\n    b bigint \r\n);";
        let expected = "CREATE TABLE public.tests (\r\n    b bigint, \r\n    a integer  \r\n);";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn unterminated_block_is_left_alone() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer, b bigint)"]);
        let input = "CREATE TABLE public.tests (\n    a integer,\n    b bigint\n";
        assert_eq!(rewrite(&catalog, input).unwrap(), input);
    }

    #[test]
    fn empty_table_is_left_alone() {
        let catalog = InMemoryCatalog::new();
        let input = "CREATE TABLE public.nothing (\n);\n";
        assert_eq!(rewrite(&catalog, input).unwrap(), input);
    }

    #[test]
    fn unknown_column_aborts() {
        let catalog = catalog_with(&["CREATE TABLE tests (a integer)"]);
        let input = "CREATE TABLE public.tests (\n    a integer,\n    b bigint\n);\n";
        let err = rewrite(&catalog, input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ColumnNotFound);
    }

    #[test]
    fn unknown_type_aborts() {
        let mut catalog = InMemoryCatalog::new();
        catalog.create_enum("public", "mood").unwrap();
        catalog
            .create_table_from_sql("CREATE TABLE tests (a mood)")
            .unwrap();
        catalog.schemas[1].types.clear();

        let input = "CREATE TABLE public.tests (\n    a public.mood\n);\n";
        let err = rewrite(&catalog, input).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeNotFound { .. }));
    }

    #[test]
    fn varying_bits_and_generated_columns_are_columns() {
        let catalog = catalog_with(&[
            "CREATE TABLE t (flag boolean, bits bit varying, \
             total bigint GENERATED ALWAYS AS ((a * 2)) STORED, a integer, \
             short_bits bit varying(5))",
        ]);
        let input = "\
CREATE TABLE public.t (
    flag boolean,
    bits bit varying,
    total bigint GENERATED ALWAYS AS ((a * 2)) STORED,
    a integer,
    short_bits bit varying(5),
    CONSTRAINT c CHECK ((a > 0))
);
";
        let expected = "\
CREATE TABLE public.t (
    total bigint GENERATED ALWAYS AS ((a * 2)) STORED,
    a integer,
    bits bit varying,
    flag boolean,
    short_bits bit varying(5),
    CONSTRAINT c CHECK ((a > 0))
);
";
        assert_eq!(rewrite(&catalog, input).unwrap(), expected);
    }

    #[test]
    fn failed_rename_removes_the_copy() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dump.sql");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = replace_file(&target, "CREATE TABLE t ();\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoError);
        assert!(!dir.path().join("dump.sql.colpack-tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn comma_repair() {
        assert_eq!(repair_trailing_comma("    a integer\n", true), "    a integer,\n");
        assert_eq!(repair_trailing_comma("    a integer,\n", false), "    a integer\n");
        assert_eq!(repair_trailing_comma("    a integer,\n", true), "    a integer,\n");
        assert_eq!(repair_trailing_comma("    a integer", false), "    a integer");
    }

    #[test]
    fn block_end_lines() {
        assert!(is_block_end(");\n"));
        assert!(is_block_end(")\n"));
        assert!(is_block_end(") INHERITS (public.parent);\n"));
        assert!(!is_block_end("    a integer\n"));
        assert!(!is_block_end("    );\n"));
    }
}
