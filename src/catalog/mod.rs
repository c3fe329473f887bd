use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::debug;

use self::defs::{ColumnDefinition, SchemaDefinition, TableDefinition, TypeDefinition};
use crate::{
    core::{is_serial_type, ErrorKind, PackError},
    sql::parser::{parse_create_table, ParsedColumn, QualifiedName},
};

pub mod builtin;
pub mod defs;
pub mod postgres;

pub use postgres::PostgresCatalog;

pub const SYSTEM_SCHEMA: &str = "pg_catalog";
pub const DEFAULT_SCHEMA: &str = "public";

/// Storage category and alignment of a type (`pg_type.typtype`, `pg_type.typalign`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeRow {
    pub category: char,
    pub align: char,
}

impl TypeRow {
    pub fn is_enum(&self) -> bool {
        self.category == 'e'
    }
}

/// Catalog facts about one table column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRow {
    pub formatted_type: String,
    pub not_null: bool,
    pub has_default: bool,
    pub primary_key: bool,
}

/// Point queries against type and column metadata. A missing row is
/// `Ok(None)`; `Err` means the lookup itself failed.
pub trait CatalogLookup {
    fn lookup_type(&self, type_name: &str, schema: Option<&str>)
        -> Result<Option<TypeRow>, PackError>;

    fn lookup_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnRow>, PackError>;
}

impl<T: CatalogLookup + ?Sized> CatalogLookup for Arc<T> {
    fn lookup_type(
        &self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<Option<TypeRow>, PackError> {
        (**self).lookup_type(type_name, schema)
    }

    fn lookup_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnRow>, PackError> {
        (**self).lookup_column(schema, table, column)
    }
}

impl<T: CatalogLookup + ?Sized> CatalogLookup for Box<T> {
    fn lookup_type(
        &self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<Option<TypeRow>, PackError> {
        (**self).lookup_type(type_name, schema)
    }

    fn lookup_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnRow>, PackError> {
        (**self).lookup_column(schema, table, column)
    }
}

/// A catalog kept in memory, seeded with the `pg_catalog` built-in types and
/// an empty `public` schema. Counts the lookups it serves.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    pub schemas: Vec<SchemaDefinition>,
    pub search_path: Vec<String>,
    type_lookups: AtomicUsize,
    column_lookups: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            search_path: vec![SYSTEM_SCHEMA.to_string(), DEFAULT_SCHEMA.to_string()],
            ..Self::default()
        };
        catalog.schemas.push(SchemaDefinition {
            name: SYSTEM_SCHEMA.to_string(),
            tables: vec![],
            types: builtin::builtin_types(),
        });
        catalog.schemas.push(SchemaDefinition {
            name: DEFAULT_SCHEMA.to_string(),
            tables: vec![],
            types: vec![],
        });
        catalog
    }

    pub fn create_schema(&mut self, schema_name: &str) -> Result<(), PackError> {
        if self.exists_schema(schema_name) {
            return Err(PackError::new(
                ErrorKind::CatalogLookupFailure,
                "schema already exists",
            ));
        }

        self.schemas.push(SchemaDefinition {
            name: schema_name.to_string(),
            tables: vec![],
            types: vec![],
        });

        Ok(())
    }

    pub fn exists_schema(&self, schema_name: &str) -> bool {
        self.schemas.iter().any(|schema| schema.name == schema_name)
    }

    pub fn create_type(
        &mut self,
        schema_name: &str,
        type_def: TypeDefinition,
    ) -> Result<(), PackError> {
        let schema = self.schema_mut(schema_name)?;
        if schema.types.iter().any(|t| t.name == type_def.name) {
            return Err(PackError::new(
                ErrorKind::CatalogLookupFailure,
                format!("type {}.{} already exists", schema_name, type_def.name),
            ));
        }

        schema.types.push(type_def);
        Ok(())
    }

    pub fn create_enum(&mut self, schema_name: &str, type_name: &str) -> Result<(), PackError> {
        self.create_type(
            schema_name,
            TypeDefinition {
                name: type_name.to_string(),
                category: 'e',
                align: 'i',
            },
        )
    }

    pub fn create_table(
        &mut self,
        schema_name: &str,
        table_def: TableDefinition,
    ) -> Result<(), PackError> {
        if self.find_table_by_name(schema_name, &table_def.name).is_some() {
            return Err(PackError::new(
                ErrorKind::CatalogLookupFailure,
                "table already exists",
            ));
        }

        self.schema_mut(schema_name)?.tables.push(table_def);

        Ok(())
    }

    /// Registers the table a `CREATE TABLE` statement would create, recording
    /// column metadata the way PostgreSQL reports it afterwards: serial types
    /// become their integer types with a default and NOT NULL, primary key
    /// columns are NOT NULL.
    pub fn create_table_from_sql(&mut self, sql: &str) -> Result<(), PackError> {
        let statement = parse_create_table(sql)?;
        let schema_name = statement
            .name
            .schema
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        let primary_key_columns = statement.primary_key_columns();

        let columns = statement
            .columns()
            .map(|column| {
                let primary_key = primary_key_columns.contains(&column.name);
                let serial = is_serial_type(&column.data_type);

                ColumnDefinition {
                    name: column.name.clone(),
                    formatted_type: format_type(column),
                    not_null: serial || primary_key || column.not_null,
                    has_default: serial || column.has_default,
                    primary_key,
                }
            })
            .collect();

        self.create_table(
            &schema_name,
            TableDefinition {
                name: statement.name.name.clone(),
                columns,
            },
        )
    }

    /// Find a table by qualified names
    pub fn find_table_by_name(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Option<&TableDefinition> {
        self.schemas
            .iter()
            .find(|schema| schema.name == schema_name)
            .and_then(|schema| schema.tables.iter().find(|table| table.name == table_name))
    }

    pub fn type_lookups(&self) -> usize {
        self.type_lookups.load(Ordering::SeqCst)
    }

    pub fn column_lookups(&self) -> usize {
        self.column_lookups.load(Ordering::SeqCst)
    }

    fn schema_mut(&mut self, schema_name: &str) -> Result<&mut SchemaDefinition, PackError> {
        self.schemas
            .iter_mut()
            .find(|v| v.name == schema_name)
            .ok_or_else(|| {
                PackError::new(
                    ErrorKind::CatalogLookupFailure,
                    format!("schema {} does not exist", schema_name),
                )
            })
    }

    fn find_type(&self, schema_name: &str, type_name: &str) -> Option<&TypeDefinition> {
        self.schemas
            .iter()
            .find(|schema| schema.name == schema_name)
            .and_then(|schema| schema.types.iter().find(|t| t.name == type_name))
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn lookup_type(
        &self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<Option<TypeRow>, PackError> {
        self.type_lookups.fetch_add(1, Ordering::SeqCst);
        debug!("type lookup: {:?}.{}", schema, type_name);

        let found = match schema {
            Some(schema) => self.find_type(schema, type_name),
            None => self
                .search_path
                .iter()
                .find_map(|schema| self.find_type(schema, type_name)),
        };

        Ok(found.map(|t| TypeRow {
            category: t.category,
            align: t.align,
        }))
    }

    fn lookup_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnRow>, PackError> {
        self.column_lookups.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .find_table_by_name(schema, table)
            .and_then(|table| table.columns.iter().find(|c| c.name == column))
            .map(|c| ColumnRow {
                formatted_type: c.formatted_type.clone(),
                not_null: c.not_null,
                has_default: c.has_default,
                primary_key: c.primary_key,
            }))
    }
}

/// Approximates `pg_catalog.format_type` for a declared column type.
fn format_type(column: &ParsedColumn) -> String {
    if let Some(QualifiedName {
        schema: None,
        name,
        quoted: false,
    }) = &column.custom_type
    {
        match name.as_str() {
            "smallserial" | "serial2" => return "smallint".to_string(),
            "serial" | "serial4" => return "integer".to_string(),
            "bigserial" | "serial8" => return "bigint".to_string(),
            _ => {}
        }
    }

    match &column.custom_type {
        Some(_) => column.data_type.clone(),
        None => column.data_type.to_lowercase(),
    }
}
