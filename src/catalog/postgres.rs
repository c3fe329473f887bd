use log::{debug, error, info};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Client, NoTls};

use super::{CatalogLookup, ColumnRow, TypeRow};
use crate::core::PackError;

const TYPE_QUERY: &str = "
    SELECT typ.typtype::text, typ.typalign::text
    FROM pg_catalog.pg_type typ
    JOIN pg_catalog.pg_namespace nsp ON nsp.oid = typ.typnamespace
    WHERE typ.typname = $1
      AND ($2::text IS NULL OR nsp.nspname = $2::text)
    ORDER BY pg_catalog.pg_type_is_visible(typ.oid) DESC
    LIMIT 1";

const COLUMN_QUERY: &str = "
    SELECT
      pg_catalog.format_type(attr.atttypid, attr.atttypmod),
      attr.attnotnull,
      attr.atthasdef,
      EXISTS (
        SELECT 1
        FROM pg_catalog.pg_index idx
        WHERE idx.indisprimary
          AND attr.attnum = ANY(idx.indkey)
          AND idx.indrelid = attr.attrelid
      )
    FROM pg_catalog.pg_attribute attr
    JOIN pg_catalog.pg_class cls ON cls.oid = attr.attrelid
    JOIN pg_catalog.pg_namespace nsp ON nsp.oid = cls.relnamespace
    WHERE attr.attname = $1
      AND nsp.nspname = $2
      AND cls.relname = $3
      AND NOT attr.attisdropped";

/// Catalog backed by a live PostgreSQL connection. Every lookup blocks on a
/// private single-threaded runtime, which also drives the connection task.
pub struct PostgresCatalog {
    runtime: Runtime,
    client: Client,
}

impl PostgresCatalog {
    pub fn connect(url: &str) -> Result<Self, PackError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let (client, connection) = runtime.block_on(tokio_postgres::connect(url, NoTls))?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {}", e);
            }
        });
        info!("Connected to catalog database");

        Ok(Self { runtime, client })
    }
}

impl CatalogLookup for PostgresCatalog {
    fn lookup_type(
        &self,
        type_name: &str,
        schema: Option<&str>,
    ) -> Result<Option<TypeRow>, PackError> {
        debug!("pg_type lookup: {:?}.{}", schema, type_name);

        let row = self
            .runtime
            .block_on(self.client.query_opt(TYPE_QUERY, &[&type_name, &schema]))?;

        Ok(row.map(|row| {
            let category: String = row.get(0);
            let align: String = row.get(1);
            TypeRow {
                category: category.chars().next().unwrap_or_default(),
                align: align.chars().next().unwrap_or_default(),
            }
        }))
    }

    fn lookup_column(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnRow>, PackError> {
        let row = self
            .runtime
            .block_on(self.client.query_opt(COLUMN_QUERY, &[&column, &schema, &table]))?;

        Ok(row.map(|row| ColumnRow {
            formatted_type: row.get(0),
            not_null: row.get(1),
            has_default: row.get(2),
            primary_key: row.get(3),
        }))
    }
}
