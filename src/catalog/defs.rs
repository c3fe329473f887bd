#[derive(Clone, Debug)]
pub struct ColumnDefinition {
    pub name: String,
    /// Type as `pg_catalog.format_type` would print it.
    pub formatted_type: String,
    pub not_null: bool,
    pub has_default: bool,
    pub primary_key: bool,
}

#[derive(Clone, Debug)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

/// A `pg_type` entry reduced to what column ordering needs.
#[derive(Clone, Debug)]
pub struct TypeDefinition {
    pub name: String,
    /// `typtype`: `b` base, `e` enum, `d` domain, `c` composite, ...
    pub category: char,
    /// `typalign`: `c`, `s`, `i` or `d`.
    pub align: char,
}

#[derive(Clone, Debug)]
pub struct SchemaDefinition {
    pub name: String,
    pub tables: Vec<TableDefinition>,
    pub types: Vec<TypeDefinition>,
}
