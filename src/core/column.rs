/// One column of a table being reordered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub raw_type: String,
    pub schema_qualifier: Option<String>,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub has_default: bool,
}

const SERIAL_TYPES: [&str; 6] = [
    "smallserial",
    "serial2",
    "serial",
    "serial4",
    "bigserial",
    "serial8",
];

impl ColumnDescriptor {
    /// Serial columns are always NOT NULL, whatever the declaration says.
    pub fn new(
        name: impl Into<String>,
        raw_type: impl Into<String>,
        schema_qualifier: Option<String>,
        is_primary_key: bool,
        is_nullable: bool,
        has_default: bool,
    ) -> Self {
        let raw_type = raw_type.into();
        let is_nullable = is_nullable && !is_serial_type(&raw_type);

        Self {
            name: name.into(),
            raw_type,
            schema_qualifier,
            is_primary_key,
            is_nullable,
            has_default,
        }
    }
}

pub fn is_serial_type(raw_type: &str) -> bool {
    let lowered = raw_type.trim().to_lowercase();
    let bare = lowered.strip_prefix("pg_catalog.").unwrap_or(&lowered);
    SERIAL_TYPES.contains(&bare)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_columns_are_not_nullable() {
        let col = ColumnDescriptor::new("id", "BIGSERIAL", None, false, true, false);
        assert!(!col.is_nullable);

        let col = ColumnDescriptor::new("n", "pg_catalog.serial4", None, false, true, false);
        assert!(!col.is_nullable);

        let col = ColumnDescriptor::new("n", "integer", None, false, true, false);
        assert!(col.is_nullable);
    }
}
