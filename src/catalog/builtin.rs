use super::defs::TypeDefinition;

lazy_static! {
    /// `(typname, typtype, typalign)` of the `pg_catalog` types a schema is
    /// likely to use.
    static ref BUILTIN_TYPES: Vec<(&'static str, char, char)> = vec![
        ("bool", 'b', 'c'),
        ("bytea", 'b', 'i'),
        ("char", 'b', 'c'),
        ("name", 'b', 'c'),
        ("int8", 'b', 'd'),
        ("int2", 'b', 's'),
        ("int4", 'b', 'i'),
        ("text", 'b', 'i'),
        ("oid", 'b', 'i'),
        ("json", 'b', 'i'),
        ("xml", 'b', 'i'),
        ("point", 'b', 'd'),
        ("lseg", 'b', 'd'),
        ("box", 'b', 'd'),
        ("polygon", 'b', 'd'),
        ("line", 'b', 'd'),
        ("circle", 'b', 'd'),
        ("float4", 'b', 'i'),
        ("float8", 'b', 'd'),
        ("money", 'b', 'd'),
        ("macaddr", 'b', 'i'),
        ("macaddr8", 'b', 'i'),
        ("inet", 'b', 'i'),
        ("cidr", 'b', 'i'),
        ("bpchar", 'b', 'i'),
        ("varchar", 'b', 'i'),
        ("date", 'b', 'i'),
        ("time", 'b', 'd'),
        ("timestamp", 'b', 'd'),
        ("timestamptz", 'b', 'd'),
        ("interval", 'b', 'd'),
        ("timetz", 'b', 'd'),
        ("bit", 'b', 'i'),
        ("varbit", 'b', 'i'),
        ("numeric", 'b', 'i'),
        ("uuid", 'b', 'c'),
        ("pg_lsn", 'b', 'd'),
        ("tsvector", 'b', 'i'),
        ("tsquery", 'b', 'i'),
        ("jsonb", 'b', 'i'),
        ("jsonpath", 'b', 'i'),
        ("int4range", 'r', 'i'),
        ("int8range", 'r', 'd'),
        ("numrange", 'r', 'i'),
        ("tsrange", 'r', 'd'),
        ("tstzrange", 'r', 'd'),
        ("daterange", 'r', 'i'),
    ];
}

pub fn builtin_types() -> Vec<TypeDefinition> {
    BUILTIN_TYPES
        .iter()
        .map(|(name, category, align)| TypeDefinition {
            name: name.to_string(),
            category: *category,
            align: *align,
        })
        .collect()
}
