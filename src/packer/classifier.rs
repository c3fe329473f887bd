use std::collections::HashMap;

use log::debug;
use regex::Regex;

use super::cache::{TypeAlignmentCache, TypeKey};
use crate::{
    catalog::{CatalogLookup, SYSTEM_SCHEMA},
    core::{AlignmentClass, PackError},
    sql::parser::parse_column_fragment,
};

/// Longest value, in bytes, that always fits a 1-byte varlena header.
const INLINE_LIMIT_BYTES: u64 = 126;
/// `float(p)` is `double precision` from this many binary digits on.
const DOUBLE_FLOAT_PRECISION: u64 = 25;

#[derive(Debug)]
enum ClassRule {
    Fixed(AlignmentClass),
    /// Bounded length `n`, in units of `1 / units_per_byte` bytes.
    InlineLimit { units_per_byte: u64 },
    FloatPrecision,
}

#[derive(Debug)]
struct TypeRule {
    pattern: Regex,
    class: ClassRule,
}

impl TypeRule {
    fn new(pattern: &str, class: ClassRule) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            class,
        }
    }

    fn apply(&self, type_name: &str) -> Option<AlignmentClass> {
        let captures = self.pattern.captures(type_name)?;
        let limit = captures
            .name("n")
            .and_then(|n| n.as_str().parse::<u64>().ok());

        let class = match self.class {
            ClassRule::Fixed(class) => class,
            ClassRule::InlineLimit { units_per_byte } => match limit {
                Some(n) if n <= INLINE_LIMIT_BYTES * units_per_byte => AlignmentClass::Char,
                _ => AlignmentClass::Varlena,
            },
            ClassRule::FloatPrecision => match limit {
                Some(p) if p < DOUBLE_FLOAT_PRECISION => AlignmentClass::Int,
                _ => AlignmentClass::Double,
            },
        };

        Some(class)
    }
}

lazy_static! {
    /// Built-in types, first match wins.
    static ref TYPE_RULES: Vec<TypeRule> = vec![
        TypeRule::new(
            r"^(bigint|int8|bigserial|serial8|double precision|float8|timestamptz|timestamp(\(\d+\))?( with(out)? time zone)?)$",
            ClassRule::Fixed(AlignmentClass::Double),
        ),
        TypeRule::new(
            r"^(integer|int|int4|serial|serial4|date|real|float4|timetz|time(\(\d+\))?( with(out)? time zone)?|(decimal|numeric)(\([\d\s,-]*\))?)$",
            ClassRule::Fixed(AlignmentClass::Int),
        ),
        // Binary values are expected to be long.
        TypeRule::new(r"^bytea$", ClassRule::Fixed(AlignmentClass::Int)),
        TypeRule::new(
            r"^(text|citext|character varying|varchar|bit varying|varbit|bit|bpchar)$",
            ClassRule::Fixed(AlignmentClass::Varlena),
        ),
        TypeRule::new(
            r"^(character varying|varchar|character|char|bpchar)\((?P<n>\d+)\)$",
            ClassRule::InlineLimit { units_per_byte: 1 },
        ),
        TypeRule::new(
            r"^(bit varying|varbit|bit)\((?P<n>\d+)\)$",
            ClassRule::InlineLimit { units_per_byte: 8 },
        ),
        TypeRule::new(r"^float(\((?P<n>\d+)\))?$", ClassRule::FloatPrecision),
        TypeRule::new(
            r"^(smallint|int2|smallserial|serial2|boolean|bool)$",
            ClassRule::Fixed(AlignmentClass::Short),
        ),
    ];

    static ref ARRAY_SUFFIX: Regex = Regex::new(r"(\s*\[\d*\])+$").unwrap();
    static ref QUALIFIED: Regex =
        Regex::new(r#"^("(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$]*)\.(.+)$"#).unwrap();
    static ref MODIFIER: Regex = Regex::new(r"\([^)]*\)").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// SQL spellings whose `pg_type.typname` differs.
    static ref TYPNAMES: HashMap<&'static str, &'static str> = [
        ("character varying", "varchar"),
        ("character", "bpchar"),
        ("bit varying", "varbit"),
        ("double precision", "float8"),
        ("real", "float4"),
        ("float", "float8"),
        ("integer", "int4"),
        ("int", "int4"),
        ("smallint", "int2"),
        ("bigint", "int8"),
        ("boolean", "bool"),
        ("decimal", "numeric"),
        ("timestamp without time zone", "timestamp"),
        ("timestamp with time zone", "timestamptz"),
        ("time without time zone", "time"),
        ("time with time zone", "timetz"),
    ]
    .into_iter()
    .collect();
}

/// A type reference with array suffix and schema qualifier split off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedType {
    pub schema: Option<String>,
    /// Bare name including any modifier, e.g. `character varying(20)`.
    pub name: String,
    pub quoted: bool,
}

impl NormalizedType {
    /// Normalizes `sql_type`. A qualifier written in the type wins over
    /// `schema`.
    pub fn new(sql_type: &str, schema: Option<&str>) -> Result<Self, PackError> {
        let trimmed = sql_type.trim();
        let element_type = ARRAY_SUFFIX.replace(trimmed, "");
        let element_type = element_type.trim();

        let fragment = format!("c {}", element_type);
        let parsed = parse_column_fragment(&fragment)?.and_then(|column| column.custom_type);

        let mut normalized = match parsed {
            Some(custom) => Self {
                schema: custom.schema,
                name: custom.name,
                quoted: custom.quoted,
            },
            None => Self::from_text(element_type),
        };
        if normalized.schema.is_none() {
            normalized.schema = schema.map(str::to_string);
        }

        Ok(normalized.canonicalize())
    }

    /// Fallback when the text is not a type the parser understands.
    fn from_text(text: &str) -> Self {
        let (schema, rest) = match QUALIFIED.captures(text) {
            Some(captures) => (Some(unquote(&captures[1])), captures[2].trim().to_string()),
            None => (None, text.to_string()),
        };

        let quoted = rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"');
        let name = if quoted {
            unquote(&rest)
        } else {
            WHITESPACE.replace_all(&rest, " ").to_lowercase()
        };

        Self {
            schema,
            name,
            quoted,
        }
    }

    /// Resolves the system spellings whose meaning depends on quoting: bare
    /// `char`/`character` is `character(1)` and bare `bit` is `bit(1)`, while
    /// the quoted catalog names `"char"` and `"bit"` are separate types.
    fn canonicalize(mut self) -> Self {
        if self.is_system() && !self.quoted {
            match self.name.as_str() {
                "char" | "character" => self.name = "character(1)".to_string(),
                "bit" => self.name = "bit(1)".to_string(),
                _ => {}
            }
        }
        self
    }

    fn is_system(&self) -> bool {
        self.schema.as_deref().map_or(true, |s| s == SYSTEM_SCHEMA)
    }

    pub fn key(&self) -> TypeKey {
        TypeKey {
            schema: self.schema.clone(),
            type_name: self.name.clone(),
        }
    }

    /// Matches the built-in rule table. `citext` lives in whatever schema
    /// the extension was installed into, so it matches under any qualifier.
    pub fn static_class(&self) -> Option<AlignmentClass> {
        if !self.is_system() && self.name != "citext" {
            return None;
        }

        TYPE_RULES.iter().find_map(|rule| rule.apply(&self.name))
    }

    /// The `pg_type.typname` to look up: modifier removed, SQL spelling
    /// translated.
    pub fn catalog_name(&self) -> String {
        if self.quoted {
            return self.name.clone();
        }

        let bare = MODIFIER.replace_all(&self.name, "");
        let bare = WHITESPACE.replace_all(bare.trim(), " ");
        if bare.starts_with("interval") {
            return "interval".to_string();
        }

        TYPNAMES
            .get(bare.as_ref())
            .map(|typname| typname.to_string())
            .unwrap_or_else(|| bare.to_string())
    }
}

fn unquote(ident: &str) -> String {
    match ident.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => ident.to_lowercase(),
    }
}

/// Classifies SQL types into alignment classes, consulting the catalog only
/// for types the rule table does not know.
pub struct TypeClassifier<'a> {
    catalog: &'a dyn CatalogLookup,
    cache: &'a TypeAlignmentCache,
}

impl<'a> TypeClassifier<'a> {
    pub fn new(catalog: &'a dyn CatalogLookup, cache: &'a TypeAlignmentCache) -> Self {
        Self { catalog, cache }
    }

    pub fn classify(
        &self,
        sql_type: &str,
        schema: Option<&str>,
    ) -> Result<AlignmentClass, PackError> {
        let normalized = NormalizedType::new(sql_type, schema)?;

        self.cache
            .get_or_resolve(normalized.key(), |_| self.resolve(&normalized))
    }

    fn resolve(&self, normalized: &NormalizedType) -> Result<AlignmentClass, PackError> {
        if let Some(class) = normalized.static_class() {
            return Ok(class);
        }

        let typname = normalized.catalog_name();
        debug!(
            "Looking up alignment of {:?}.{} in catalog",
            normalized.schema, typname
        );

        let row = self
            .catalog
            .lookup_type(&typname, normalized.schema.as_deref())?
            .ok_or_else(|| {
                PackError::type_not_found(&normalized.name, normalized.schema.as_deref())
            })?;

        if row.is_enum() {
            Ok(AlignmentClass::Int)
        } else {
            Ok(AlignmentClass::from_typalign(row.align))
        }
    }
}
