use regex::Regex;
use sqlparser::{
    ast::{ColumnDef, ColumnOption, DataType, Ident, ObjectName, Statement, TableConstraint},
    dialect::PostgreSqlDialect,
    parser::Parser,
    tokenizer::{Token, Tokenizer, Whitespace, Word},
};

use crate::core::{ErrorKind, PackError};

lazy_static! {
    static ref TABLE_HEAD: Regex = Regex::new(
        r"(?is)^\s*CREATE\s+(?:(?:GLOBAL\s+|LOCAL\s+)?(?:TEMPORARY|TEMP)\s+|UNLOGGED\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?P<name>.+?)\s*$"
    )
    .unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Leading words of table elements that are not columns.
const NON_COLUMN_WORDS: [&str; 7] = [
    "CONSTRAINT",
    "CHECK",
    "PRIMARY",
    "UNIQUE",
    "FOREIGN",
    "EXCLUDE",
    "LIKE",
];

/// Words that end the type of a column definition.
const COLUMN_OPTION_WORDS: [&str; 11] = [
    "COLLATE",
    "COMPRESSION",
    "CONSTRAINT",
    "NOT",
    "NULL",
    "DEFAULT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "GENERATED",
];

/// Parse SQL string into AST
pub fn parse_sql(sql_text: &str) -> Result<Statement, PackError> {
    let parser = Parser::new(&PostgreSqlDialect {});

    let statement = parser
        .try_with_sql(sql_text)
        .and_then(|mut parser| parser.parse_statement())
        .map_err(|e| PackError::new(ErrorKind::ParseError, e.to_string()))?;

    Ok(statement)
}

/// A possibly schema-qualified name with identifier quoting resolved:
/// unquoted parts are folded to lower case, quoted parts are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
    /// Whether the last part was written as a quoted identifier.
    pub quoted: bool,
}

impl QualifiedName {
    fn from_object_name(object_name: &ObjectName) -> Option<Self> {
        let ObjectName(parts) = object_name;
        let (last, rest) = parts.split_last()?;

        Some(Self {
            schema: rest.last().map(ident_value),
            name: ident_value(last),
            quoted: last.quote_style.is_some(),
        })
    }
}

/// One column definition pulled out of a fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedColumn {
    /// Column name with quoting resolved.
    pub name: String,
    /// Declared type, modifiers included, e.g. `bit varying(5)`.
    pub data_type: String,
    /// Set when the grammar parsed the type as a user-defined one, e.g.
    /// `public.mood` or `"My Schema"."my type"(3)`. The modifier, if any, is
    /// appended to the name.
    pub custom_type: Option<QualifiedName>,
    pub not_null: bool,
    pub has_default: bool,
    /// Declared `PRIMARY KEY` on the column itself.
    pub primary_key: bool,
}

/// Table-level clauses of the statement a fragment was parsed from.
#[derive(Clone, Debug, Default)]
pub struct ParsedFragment {
    pub columns: Vec<ParsedColumn>,
    pub constraints: Vec<TableConstraint>,
}

/// A `CREATE TABLE` statement cut into its table elements. Element text is
/// kept as written so the statement can be put back together in another
/// order.
#[derive(Clone, Debug)]
pub struct TableStatement {
    pub name: QualifiedName,
    /// Everything up to and including the opening parenthesis.
    pub head: String,
    pub elements: Vec<TableElement>,
    /// The closing parenthesis and everything after it.
    pub tail: String,
}

#[derive(Clone, Debug)]
pub struct TableElement {
    pub text: String,
    /// Set when the element defines a column.
    pub column: Option<ParsedColumn>,
}

impl TableStatement {
    /// Columns in the primary key, whether declared on the column or as a
    /// table constraint.
    pub fn primary_key_columns(&self) -> Vec<String> {
        self.elements
            .iter()
            .flat_map(|element| match &element.column {
                Some(column) if column.primary_key => vec![column.name.clone()],
                Some(_) => vec![],
                None => parse_table_elements(&element.text)
                    .map(|fragment| primary_key_of(&fragment.constraints))
                    .unwrap_or_default(),
            })
            .collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ParsedColumn> {
        self.elements.iter().filter_map(|element| element.column.as_ref())
    }
}

pub fn ident_value(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}

/// Parses the body of a `CREATE TABLE` statement, i.e. whatever would appear
/// between its parentheses: column definitions, table constraints, or nothing.
/// Returns `None` when the text does not parse.
pub fn parse_table_elements(fragment: &str) -> Option<ParsedFragment> {
    // Newlines keep a trailing `--` comment from swallowing the parenthesis.
    let sql = format!("CREATE TABLE t (\n{}\n)", fragment);

    match parse_sql(&sql).ok()? {
        Statement::CreateTable {
            columns,
            constraints,
            ..
        } => Some(ParsedFragment {
            columns: columns.into_iter().map(ParsedColumn::from).collect(),
            constraints,
        }),
        _ => None,
    }
}

/// Parses one column-definition fragment such as `"select" public.mood[] NOT NULL`.
///
/// `Ok(None)` covers fragments that parse to something other than a column
/// (constraints, comments, blank text) and text that is not a table element
/// at all. A fragment holding more than one column is an error.
///
/// Column definitions the grammar rejects, like `bits bit varying(5)` or
/// generated columns, are still recognized: see [`scan_column_fragment`].
pub fn parse_column_fragment(fragment: &str) -> Result<Option<ParsedColumn>, PackError> {
    let Some(parsed) = parse_table_elements(fragment) else {
        return scan_column_fragment(fragment);
    };

    let mut columns = parsed.columns;
    match columns.len() {
        0 => Ok(None),
        1 => Ok(columns.pop()),
        n => Err(PackError::ambiguous_column_count(n, fragment)),
    }
}

/// Reads a column definition token by token. Anything that does not start
/// with a constraint keyword is a column: the first word is its name, and its
/// type runs up to the first column option keyword.
fn scan_column_fragment(fragment: &str) -> Result<Option<ParsedColumn>, PackError> {
    let Ok(tokens) = tokenize(fragment) else {
        return Ok(None);
    };
    let mut tokens = tokens
        .into_iter()
        .map(|(token, _)| token)
        .filter(|token| !is_comment(token))
        .skip_while(is_blank);

    let name = match tokens.next() {
        Some(Token::Word(word)) => word,
        _ => return Ok(None),
    };
    if bare_word(&name).map_or(false, |w| NON_COLUMN_WORDS.contains(&w.as_str())) {
        return Ok(None);
    }
    let name = ident_value(&Ident {
        value: name.value,
        quote_style: name.quote_style,
    });

    let mut data_type = String::new();
    let mut options = vec![];
    let mut depth = 0usize;
    let mut pieces = 1;
    for token in tokens {
        match &token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => pieces += 1,
            Token::Word(word) if depth == 0 => {
                if let Some(word) = bare_word(word) {
                    if !options.is_empty() || COLUMN_OPTION_WORDS.contains(&word.as_str()) {
                        options.push(word);
                        continue;
                    }
                }
            }
            _ => {}
        }
        if options.is_empty() {
            data_type.push_str(&token.to_string());
        }
    }

    if pieces > 1 {
        return Err(PackError::ambiguous_column_count(pieces, fragment));
    }
    let data_type = WHITESPACE.replace_all(data_type.trim(), " ").to_string();
    if data_type.is_empty() {
        return Ok(None);
    }

    let follows = |first: &str, second: &str| {
        options
            .windows(2)
            .any(|pair| pair[0] == first && pair[1] == second)
    };
    let generated = options.iter().any(|w| w == "GENERATED");
    let primary_key = follows("PRIMARY", "KEY");

    Ok(Some(ParsedColumn {
        name,
        data_type,
        custom_type: None,
        // Identity columns are implicitly NOT NULL.
        not_null: primary_key
            || follows("NOT", "NULL")
            || (generated && options.iter().any(|w| w == "IDENTITY")),
        has_default: generated || options.iter().any(|w| w == "DEFAULT"),
        primary_key,
    }))
}

/// Cuts a `CREATE TABLE` statement into its table elements. The statement
/// only has to be tokenizable: elements the grammar cannot parse are kept
/// and read by [`parse_column_fragment`].
pub fn parse_create_table(sql: &str) -> Result<TableStatement, PackError> {
    let tokens = tokenize(sql)?;

    let open = tokens
        .iter()
        .find(|(token, _)| *token == Token::LParen)
        .map(|(_, at)| *at)
        .ok_or_else(|| PackError::new(ErrorKind::ParseError, "expected a CREATE TABLE statement"))?;

    let name = TABLE_HEAD
        .captures(&sql[..open])
        .ok_or_else(|| PackError::new(ErrorKind::ParseError, "expected a CREATE TABLE statement"))?
        .name("name")
        .map(|name| name.as_str())
        .unwrap_or_default();
    let name = parse_qualified_name(name)?;

    let mut depth = 0usize;
    let mut close = None;
    let mut bounds = vec![open + 1];
    for (token, at) in tokens.iter().filter(|(_, at)| *at > open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => {
                close = Some(*at);
                break;
            }
            Token::RParen => depth -= 1,
            Token::Comma if depth == 0 => {
                bounds.push(*at);
                bounds.push(at + 1);
            }
            _ => {}
        }
    }
    let close = close.ok_or_else(|| {
        PackError::new(ErrorKind::ParseError, "table element list is not closed")
    })?;
    bounds.push(close);

    let elements = bounds
        .chunks(2)
        .map(|range| sql[range[0]..range[1]].trim())
        .filter(|text| !text.is_empty())
        .map(|text| {
            Ok(TableElement {
                text: text.to_string(),
                column: parse_column_fragment(text)?,
            })
        })
        .collect::<Result<Vec<_>, PackError>>()?;

    Ok(TableStatement {
        name,
        head: sql[..=open].to_string(),
        elements,
        tail: sql[close..].to_string(),
    })
}

/// Splits a table name like `public."Order Items"` into schema and name.
pub fn parse_qualified_name(name: &str) -> Result<QualifiedName, PackError> {
    let sql = format!("CREATE TABLE {} (x integer)", name);

    match parse_sql(&sql)? {
        Statement::CreateTable { name, .. } => QualifiedName::from_object_name(&name)
            .ok_or_else(|| PackError::new(ErrorKind::ParseError, "empty table name")),
        _ => Err(PackError::new(
            ErrorKind::ParseError,
            format!("invalid table name: {}", name),
        )),
    }
}

fn primary_key_of(constraints: &[TableConstraint]) -> Vec<String> {
    constraints
        .iter()
        .filter_map(|constraint| match constraint {
            TableConstraint::Unique {
                columns,
                is_primary: true,
                ..
            } => Some(columns.iter().map(ident_value)),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Tokens of `sql`, whitespace included, with the byte offset each starts at.
fn tokenize(sql: &str) -> Result<Vec<(Token, usize)>, PackError> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(|e| PackError::new(ErrorKind::ParseError, e.to_string()))?;

    let line_starts = std::iter::once(0)
        .chain(sql.match_indices('\n').map(|(at, _)| at + 1))
        .collect::<Vec<_>>();
    // Locations are 1-based lines and 1-based character columns.
    let offset = |line: u64, column: u64| {
        let start = line_starts
            .get((line as usize).saturating_sub(1))
            .copied()
            .unwrap_or(sql.len());
        sql[start..]
            .char_indices()
            .nth((column as usize).saturating_sub(1))
            .map_or(sql.len(), |(at, _)| start + at)
    };

    Ok(tokens
        .into_iter()
        .map(|t| {
            let at = offset(t.location.line, t.location.column);
            (t.token, at)
        })
        .collect())
}

fn bare_word(word: &Word) -> Option<String> {
    match word.quote_style {
        Some(_) => None,
        None => Some(word.value.to_uppercase()),
    }
}

fn is_comment(token: &Token) -> bool {
    matches!(
        token,
        Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
    )
}

fn is_blank(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_))
}

impl From<ColumnDef> for ParsedColumn {
    fn from(def: ColumnDef) -> Self {
        let custom_type = match &def.data_type {
            DataType::Custom(type_name, modifiers) => {
                QualifiedName::from_object_name(type_name).map(|mut qualified| {
                    if !modifiers.is_empty() {
                        qualified.name = format!("{}({})", qualified.name, modifiers.join(","));
                    }
                    qualified
                })
            }
            _ => None,
        };
        let has_option = |wanted: fn(&ColumnOption) -> bool| {
            def.options.iter().any(|opt| wanted(&opt.option))
        };
        let primary_key = has_option(|opt| matches!(opt, ColumnOption::Unique { is_primary: true }));

        ParsedColumn {
            name: ident_value(&def.name),
            data_type: def.data_type.to_string(),
            custom_type,
            not_null: primary_key || has_option(|opt| matches!(opt, ColumnOption::NotNull)),
            has_default: has_option(|opt| matches!(opt, ColumnOption::Default(_))),
            primary_key,
        }
    }
}
