use std::{error::Error, fmt::Display};

#[derive(Clone, Debug)]
pub struct PackError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The catalog has no entry for a type the static rules do not cover.
    TypeNotFound {
        type_name: String,
        schema: Option<String>,
    },
    /// A fragment that must hold exactly one column produced this many.
    AmbiguousColumnCount(usize),
    /// The catalog collaborator itself failed.
    CatalogLookupFailure,
    /// A dumped column has no counterpart in the connected catalog.
    ColumnNotFound,
    ParseError,
    IoError,
}

impl Error for PackError {}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::TypeNotFound { .. } => write!(f, "Type Not Found"),
            ErrorKind::AmbiguousColumnCount(_) => write!(f, "Ambiguous Column Count"),
            ErrorKind::CatalogLookupFailure => write!(f, "Catalog Lookup Failure"),
            ErrorKind::ColumnNotFound => write!(f, "Column Not Found"),
            ErrorKind::ParseError => write!(f, "Parse Error"),
            ErrorKind::IoError => write!(f, "IO Error"),
        }
    }
}

impl Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl PackError {
    pub fn new(kind: ErrorKind, message: impl AsRef<str>) -> Self {
        Self {
            kind,
            message: message.as_ref().to_string(),
        }
    }

    pub fn type_not_found(type_name: &str, schema: Option<&str>) -> Self {
        let qualified = match schema {
            Some(schema) => format!("{}.{}", schema, type_name),
            None => type_name.to_string(),
        };
        Self::new(
            ErrorKind::TypeNotFound {
                type_name: type_name.to_string(),
                schema: schema.map(str::to_string),
            },
            format!("no catalog entry for type {}", qualified),
        )
    }

    pub fn ambiguous_column_count(count: usize, fragment: &str) -> Self {
        Self::new(
            ErrorKind::AmbiguousColumnCount(count),
            format!("expected exactly one column in {:?}, found {}", fragment, count),
        )
    }
}

impl From<std::io::Error> for PackError {
    fn from(e: std::io::Error) -> Self {
        PackError::new(ErrorKind::IoError, e.to_string())
    }
}

impl From<tokio_postgres::Error> for PackError {
    fn from(e: tokio_postgres::Error) -> Self {
        PackError::new(ErrorKind::CatalogLookupFailure, e.to_string())
    }
}
