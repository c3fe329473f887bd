use std::cmp::Reverse;

use super::classifier::TypeClassifier;
use crate::core::{AlignmentClass, ColumnDescriptor, PackError};

/// Sort key of a column; ascending keys give the packed column order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    alignment: Reverse<AlignmentClass>,
    primary_key_rank: u8,
    nullable_rank: u8,
    // NOT NULL columns with a default stay in the NOT NULL group.
    default_rank: u8,
    name: String,
}

impl OrderKey {
    pub fn alignment(&self) -> AlignmentClass {
        self.alignment.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub fn order_key(column: &ColumnDescriptor, alignment: AlignmentClass) -> OrderKey {
    OrderKey {
        alignment: Reverse(alignment),
        primary_key_rank: if column.is_primary_key { 0 } else { 1 },
        nullable_rank: if column.is_nullable { 1 } else { 0 },
        default_rank: if column.has_default && column.is_nullable {
            0
        } else {
            1
        },
        name: column.name.clone(),
    }
}

/// Classifies every column and returns them in packed order.
pub fn sort_columns(
    classifier: &TypeClassifier,
    columns: Vec<ColumnDescriptor>,
) -> Result<Vec<ColumnDescriptor>, PackError> {
    let mut keyed = columns
        .into_iter()
        .map(|column| {
            let alignment =
                classifier.classify(&column.raw_type, column.schema_qualifier.as_deref())?;
            Ok((order_key(&column, alignment), column))
        })
        .collect::<Result<Vec<_>, PackError>>()?;

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(keyed.into_iter().map(|(_, column)| column).collect())
}
