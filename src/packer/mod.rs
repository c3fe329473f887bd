//! Column packing: type classification, column ordering, and the two
//! rewriters that apply the order.

pub mod cache;
pub mod classifier;
pub mod dump;
pub mod order;
pub mod table;

pub use cache::{TypeAlignmentCache, TypeKey};
pub use classifier::{NormalizedType, TypeClassifier};
pub use dump::DumpRewriter;
pub use order::{order_key, sort_columns, OrderKey};
pub use table::TableReorderer;
