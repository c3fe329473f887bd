pub mod column;
pub mod error;
pub mod types;

pub use column::*;
pub use error::*;
pub use types::*;
