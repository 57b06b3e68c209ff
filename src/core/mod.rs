pub mod error;
pub mod types;
pub mod value;

pub use error::{MetaError, Result};
pub use types::{Column, DataType, IndexDef, Record, TableSchema};
pub use value::Value;
