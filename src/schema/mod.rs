//! Schema Module
//!
//! Column types, field values and the per-table metadata file.
//!
//! ## Responsibilities
//! - Describe a table: ordered typed columns and the primary key position
//! - Parse and coerce user literals into typed values
//! - Persist the schema (and the data file write cursor) in `.prof`

mod column;
mod value;
pub mod meta;

pub use column::{Column, ColumnDef, ColumnType, Schema};
pub use value::Value;
