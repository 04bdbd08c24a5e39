//! Statement Module
//!
//! The request/response surface of the engine.
//!
//! ### Statements
//! - Database: CREATE / DROP / USE
//! - Table:    CREATE TABLE / DROP TABLE
//! - Rows:     INSERT / SELECT / UPDATE / DELETE with `column <op> literal`
//!   conditions (`>`, `<`, `=`, `>=`, `<=`)
//!
//! ### Outcomes
//! - Done:     DDL completed
//! - Affected: row count of a write
//! - Rows:     projected result set of a select

mod command;
mod response;

pub use command::{Statement, StatementType};
pub use response::Outcome;
