//! Statement definitions
//!
//! Structured requests handed to the engine by a front end (the CLI, or a
//! parser of a textual query language).

use crate::schema::{ColumnDef, Value};
use crate::table::Predicate;

/// Statement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    CreateDatabase,
    DropDatabase,
    UseDatabase,
    CreateTable,
    Insert,
    Select,
    Update,
    Delete,
    DropTable,
}

/// A parsed statement
///
/// Table statements name their database explicitly or fall back to the
/// database selected with `UseDatabase`.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateDatabase { name: String },

    DropDatabase { name: String },

    /// Select the default database for later table statements
    UseDatabase { name: String },

    CreateTable {
        database: Option<String>,
        table: String,
        columns: Vec<ColumnDef>,
    },

    /// Insert a row (or overwrite the row with the same primary key)
    Insert {
        database: Option<String>,
        table: String,
        values: Vec<Value>,
    },

    /// Select `columns` (empty or `*` for all) of rows matching every condition
    Select {
        database: Option<String>,
        table: String,
        columns: Vec<String>,
        conditions: Vec<Predicate>,
    },

    /// Set one column on rows matching every condition
    Update {
        database: Option<String>,
        table: String,
        column: String,
        value: Value,
        conditions: Vec<Predicate>,
    },

    /// Delete rows matching every condition
    Delete {
        database: Option<String>,
        table: String,
        conditions: Vec<Predicate>,
    },

    DropTable {
        database: Option<String>,
        table: String,
    },
}

impl Statement {
    /// Get the statement type
    pub fn statement_type(&self) -> StatementType {
        match self {
            Statement::CreateDatabase { .. } => StatementType::CreateDatabase,
            Statement::DropDatabase { .. } => StatementType::DropDatabase,
            Statement::UseDatabase { .. } => StatementType::UseDatabase,
            Statement::CreateTable { .. } => StatementType::CreateTable,
            Statement::Insert { .. } => StatementType::Insert,
            Statement::Select { .. } => StatementType::Select,
            Statement::Update { .. } => StatementType::Update,
            Statement::Delete { .. } => StatementType::Delete,
            Statement::DropTable { .. } => StatementType::DropTable,
        }
    }
}
