//! Statement outcomes

use std::fmt;

use crate::table::ResultSet;

/// Result of a successfully executed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// DDL statement completed
    Done,

    /// Rows inserted, updated or deleted
    Affected(usize),

    /// Rows selected
    Rows(ResultSet),
}

impl Outcome {
    /// Selected rows, if this is a select outcome
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Outcome::Affected(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => write!(f, "OK"),
            Outcome::Affected(n) => write!(f, "OK, {} row(s) affected", n),
            Outcome::Rows(rows) => write!(f, "{}\n{} row(s)", rows, rows.len()),
        }
    }
}
