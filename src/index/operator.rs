//! Comparison operators for range scans and predicates

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{LeafError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
}

impl Operator {
    /// Whether `candidate <op> target` holds, given `candidate.cmp(target)`
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    /// All operators, two-character ones first (for prefix matching)
    pub const ALL: [Operator; 5] = [
        Operator::Ge,
        Operator::Le,
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
    ];
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = LeafError;

    fn from_str(s: &str) -> Result<Self> {
        Operator::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| LeafError::InvalidArgument(format!("unknown operator '{}'", s)))
    }
}
