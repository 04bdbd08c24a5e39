//! Row predicates

use std::str::FromStr;

use crate::error::{LeafError, Result};
use crate::index::Operator;
use crate::schema::{Schema, Value};

/// `column <op> literal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Resolve the column against a schema and coerce the literal to its type
    pub fn bind(&self, schema: &Schema) -> Result<Bound> {
        let position = schema.position(&self.column)?;
        let value = self.value.clone().coerce(schema.columns()[position].ty)?;
        Ok(Bound {
            position,
            op: self.op,
            value,
        })
    }
}

impl FromStr for Predicate {
    type Err = LeafError;

    /// Parse `column<op>literal`, e.g. `id>=2` or `name = "bob"`
    fn from_str(s: &str) -> Result<Self> {
        let at = s
            .find(|c: char| matches!(c, '<' | '>' | '='))
            .ok_or_else(|| LeafError::InvalidArgument(format!("no operator in '{}'", s)))?;
        let (column, rest) = s.split_at(at);

        let op = Operator::ALL
            .into_iter()
            .find(|op| rest.starts_with(op.symbol()))
            .ok_or_else(|| LeafError::InvalidArgument(format!("no operator in '{}'", s)))?;
        let literal = &rest[op.symbol().len()..];

        let column = column.trim();
        if column.is_empty() {
            return Err(LeafError::InvalidArgument(format!("no column in '{}'", s)));
        }

        Ok(Self {
            column: column.to_string(),
            op,
            value: Value::parse_literal(literal),
        })
    }
}

/// A predicate resolved against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub position: usize,
    pub op: Operator,
    pub value: Value,
}

impl Bound {
    /// Compare the row field against the literal as text
    ///
    /// Ints compare by their decimal form, so `10 < 9` here even though the
    /// index orders int keys numerically.
    pub fn matches(&self, row: &[Value]) -> bool {
        row.get(self.position)
            .is_some_and(|field| self.op.matches(field.compare_text(&self.value)))
    }
}
