//! Column definitions and the table schema

use std::fmt;

use crate::error::{LeafError, Result};

/// Type of a column (and therefore of a primary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Str,
}

impl ColumnType {
    /// Per-column type byte stored in the metadata file
    pub fn tag(self) -> u8 {
        match self {
            ColumnType::Int => 1,
            ColumnType::Str => 0,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ColumnType::Int),
            0 => Some(ColumnType::Str),
            _ => None,
        }
    }

    /// Key-type flag stored in the first word of the metadata file
    pub fn key_flag(self) -> i32 {
        match self {
            ColumnType::Int => 0,
            ColumnType::Str => 1,
        }
    }

    pub fn from_key_flag(flag: i32) -> Option<Self> {
        match flag {
            0 => Some(ColumnType::Int),
            1 => Some(ColumnType::Str),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "int"),
            ColumnType::Str => write!(f, "string"),
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = LeafError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" => Ok(ColumnType::Int),
            "string" | "str" => Ok(ColumnType::Str),
            other => Err(LeafError::InvalidSchema(format!(
                "unknown column type '{}'",
                other
            ))),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Column as requested by a create-table statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub primary: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Ordered column list plus the position of the primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    primary: usize,
}

impl Schema {
    /// Build a schema, validating names and the primary key position
    pub fn new(columns: Vec<Column>, primary: usize) -> Result<Self> {
        if columns.is_empty() {
            return Err(LeafError::InvalidSchema(
                "a table needs at least one column".to_string(),
            ));
        }
        if primary >= columns.len() {
            return Err(LeafError::InvalidSchema(format!(
                "primary key position {} out of range for {} columns",
                primary,
                columns.len()
            )));
        }

        for (i, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(LeafError::InvalidSchema("empty column name".to_string()));
            }
            if column.name.contains(' ') || column.name.contains('\0') {
                return Err(LeafError::InvalidSchema(format!(
                    "column name '{}' contains a space or NUL",
                    column.name
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(LeafError::InvalidSchema(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        Ok(Self { columns, primary })
    }

    /// Build a schema from create-table definitions
    ///
    /// At most one column may be primary; with none, column 0 is the key.
    pub fn from_defs(defs: &[ColumnDef]) -> Result<Self> {
        let primaries: Vec<usize> = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.primary)
            .map(|(i, _)| i)
            .collect();

        if primaries.len() > 1 {
            return Err(LeafError::InvalidSchema(format!(
                "{} primary keys declared, at most one allowed",
                primaries.len()
            )));
        }

        let columns = defs
            .iter()
            .map(|d| Column::new(d.name.clone(), d.ty))
            .collect();
        Self::new(columns, primaries.first().copied().unwrap_or(0))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn primary_column(&self) -> &Column {
        &self.columns[self.primary]
    }

    /// Type of the primary key
    pub fn key_type(&self) -> ColumnType {
        self.primary_column().ty
    }

    /// Resolve a column name to its position
    pub fn position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| LeafError::ColumnNotFound(name.to_string()))
    }
}
