//! Query results

use std::fmt;

/// Projected rows of a select, rendered as strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Projected column names
    pub columns: Vec<String>,
    /// Display width per column: max of the name and every value
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let widths = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        Self {
            columns,
            widths,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule: String = self
            .widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+";

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (cell, width) in cells.iter().zip(&self.widths) {
                write!(f, "| {:<width$} ", cell, width = width)?;
            }
            writeln!(f, "|")
        };

        writeln!(f, "{}", rule)?;
        line(f, &self.columns)?;
        writeln!(f, "{}", rule)?;
        for row in &self.rows {
            line(f, row)?;
        }
        write!(f, "{}", rule)
    }
}
