use serde::{Deserialize, Serialize};

use crate::core::normalize::same_name;

//==============================================================================
// Cells
//==============================================================================

/// A single table cell as read from CSV or a spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Detect the type of a raw text field (CSV input)
    pub fn detect(field: &str) -> Self {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Cell::Empty;
        }

        match trimmed.to_lowercase().as_str() {
            "true" => return Cell::Bool(true),
            "false" => return Cell::Bool(false),
            _ => {}
        }

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(field.to_string()),
        }
    }

    /// Coerce to a number for a row's symbol table.
    ///
    /// Blank, null and non-numeric cells become 0.0.
    pub fn to_f64(&self) -> f64 {
        match self {
            Cell::Empty => 0.0,
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Number(_) => 0.0,
            Cell::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => 0.0,
            },
        }
    }

    /// A missing cell may be filled by a formula: empty, blank text or zero
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => *n == 0.0 || n.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    /// Render for text output (CSV, terminal)
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

//==============================================================================
// Tables
//==============================================================================

/// A rectangular policy table: one header row plus data rows.
///
/// Rows are always padded to the header width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Index of the column whose header normalizes to the same key as `name`
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| same_name(h, name))
    }

    /// Append a column, filling existing rows with empty cells
    pub fn add_column(&mut self, name: impl Into<String>) -> usize {
        self.headers.push(name.into());
        for row in &mut self.rows {
            row.push(Cell::Empty);
        }
        self.headers.len() - 1
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Values of the named column (matched by normalized name)
    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let col = self.find_column(name)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }
}
