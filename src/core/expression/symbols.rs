//! Row symbol table
//!
//! The only bindings an expression can see: the row's columns coerced to
//! numbers, the constants `pi` and `e`, and results computed earlier in the
//! same row. Functions live in a closed table and are never bound here.

use std::collections::HashMap;

use crate::core::normalize::normalize_name;
use crate::types::Cell;

/// Constants always present in a symbol table
pub const CONSTANTS: [(&str, f64); 2] = [("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// Name → value bindings for one row's evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    values: HashMap<String, f64>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only the constants
    pub fn new() -> Self {
        let mut table = Self {
            values: HashMap::new(),
        };
        table.bind_constants();
        table
    }

    /// Build the context for one row. Constants are bound after the columns
    /// and shadow a column with the same normalized name.
    pub fn from_row(headers: &[String], cells: &[Cell]) -> Self {
        let mut values = HashMap::with_capacity(headers.len() + CONSTANTS.len());
        for (header, cell) in headers.iter().zip(cells) {
            values.insert(normalize_name(header), cell.to_f64());
        }
        let mut table = Self { values };
        table.bind_constants();
        table
    }

    fn bind_constants(&mut self) {
        for (name, value) in CONSTANTS {
            self.values.insert(name.to_string(), value);
        }
    }

    /// Bind (or rebind) a value under the normalized form of `name`
    pub fn bind(&mut self, name: &str, value: f64) {
        self.values.insert(normalize_name(name), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
