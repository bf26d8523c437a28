//! CLI command handlers

pub mod commands;

pub use commands::{eval, extract, formulas, process, variables, SuggestMode};
