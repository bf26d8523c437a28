//! PolicyCalc - insurance formula engine
//!
//! This library extracts formulas from policy documents, holds them in a
//! versioned registry and applies them row by row to CSV/XLSX policy
//! tables, filling only cells that are empty or zero.
//!
//! # Features
//!
//! - Expression language with `+ - * / **`, constants and math functions
//! - Per-product variant overrides selected by a discriminator column
//! - Formula suggestion from text documents over a controlled vocabulary
//! - CSV, XLSX, XLS and ODS import; XLSX and CSV export
//!
//! # Example
//!
//! ```no_run
//! use policycalc::config::ProcessingConfig;
//! use policycalc::core::{process_file, FormulaRegistry};
//! use std::path::Path;
//!
//! let registry = FormulaRegistry::new();
//! let formulas = registry.load_file(Path::new("formulas.yaml"))?;
//!
//! let summary = process_file(Path::new("policies.csv"), &formulas, &ProcessingConfig::default())?;
//! println!("Filled {} values", summary.successful_calculations);
//! # Ok::<(), policycalc::error::CalcError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extract;
pub mod table;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types
pub use config::{OutputFormat, ProcessingConfig};
pub use error::{CalcError, CalcResult};
pub use types::{Cell, DataTable};
