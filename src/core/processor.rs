//! Row processor
//!
//! Applies a formula snapshot to every row of a policy table. Rows are
//! processed in input order and formulas in registration order; a result is
//! visible to the formulas after it in the same row. Existing values are
//! never overwritten: a formula only fills cells that are missing.
//!
//! Nothing in here fails as a whole. Unknown cover codes and failing
//! formulas are recorded as messages and the run carries on.

use tracing::{debug, info, warn};

use crate::core::expression::functions::round_half_even;
use crate::core::expression::SymbolTable;
use crate::core::registry::{Formula, FormulaSet};
use crate::core::variant::VariantResolver;
use crate::types::{Cell, DataTable};
use crate::vocabulary;

/// Counters and messages of one processing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total_rows: usize,
    /// Rows whose variant resolved (and were therefore processed)
    pub processed_rows: usize,
    pub successful_calculations: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Columns appended to the output, in creation order
    pub new_columns: Vec<String>,
}

/// Spreadsheet row number of a data row: 1-based plus the header row
pub fn display_row(index: usize) -> usize {
    index + 2
}

pub struct RowProcessor<'a> {
    formulas: &'a FormulaSet,
    variants: &'a VariantResolver,
    discriminator_column: &'a str,
    round_decimals: u32,
}

impl<'a> RowProcessor<'a> {
    pub fn new(
        formulas: &'a FormulaSet,
        variants: &'a VariantResolver,
        discriminator_column: &'a str,
        round_decimals: u32,
    ) -> Self {
        Self {
            formulas,
            variants,
            discriminator_column,
            round_decimals,
        }
    }

    /// Process a whole table, returning the augmented copy and the run stats
    pub fn process(&self, input: &DataTable) -> (DataTable, RunStats) {
        let mut output = input.clone();
        let mut stats = RunStats {
            total_rows: input.row_count(),
            ..Default::default()
        };

        let code_col = input.find_column(self.discriminator_column);
        if code_col.is_none() {
            warn!(
                column = self.discriminator_column,
                "Discriminator column not found; no row will resolve a variant"
            );
        }

        info!(
            rows = input.row_count(),
            formulas = self.formulas.len(),
            version = self.formulas.version,
            "Processing table"
        );

        for (index, row) in input.rows.iter().enumerate() {
            let code = code_col
                .and_then(|c| row.get(c))
                .map(Cell::as_text)
                .unwrap_or_default();

            let Some(variant) = self.variants.resolve(&code) else {
                let message = format!(
                    "Row {}: Unknown {} '{}'",
                    display_row(index),
                    self.discriminator_column,
                    code.trim()
                );
                warn!("{}", message);
                stats.errors.push(message);
                continue;
            };

            let mut symbols = SymbolTable::from_row(&input.headers, row);
            for formula in self.formulas.formulas() {
                self.apply_formula(formula, variant, index, &mut symbols, &mut output, &mut stats);
            }
            stats.processed_rows += 1;
        }

        info!(
            processed = stats.processed_rows,
            successful = stats.successful_calculations,
            errors = stats.errors.len(),
            "Table processed"
        );

        (output, stats)
    }

    fn apply_formula(
        &self,
        formula: &Formula,
        variant: &str,
        index: usize,
        symbols: &mut SymbolTable,
        output: &mut DataTable,
        stats: &mut RunStats,
    ) {
        let row_number = display_row(index);
        let expression = formula.expression_for(Some(variant));

        let evaluation = match expression.evaluate(symbols) {
            Ok(Some(evaluation)) => evaluation,
            Ok(None) => return,
            Err(e) => {
                stats.errors.push(format!(
                    "Row {}: Could not evaluate formula '{}' with expression '{}': {}",
                    row_number,
                    formula.name(),
                    expression.source(),
                    e
                ));
                return;
            }
        };

        for name in &evaluation.missing {
            let mut message = format!(
                "Row {}, formula '{}': variable '{}' not found, using 0",
                row_number,
                formula.name(),
                name
            );
            if let Some(description) = vocabulary::describe(name) {
                message.push_str(&format!(" ({})", description));
            }
            stats.warnings.push(message);
        }

        let col = match output.find_column(formula.key()) {
            Some(col) => col,
            None => {
                stats.new_columns.push(formula.key().to_string());
                output.add_column(formula.key())
            }
        };

        let missing = output
            .cell(index, col)
            .map_or(true, Cell::is_missing);
        if missing {
            let rounded = round_half_even(evaluation.value, self.round_decimals as i32);
            output.set_cell(index, col, Cell::Number(rounded));
            debug!(row = row_number, formula = formula.name(), value = rounded, "Filled value");
        } else {
            debug!(row = row_number, formula = formula.name(), "Existing value kept");
        }

        symbols.bind(formula.key(), evaluation.value);
        stats.successful_calculations += 1;
    }
}
