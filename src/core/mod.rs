//! Formula engine: expressions, registry, variants and row processing

pub mod canonical;
pub mod expression;
pub mod normalize;
pub mod processor;
pub mod registry;
pub mod summary;
pub mod variant;

pub use canonical::{CanonicalFormula, FormulaCanonicalizer};
pub use processor::{RowProcessor, RunStats};
pub use registry::{Formula, FormulaRecord, FormulaRegistry, FormulaSet};
pub use summary::{ProcessingSummary, RunStatus};
pub use variant::VariantResolver;

use std::path::Path;

use tracing::info;

use crate::config::ProcessingConfig;
use crate::error::CalcResult;
use crate::table::{artifact_path, TableExporter, TableImporter};
use crate::types::DataTable;

/// Apply a formula set to an in-memory table
pub fn process_table(
    table: &DataTable,
    formulas: &FormulaSet,
    config: &ProcessingConfig,
) -> (DataTable, ProcessingSummary) {
    let resolver = config.variant_resolver();
    let processor = RowProcessor::new(
        formulas,
        &resolver,
        &config.discriminator_column,
        config.round_decimals,
    );
    let (output, stats) = processor.process(table);
    let summary = ProcessingSummary::from_stats(
        stats,
        formulas.len(),
        formulas.version,
        config.max_reported_errors,
    );
    (output, summary)
}

/// Read a policy table, apply the formulas and write the output artifact.
///
/// Fails only for file-level problems (unsupported or unreadable input,
/// unwritable output). Row and formula failures end up in the summary.
pub fn process_file(
    input: &Path,
    formulas: &FormulaSet,
    config: &ProcessingConfig,
) -> CalcResult<ProcessingSummary> {
    let table = TableImporter::new(input).import()?;
    let (output, summary) = process_table(&table, formulas, config);

    let path = artifact_path(&config.output_dir, config.output_format)?;
    TableExporter::new(&output).export(&path, config.output_format)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(
        input = %input.display(),
        output = %path.display(),
        status = ?summary.status,
        "{}",
        summary.message
    );

    Ok(summary.with_output(filename, path.display().to_string()))
}
