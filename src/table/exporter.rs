//! Table exporter: DataTable → XLSX or CSV artifact

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::config::OutputFormat;
use crate::error::{CalcError, CalcResult};
use crate::types::{Cell, DataTable};

/// Prefix of every output artifact name
pub const ARTIFACT_PREFIX: &str = "processed_output";

pub struct TableExporter<'a> {
    table: &'a DataTable,
}

impl<'a> TableExporter<'a> {
    pub fn new(table: &'a DataTable) -> Self {
        Self { table }
    }

    pub fn export(&self, path: &Path, format: OutputFormat) -> CalcResult<()> {
        match format {
            OutputFormat::Xlsx => self.export_xlsx(path),
            OutputFormat::Csv => {
                let file = File::create(path)
                    .map_err(|e| CalcError::Export(format!("{}: {}", path.display(), e)))?;
                self.write_csv(file)
            }
        }
    }

    /// Write a single worksheet: header row, then data rows
    pub fn export_xlsx(&self, path: &Path) -> CalcResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name("Sheet1")
            .map_err(|e| CalcError::Export(format!("Failed to set worksheet name: {}", e)))?;

        for (col, header) in self.table.headers.iter().enumerate() {
            worksheet
                .write_string(0, sheet_col(col)?, header)
                .map_err(|e| CalcError::Export(format!("Failed to write header: {}", e)))?;
        }

        for (row_idx, row) in self.table.rows.iter().enumerate() {
            let sheet_row = u32::try_from(row_idx + 1).map_err(|_| {
                CalcError::Export(format!("Row {} is beyond the worksheet limit", row_idx + 1))
            })?;
            for (col, cell) in row.iter().enumerate() {
                write_cell(worksheet, sheet_row, sheet_col(col)?, cell)?;
            }
        }

        workbook
            .save(path)
            .map_err(|e| CalcError::Export(format!("Failed to save workbook: {}", e)))?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> CalcResult<()> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

        csv_writer.write_record(&self.table.headers)?;
        for row in &self.table.rows {
            csv_writer.write_record(row.iter().map(Cell::as_text))?;
        }

        csv_writer
            .flush()
            .map_err(|e| CalcError::Export(format!("Failed to write CSV: {}", e)))?;
        Ok(())
    }
}

fn sheet_col(col: usize) -> CalcResult<u16> {
    u16::try_from(col)
        .map_err(|_| CalcError::Export(format!("Column {} is beyond the worksheet limit", col + 1)))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> CalcResult<()> {
    let result = match cell {
        Cell::Empty => return Ok(()),
        Cell::Number(n) if !n.is_finite() => return Ok(()),
        Cell::Number(n) => worksheet.write_number(row, col, *n).map(|_| ()),
        Cell::Bool(b) => worksheet.write_boolean(row, col, *b).map(|_| ()),
        Cell::Text(s) => worksheet.write_string(row, col, s).map(|_| ()),
    };
    result.map_err(|e| CalcError::Export(format!("Failed to write cell ({}, {}): {}", row, col, e)))
}

/// Fresh artifact path: `<dir>/processed_output_<YYYYmmdd_HHMMSS>_<ms>.<ext>`.
///
/// Creates the directory. A random suffix is added if the name is taken.
pub fn artifact_path(output_dir: &Path, format: OutputFormat) -> CalcResult<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        CalcError::Export(format!("Cannot create {}: {}", output_dir.display(), e))
    })?;

    let now = Local::now();
    let stem = format!(
        "{}_{}_{:03}",
        ARTIFACT_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        now.timestamp_subsec_millis()
    );

    let mut path = output_dir.join(format!("{}.{}", stem, format.extension()));
    while path.exists() {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        path = output_dir.join(format!("{}_{}.{}", stem, &suffix[..6], format.extension()));
    }
    Ok(path)
}

/// Resolve a download request to an existing artifact in `output_dir`.
///
/// Only plain file names are accepted.
pub fn resolve_artifact(output_dir: &Path, filename: &str) -> CalcResult<PathBuf> {
    let plain = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != ".."
        && !filename.starts_with('.');
    if !plain {
        return Err(CalcError::Validation(format!(
            "Invalid file name '{}'",
            filename
        )));
    }

    let path = output_dir.join(filename);
    if !path.is_file() {
        return Err(CalcError::Import(format!("File not found: {}", filename)));
    }
    Ok(path)
}
