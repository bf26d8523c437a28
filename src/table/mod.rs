//! Policy table I/O
//!
//! - `importer`: CSV → DataTable, XLSX/XLS/ODS → DataTable (first sheet)
//! - `exporter`: DataTable → XLSX or CSV artifact

pub mod exporter;
pub mod importer;

pub use exporter::{artifact_path, resolve_artifact, TableExporter};
pub use importer::TableImporter;

use std::path::Path;

use crate::error::{CalcError, CalcResult};

/// Input table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    /// Anything calamine opens: xlsx, xlsm, xls, ods
    Workbook,
}

impl TableFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> CalcResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(TableFormat::Workbook),
            "" => Err(CalcError::UnsupportedFile(format!(
                "{} has no extension (expected csv, xlsx, xls or ods)",
                path.display()
            ))),
            other => Err(CalcError::UnsupportedFile(format!(
                "'.{}' (expected csv, xlsx, xls or ods)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(TableFormat::from_path(Path::new("a.CSV")).unwrap(), TableFormat::Csv);
        assert_eq!(
            TableFormat::from_path(Path::new("dir/a.xlsx")).unwrap(),
            TableFormat::Workbook
        );
        assert_eq!(TableFormat::from_path(Path::new("a.ods")).unwrap(), TableFormat::Workbook);

        let err = TableFormat::from_path(Path::new("a.pdf")).unwrap_err();
        assert!(matches!(err, CalcError::UnsupportedFile(_)));
        assert!(TableFormat::from_path(Path::new("noext")).is_err());
    }
}
