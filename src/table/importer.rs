//! Table importer: CSV and spreadsheet files → DataTable

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use super::TableFormat;
use crate::error::{CalcError, CalcResult};
use crate::types::{Cell, DataTable};

pub struct TableImporter {
    path: PathBuf,
}

impl TableImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the file into a table. The first row is the header row.
    pub fn import(&self) -> CalcResult<DataTable> {
        let format = TableFormat::from_path(&self.path)?;
        if !self.path.is_file() {
            return Err(CalcError::Import(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let table = match format {
            TableFormat::Csv => {
                let file = File::open(&self.path)?;
                read_csv(file)?
            }
            TableFormat::Workbook => self.read_workbook()?,
        };

        debug!(
            path = %self.path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Imported table"
        );
        Ok(table)
    }

    fn read_workbook(&self) -> CalcResult<DataTable> {
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| CalcError::Import(format!("Failed to open workbook: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CalcError::Import("Workbook has no worksheets".to_string()))?
            .map_err(|e| CalcError::Import(format!("Failed to read first worksheet: {}", e)))?;

        Ok(table_from_range(&range))
    }
}

/// Read CSV (header row required) from any reader
pub fn read_csv<R: Read>(reader: R) -> CalcResult<DataTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| CalcError::Import(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h, i))
        .collect();

    let mut table = DataTable::new(headers);
    for result in csv_reader.records() {
        let record = result?;
        let mut row: Vec<Cell> = record.iter().map(Cell::detect).collect();
        row.truncate(table.column_count());
        table.push_row(row);
    }

    Ok(table)
}

fn table_from_range(range: &Range<Data>) -> DataTable {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| header_name(&cell.to_string(), i))
            .collect(),
        None => return DataTable::default(),
    };

    let mut table = DataTable::new(headers);
    for row in rows {
        table.push_row(row.iter().map(cell_from_data).collect());
    }
    table
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        other => Cell::Text(other.to_string()),
    }
}

/// Headers are trimmed; a blank header gets a positional name
fn header_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("col_{}", index + 1)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_detects_types() {
        let data = "COVER_CODE, Premium ,active\nL190A01,1000,true\nLI90B01,,false\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["COVER_CODE", "Premium", "active"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][0], Cell::Text("L190A01".to_string()));
        assert_eq!(table.rows[0][1], Cell::Number(1000.0));
        assert_eq!(table.rows[0][2], Cell::Bool(true));
        assert_eq!(table.rows[1][1], Cell::Empty);
    }

    #[test]
    fn test_read_csv_ragged_rows() {
        let data = "a,b,c\n1\n1,2,3,4\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec![Cell::Number(1.0), Cell::Empty, Cell::Empty]);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_blank_header_named_by_position() {
        let table = read_csv("a,,c\n1,2,3\n".as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["a", "col_2", "c"]);
    }

    #[test]
    fn test_header_only_csv() {
        let table = read_csv("COVER_CODE,premium\n".as_bytes()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_import_missing_file() {
        let err = TableImporter::new("/nonexistent/policies.csv").import().unwrap_err();
        assert!(matches!(err, CalcError::Import(_)));
    }

    #[test]
    fn test_import_unsupported_extension() {
        let err = TableImporter::new("policies.txt").import().unwrap_err();
        assert!(matches!(err, CalcError::UnsupportedFile(_)));
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(5)), Cell::Number(5.0));
        assert_eq!(cell_from_data(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Bool(false)), Cell::Bool(false));
    }
}
