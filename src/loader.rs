use crate::error::{DreError, Result};
use crate::types::{Scalar, Table};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use log::debug;
use std::io::Cursor;

/// Name reported for the single sheet of a CSV payload.
pub const CSV_SHEET_NAME: &str = "csv";

/// Turns raw bytes into sheets of rows. The first row of a sheet is its header.
pub trait TabularLoader {
    fn sheet_names(&self, bytes: &[u8]) -> Result<Vec<String>>;
    fn read_sheet(&self, bytes: &[u8], sheet: &str) -> Result<Table>;
}

impl<L: TabularLoader + ?Sized> TabularLoader for &L {
    fn sheet_names(&self, bytes: &[u8]) -> Result<Vec<String>> {
        (**self).sheet_names(bytes)
    }

    fn read_sheet(&self, bytes: &[u8], sheet: &str) -> Result<Table> {
        (**self).read_sheet(bytes, sheet)
    }
}

/// Rows whose cells are all missing (`;;;` in a CSV, trailing formatted
/// rows in a workbook) are dropped by every loader.
fn has_values(row: &[Scalar]) -> bool {
    row.iter().any(|c| !c.is_missing())
}

/// Delimited text. `;` vs `,` is sniffed from the header line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvLoader;

impl CsvLoader {
    fn delimiter(bytes: &[u8]) -> u8 {
        let header = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
        let semis = header.iter().filter(|b| **b == b';').count();
        let commas = header.iter().filter(|b| **b == b',').count();
        if semis > commas {
            b';'
        } else {
            b','
        }
    }
}

impl TabularLoader for CsvLoader {
    fn sheet_names(&self, _bytes: &[u8]) -> Result<Vec<String>> {
        Ok(vec![CSV_SHEET_NAME.to_string()])
    }

    fn read_sheet(&self, bytes: &[u8], _sheet: &str) -> Result<Table> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .delimiter(Self::delimiter(bytes))
            .from_reader(bytes);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let row: Vec<Scalar> = record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Scalar::Missing
                    } else {
                        Scalar::Text(field.to_string())
                    }
                })
                .collect();
            if has_values(&row) {
                rows.push(row);
            }
        }
        debug!("csv: {} columns, {} rows", columns.len(), rows.len());
        Ok(Table::new(columns, rows))
    }
}

/// xlsx / xlsm / xls / ods workbooks via calamine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetLoader;

fn cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty | Data::Error(_) => Scalar::Missing,
        Data::String(s) if s.trim().is_empty() => Scalar::Missing,
        Data::String(s) => Scalar::Text(s.clone()),
        Data::Float(f) => Scalar::Number(*f),
        Data::Int(i) => Scalar::Number(*i as f64),
        Data::Bool(b) => Scalar::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Scalar::Date(d),
            None => Scalar::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Scalar::Text(s.clone()),
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => cell_to_scalar(other).as_text().unwrap_or_default(),
    }
}

impl TabularLoader for SpreadsheetLoader {
    fn sheet_names(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(workbook.sheet_names())
    }

    fn read_sheet(&self, bytes: &[u8], sheet: &str) -> Result<Table> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook.worksheet_range(sheet)?;
        let mut rows_iter = range.rows();
        let columns: Vec<String> = match rows_iter.next() {
            Some(header) => header.iter().map(header_text).collect(),
            None => Vec::new(),
        };
        let rows: Vec<Vec<Scalar>> = rows_iter
            .map(|row| row.iter().map(cell_to_scalar).collect())
            .filter(|row: &Vec<Scalar>| has_values(row))
            .collect();
        debug!("sheet '{}': {} columns, {} rows", sheet, columns.len(), rows.len());
        Ok(Table::new(columns, rows))
    }
}

/// Dispatches on the payload's magic bytes: zip (xlsx/ods) and OLE (xls)
/// go to calamine, anything else is read as CSV.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoLoader;

impl AutoLoader {
    fn is_workbook(bytes: &[u8]) -> bool {
        bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
    }
}

impl TabularLoader for AutoLoader {
    fn sheet_names(&self, bytes: &[u8]) -> Result<Vec<String>> {
        if bytes.is_empty() {
            return Err(DreError::SourceUnavailable("empty payload".to_string()));
        }
        if Self::is_workbook(bytes) {
            SpreadsheetLoader.sheet_names(bytes)
        } else {
            CsvLoader.sheet_names(bytes)
        }
    }

    fn read_sheet(&self, bytes: &[u8], sheet: &str) -> Result<Table> {
        if Self::is_workbook(bytes) {
            SpreadsheetLoader.read_sheet(bytes, sheet)
        } else {
            CsvLoader.read_sheet(bytes, sheet)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_semicolon_with_bom() {
        let bytes = "\u{feff}EMPRESA;FAT MÊS $;TIMES\nACME;10.000,00;09/2025\nBETA;;09/2025\n";
        let table = CsvLoader.read_sheet(bytes.as_bytes(), CSV_SHEET_NAME).unwrap();
        assert_eq!(table.columns(), &["EMPRESA", "FAT MÊS $", "TIMES"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1).as_f64(), 10000.0);
        assert!(table.cell(1, 1).is_missing());
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let bytes = b"A,B,C\n1,2\n";
        let table = CsvLoader.read_sheet(bytes, CSV_SHEET_NAME).unwrap();
        assert!(table.cell(0, 2).is_missing());
    }

    #[test]
    fn csv_blank_rows_are_dropped() {
        let bytes = b"EMPRESA;FAT;TIMES\nACME;10;09/2025\n;;\n ; ; \nBETA;5;09/2025\n";
        let table = CsvLoader.read_sheet(bytes, CSV_SHEET_NAME).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0).as_text().as_deref(), Some("BETA"));
    }

    #[test]
    fn auto_loader_rejects_empty_payload() {
        assert!(matches!(
            AutoLoader.sheet_names(b""),
            Err(DreError::SourceUnavailable(_))
        ));
        assert_eq!(AutoLoader.sheet_names(b"A,B\n").unwrap(), vec!["csv"]);
    }

    #[test]
    fn garbage_workbook_is_an_error() {
        assert!(AutoLoader.sheet_names(b"PK\x03\x04not a zip").is_err());
    }
}
