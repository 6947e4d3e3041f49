use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::AppError;
use crate::services::analytics::types::{CellValue, Row, Table};

const EMPTY_HEADER: &str = "__EMPTY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_filename(name: &str) -> Result<Self, AppError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
            "csv" => Ok(SheetFormat::Csv),
            _ => Err(AppError::InvalidInput(
                "Only Excel and CSV files are allowed!".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub sheet_name: String,
    pub table: Table,
}

/// Makes every header unique. Blank headers become `__EMPTY`, repeats get a
/// numeric suffix (`name`, `name_1`, `name_2`, ...).
pub fn unique_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut existing_names = HashSet::new();
    raw.into_iter()
        .map(|name| {
            let base = if name.is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                name
            };

            let mut candidate = base.clone();
            let mut counter = 1;
            while !existing_names.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, counter);
                counter += 1;
            }
            candidate
        })
        .collect()
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        // Excel dates come through as their serial day number
        Data::DateTime(d) => CellValue::Number(d.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

/// Zips a data row onto the headers. Fully blank rows yield `None`.
fn build_row(headers: &[String], cells: Vec<CellValue>) -> Option<Row> {
    if cells.iter().all(CellValue::is_empty) {
        return None;
    }

    let mut cells = cells.into_iter();
    Some(
        headers
            .iter()
            .map(|header| (header.clone(), cells.next().unwrap_or(CellValue::Empty)))
            .collect(),
    )
}

fn parse_workbook(data: &[u8]) -> Result<ParsedSheet, AppError> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open workbook: {}", e);
        AppError::from(e)
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::debug!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| AppError::InvalidInput("No sheets found in workbook".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| unique_headers(row.iter().map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string(),
        })))
        .ok_or_else(|| AppError::InvalidInput(format!("Sheet '{}' is empty", sheet_name)))?;

    let rows = rows
        .filter_map(|row| build_row(&headers, row.iter().map(cell_from_data).collect()))
        .collect();

    Ok(ParsedSheet {
        sheet_name,
        table: Table::new(headers, rows),
    })
}

fn parse_csv(data: &[u8]) -> Result<ParsedSheet, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = reader.records();
    let header_record = records
        .next()
        .transpose()?
        .ok_or_else(|| AppError::InvalidInput("CSV file is empty".to_string()))?;
    let headers = unique_headers(header_record.iter().map(str::to_string));

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if let Some(row) = build_row(&headers, record.iter().map(CellValue::from).collect()) {
            rows.push(row);
        }
    }

    Ok(ParsedSheet {
        sheet_name: "Sheet1".to_string(),
        table: Table::new(headers, rows),
    })
}

/// Reads the first sheet of an uploaded file into a [`Table`].
pub fn parse_sheet(data: &[u8], format: SheetFormat) -> Result<ParsedSheet, AppError> {
    let start = std::time::Instant::now();
    let parsed = match format {
        SheetFormat::Workbook => parse_workbook(data)?,
        SheetFormat::Csv => parse_csv(data)?,
    };

    tracing::info!(
        "Parsed sheet '{}': {} rows, {} columns in {:?}",
        parsed.sheet_name,
        parsed.table.rows.len(),
        parsed.table.headers.len(),
        start.elapsed()
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(SheetFormat::from_filename("report.XLSX").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_filename("legacy.xls").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_filename("export.csv").unwrap(), SheetFormat::Csv);
        assert!(matches!(
            SheetFormat::from_filename("notes.txt"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(SheetFormat::from_filename("no_extension").is_err());
    }

    #[test]
    fn headers_are_made_unique() {
        let headers = unique_headers(
            ["name", "", "name", "", "name"].iter().map(|s| s.to_string()),
        );
        assert_eq!(headers, vec!["name", "__EMPTY", "name_1", "__EMPTY_1", "name_2"]);
    }

    #[test]
    fn csv_rows_are_keyed_by_header() {
        let data = b"region,sales\nNorth,10\nSouth,\n,\nEast,7,extra\n";
        let parsed = parse_sheet(data, SheetFormat::Csv).unwrap();

        assert_eq!(parsed.table.headers, vec!["region", "sales"]);
        assert_eq!(parsed.table.rows.len(), 3);
        assert_eq!(parsed.table.rows[0]["region"], CellValue::Text("North".to_string()));
        assert_eq!(parsed.table.rows[0]["sales"], CellValue::Text("10".to_string()));
        assert_eq!(parsed.table.rows[1]["sales"], CellValue::Empty);
        assert_eq!(parsed.table.rows[2].len(), 2);
    }

    #[test]
    fn short_csv_rows_are_padded() {
        let data = b"a,b,c\n1\n";
        let parsed = parse_sheet(data, SheetFormat::Csv).unwrap();
        assert_eq!(parsed.table.rows[0]["c"], CellValue::Empty);
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(matches!(
            parse_sheet(b"", SheetFormat::Csv),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn garbage_workbook_fails_to_open() {
        assert!(matches!(
            parse_sheet(b"definitely not a spreadsheet", SheetFormat::Workbook),
            Err(AppError::FileProcessingError(_))
        ));
    }

    #[test]
    fn workbook_cells_map_to_values() {
        assert_eq!(cell_from_data(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_from_data(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(cell_from_data(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(
            cell_from_data(&Data::String("x".to_string())),
            CellValue::Text("x".to_string())
        );
    }
}
