//! Reads tabular files (delimited text or spreadsheets) into rows of cells.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, warn};

use crate::error::{Result, SyncError};

pub type Row = Vec<String>;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITER_CANDIDATES: &[u8] = b",;\t";

pub fn is_spreadsheet(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Reads every non-empty row of a table, cells trimmed, columns kept in
/// their sheet positions (column A is index 0).
pub fn read_table(path: &Path) -> Result<Vec<Row>> {
    let rows = if is_spreadsheet(path) {
        read_spreadsheet(path)?
    } else {
        read_delimited(path)?
    };
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_delimited(path: &Path) -> Result<Vec<Row>> {
    let bytes = fs::read(path)?;
    let text = decode_text(&bytes);
    let delimiter = sniff_delimiter(&text);
    debug!(
        "Delimiter for {}: {:?}",
        path.display(),
        char::from(delimiter)
    );

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = record.iter().map(str::to_string).collect();
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// UTF-8 (leading BOM dropped), falling back to Windows-1251.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1251");
            let (text, _, had_errors) = encoding_rs::WINDOWS_1251.decode(bytes);
            if had_errors {
                warn!("Some characters could not be decoded as Windows-1251");
            }
            text.into_owned()
        }
    }
}

/// Picks the candidate that splits the first lines most consistently,
/// counting only separators outside quotes. Defaults to a comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    let mut best: Option<((bool, usize), u8)> = None;
    for &candidate in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();
        let Some(&first) = counts.first() else {
            continue;
        };
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().all(|&c| c == first);
        let score = (consistent, first);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, candidate));
        }
    }
    best.map_or(b',', |(_, d)| d)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn read_spreadsheet(path: &Path) -> Result<Vec<Row>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SyncError::data(path.display(), "workbook has no sheets"))??;

    // A range starts at its first used cell; pad so column A stays index 0.
    let leading = range.start().map_or(0, |(_, col)| col as usize);
    let mut rows = Vec::new();
    for sheet_row in range.rows() {
        let mut row: Row = vec![String::new(); leading];
        row.extend(sheet_row.iter().map(cell_text));
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Cell as text. Whole-number floats print without a fraction so numeric
/// article numbers and barcodes survive (`4047024370390`, not `4.04e12`).
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Error(e) => {
            debug!("Spreadsheet cell error: {e:?}");
            String::new()
        }
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
