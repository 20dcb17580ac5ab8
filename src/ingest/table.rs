//! Header-addressed CSV tables.
//!
//! The exports this service reads are small (low thousands of rows) and
//! single-line per record, so they are parsed in one pass into memory.
//! Columns are looked up by header name rather than position, since the
//! column set is the contract and column order varies between exports.

use crate::error::{CatchmentError, CatchmentResult};

/// One data line of a table, with its 1-based line number for diagnostics.
#[derive(Debug, Clone)]
pub struct Record {
    pub line: usize,
    fields: Vec<String>,
}

impl Record {
    /// Field at `index`, or `""` for short rows.
    pub fn get(&self, index: usize) -> &str {
        self.fields.get(index).map(|s| s.trim()).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Index of the column whose header matches `name` (case-insensitive).
    pub fn column(&self, name: &str) -> CatchmentResult<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatchmentError::MissingColumn {
                file: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse CSV text. The first non-empty line is the header row.
pub fn parse_table(name: &str, text: &str) -> Table {
    let mut headers = Vec::new();
    let mut records = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if headers.is_empty() {
            headers = split_line(line.trim_start_matches('\u{feff}'))
                .into_iter()
                .map(|h| h.trim().to_string())
                .collect();
            continue;
        }
        records.push(Record {
            line: i + 1,
            fields: split_line(line),
        });
    }

    Table {
        name: name.to_string(),
        headers,
        records,
    }
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a numeric field. Blank, `null`, `nan` and non-numeric text are `None`.
pub fn parse_number(field: &str) -> Option<f64> {
    let s = field.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a station number, which some exports write as a float (`88061.0`).
pub fn parse_station(field: &str) -> Option<u32> {
    let value = parse_number(field)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}
