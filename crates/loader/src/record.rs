// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory record sets read from source files

use chrono::NaiveDateTime;

/// Spellings loaded as NULL, matching the usual dataframe defaults
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_token(text: &str) -> bool {
    NULL_TOKENS.contains(&text)
}

/// Kind of a single value, used for column type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Null,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

impl CellKind {
    pub fn describe(self) -> &'static str {
        match self {
            CellKind::Null => "null",
            CellKind::Integer => "integer",
            CellKind::Float => "float",
            CellKind::Boolean => "boolean",
            CellKind::Timestamp => "timestamp",
            CellKind::Text => "text",
        }
    }
}

/// One value of a record set
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Integer with the text it was read from
    Integer(i64, String),
    /// Float with the text it was read from
    Float(f64, String),
    Boolean(bool, String),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Cell {
    /// Classify a text field from a delimited file.
    ///
    /// Dates stay text here: delimited sources carry no type information and
    /// date spellings vary between exports.
    pub fn from_text(text: &str) -> Cell {
        if is_null_token(text) {
            return Cell::Null;
        }
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Integer(value, text.to_string());
        }
        if looks_numeric(trimmed)
            && let Ok(value) = trimmed.parse::<f64>()
        {
            return Cell::Float(value, text.to_string());
        }
        match trimmed {
            "True" | "TRUE" | "true" => Cell::Boolean(true, text.to_string()),
            "False" | "FALSE" | "false" => Cell::Boolean(false, text.to_string()),
            _ => Cell::Text(text.to_string()),
        }
    }

    /// Wrap a workbook float. Whole numbers become integers so that
    /// spreadsheet id columns load as BIGINT.
    pub fn from_float(value: f64) -> Cell {
        if value.is_nan() {
            return Cell::Null;
        }
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            let int = value as i64;
            return Cell::Integer(int, int.to_string());
        }
        Cell::Float(value, value.to_string())
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Null => CellKind::Null,
            Cell::Integer(..) => CellKind::Integer,
            Cell::Float(..) => CellKind::Float,
            Cell::Boolean(..) => CellKind::Boolean,
            Cell::Timestamp(_) => CellKind::Timestamp,
            Cell::Text(_) => CellKind::Text,
        }
    }

    /// Text form of the cell, as it appeared in the source where known
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Integer(_, text) | Cell::Float(_, text) | Cell::Boolean(_, text) => {
                Some(text.clone())
            }
            Cell::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::Text(text) => Some(text.clone()),
        }
    }
}

/// Requires a digit so that "inf" and "NaN" spellings stay text
fn looks_numeric(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

/// A rectangular record set: header names plus rows of equal width
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    /// Name of the source, used in error messages
    pub source_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    /// Build a record set from raw header cells. Rows shorter than the
    /// header are padded with nulls.
    pub fn new(source_name: String, header: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let columns = clean_header(header);
        for row in &mut rows {
            row.resize(columns.len(), Cell::Null);
        }
        Self {
            source_name,
            columns,
            rows,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over the values of one column
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }
}

/// Normalize header names: strip a UTF-8 BOM, name empty columns
/// `Unnamed: <index>`, and suffix duplicates with `.1`, `.2`, ...
pub fn clean_header(header: Vec<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());

    for (index, raw) in header.into_iter().enumerate() {
        let name = if index == 0 {
            raw.trim_start_matches('\u{feff}').to_string()
        } else {
            raw
        };
        let name = if name.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            name
        };

        let mut candidate = name.clone();
        let mut suffix = 1;
        while columns.iter().any(|c| c.eq_ignore_ascii_case(&candidate)) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        columns.push(candidate);
    }

    columns
}
