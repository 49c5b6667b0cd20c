// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Spreadsheet workbook reader
//!
//! Each sheet is read as a record set whose first row is the header.
//! Date cells keep their type and load as TIMESTAMP.

use crate::config::SheetRef;
use crate::record::{Cell, RecordSet};
use crate::{Error, Result};
use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use diagnostics::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// An open workbook
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path).map_err(|e| Error::workbook(path, e))?;
        debug!("Opened workbook {path}", path: path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Resolve a sheet reference to the sheet's label
    fn resolve(&self, sheet: &SheetRef) -> Result<String> {
        let names = self.sheet_names();
        let found = match sheet {
            SheetRef::Index(index) => names.get(*index).cloned(),
            SheetRef::Name(name) => names.iter().find(|n| *n == name).cloned(),
        };
        found.ok_or_else(|| Error::MissingSheet {
            path: self.path.clone(),
            sheet: sheet.to_string(),
        })
    }

    /// Read one sheet into memory
    pub fn read_sheet(&mut self, sheet: &SheetRef) -> Result<RecordSet> {
        let label = self.resolve(sheet)?;
        let range = self
            .sheets
            .worksheet_range(&label)
            .map_err(|e| Error::workbook(&self.path, e))?;

        let source_name = format!("{} [{label}]", self.path.display());
        let mut rows = range.rows();

        let header: Vec<String> = match rows.next() {
            Some(first) => first.iter().map(|cell| cell.to_string()).collect(),
            None => return Err(Error::EmptySource { source_name }),
        };

        let rows: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        debug!(
            "Read {row_count} rows from {source_name}",
            row_count: rows.len(),
            source_name: source_name.as_str()
        );

        Ok(RecordSet::new(source_name, header, rows))
    }
}

/// Convert one spreadsheet cell
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(value) => Cell::Integer(*value, value.to_string()),
        Data::Float(value) => Cell::from_float(*value),
        Data::Bool(value) => Cell::Boolean(*value, value.to_string().to_uppercase()),
        Data::String(text) => Cell::from_text(text),
        Data::DateTime(value) => {
            if value.is_duration() {
                Cell::from_float(value.as_f64())
            } else {
                value.as_datetime().map_or(Cell::Null, Cell::Timestamp)
            }
        }
        Data::DateTimeIso(text) => parse_iso_datetime(text)
            .map_or_else(|| Cell::Text(text.clone()), Cell::Timestamp),
        Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
