// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Delimited text reader
//!
//! Reads every field as Utf8 with arrow_csv and classifies the values
//! afterwards, so inference sees the original text of every cell.

use crate::record::{Cell, RecordSet};
use crate::{Error, Result};
use arrow_array::Array;
use arrow_array::cast::AsArray;
use arrow_csv::reader::{Format, ReaderBuilder};
use arrow_schema::{DataType, Field, Schema};
use diagnostics::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

const BATCH_SIZE: usize = 8192;

/// Read a whole CSV file with a header row into memory
pub fn read_csv(path: &Path) -> Result<RecordSet> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let source_name = path.display().to_string();

    let format = Format::default().with_header(true);

    // Header only; types are inferred later from the cell text
    let (raw_schema, _) = format
        .infer_schema(Cursor::new(&bytes), Some(0))
        .map_err(|e| Error::csv(path, e))?;
    let header: Vec<String> = raw_schema
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    if header.is_empty() {
        return Err(Error::EmptySource { source_name });
    }

    let fields: Vec<Field> = (0..header.len())
        .map(|i| Field::new(format!("c{i}"), DataType::Utf8, true))
        .collect();
    let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(&bytes))
        .map_err(|e| Error::csv(path, e))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| Error::csv(path, e))?;
        let columns: Vec<_> = batch
            .columns()
            .iter()
            .map(|col| col.as_string::<i32>())
            .collect();

        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|col| {
                        if col.is_null(row) {
                            Cell::Null
                        } else {
                            Cell::from_text(col.value(row))
                        }
                    })
                    .collect(),
            );
        }
    }

    debug!(
        "Read {row_count} rows x {column_count} columns from {source_name}",
        row_count: rows.len(),
        column_count: header.len(),
        source_name: source_name.as_str()
    );

    Ok(RecordSet::new(source_name, header, rows))
}
