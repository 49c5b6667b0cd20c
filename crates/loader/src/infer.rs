// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Column type inference
//!
//! Each column gets one SQL type from the kinds of its non-null cells.
//! Integers widen to DOUBLE when floats are present; any other mix is
//! ambiguous and handled by the configured [`MixedColumns`] policy.

use crate::config::MixedColumns;
use crate::record::{CellKind, RecordSet};
use crate::{Error, Result};
use diagnostics::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Timestamp,
    Varchar,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    fn from_kind(kind: CellKind) -> Self {
        match kind {
            CellKind::Integer => ColumnType::BigInt,
            CellKind::Float => ColumnType::Double,
            CellKind::Boolean => ColumnType::Boolean,
            CellKind::Timestamp => ColumnType::Timestamp,
            CellKind::Null | CellKind::Text => ColumnType::Varchar,
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

/// Combine the kind seen so far with the next cell's kind
fn merge(seen: CellKind, next: CellKind) -> std::result::Result<CellKind, (CellKind, CellKind)> {
    use CellKind::*;
    match (seen, next) {
        (a, Null) => Ok(a),
        (Null, b) => Ok(b),
        (a, b) if a == b => Ok(a),
        (Integer, Float) | (Float, Integer) => Ok(Float),
        (a, b) => Err((a, b)),
    }
}

/// Infer the type of every column in the record set
pub fn infer_schema(set: &RecordSet, policy: MixedColumns) -> Result<Vec<ColumnSpec>> {
    let mut specs = Vec::with_capacity(set.columns.len());

    for (index, column) in set.columns.iter().enumerate() {
        let name = column.as_str();
        let mut seen = CellKind::Null;
        let mut conflict = None;

        for cell in set.column(index) {
            match merge(seen, cell.kind()) {
                Ok(kind) => seen = kind,
                Err(pair) => {
                    conflict = Some(pair);
                    break;
                }
            }
        }

        let column_type = match (conflict, policy) {
            (None, _) => ColumnType::from_kind(seen),
            (Some(_), MixedColumns::Text) => {
                warn!(
                    "Column {name} in {source_name} has mixed values, loading as VARCHAR",
                    name: name,
                    source_name: set.source_name.as_str()
                );
                ColumnType::Varchar
            }
            (Some((first, second)), MixedColumns::Reject) => {
                return Err(Error::AmbiguousColumn {
                    source_name: set.source_name.clone(),
                    column: column.clone(),
                    first: first.describe(),
                    second: second.describe(),
                });
            }
        };

        debug!("Column {name} inferred as {sql_type}", name: name, sql_type: column_type.sql());
        specs.push(ColumnSpec {
            name: column.clone(),
            column_type,
        });
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Cell;

    fn record_set(columns: &[&str], rows: &[&[&str]]) -> RecordSet {
        RecordSet::new(
            "test.csv".to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| Cell::from_text(v)).collect())
                .collect(),
        )
    }

    fn types(specs: &[ColumnSpec]) -> Vec<ColumnType> {
        specs.iter().map(|s| s.column_type).collect()
    }

    #[test]
    fn test_basic_types() {
        let set = record_set(
            &["id", "amount", "active", "name", "empty"],
            &[&["1", "10", "true", "a", ""], &["2", "12.5", "FALSE", "b", "NA"]],
        );
        let specs = infer_schema(&set, MixedColumns::Reject).unwrap();
        assert_eq!(
            types(&specs),
            vec![
                ColumnType::BigInt,
                ColumnType::Double,
                ColumnType::Boolean,
                ColumnType::Varchar,
                ColumnType::Varchar,
            ]
        );
        assert_eq!(specs[0].name, "id");
    }

    #[test]
    fn test_nulls_do_not_change_type() {
        let set = record_set(&["n"], &[&[""], &["3"], &["#N/A"]]);
        let specs = infer_schema(&set, MixedColumns::Reject).unwrap();
        assert_eq!(types(&specs), vec![ColumnType::BigInt]);
    }

    #[test]
    fn test_mixed_numeric_text_is_rejected() {
        let set = record_set(&["Loan Id", "Amount"], &[&["L1", "5"], &["L2", "five"]]);
        let err = infer_schema(&set, MixedColumns::Reject).unwrap_err();
        match err {
            Error::AmbiguousColumn {
                source_name,
                column,
                first,
                second,
            } => {
                assert_eq!(source_name, "test.csv");
                assert_eq!(column, "Amount");
                assert_eq!((first, second), ("integer", "text"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_mixed_columns_can_load_as_text() {
        let set = record_set(&["Amount"], &[&["5"], &["five"]]);
        let specs = infer_schema(&set, MixedColumns::Text).unwrap();
        assert_eq!(types(&specs), vec![ColumnType::Varchar]);
    }

    #[test]
    fn test_boolean_with_numbers_is_ambiguous() {
        let set = record_set(&["flag"], &[&["1"], &["true"]]);
        assert!(infer_schema(&set, MixedColumns::Reject).is_err());
    }
}
