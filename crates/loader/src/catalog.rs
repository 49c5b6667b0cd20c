// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! DuckDB catalog access
//!
//! The catalog, not the filesystem, decides whether a table was already
//! loaded. Tables are created inside a single transaction so that a failed
//! load leaves nothing behind.

use crate::infer::{ColumnSpec, ColumnType};
use crate::naming::{TableName, quote_identifier};
use crate::record::{Cell, RecordSet};
use crate::{Error, Result};
use diagnostics::*;
use duckdb::types::{TimeUnit, Value};
use duckdb::{Connection, appender_params_from_iter};
use std::path::Path;

/// Open (creating if needed) the database file, along with its directory
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let conn = Connection::open(path)?;
    debug!("Opened database {path}", path: path.display().to_string());
    Ok(conn)
}

/// Result of a create attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Table created with this many rows
    Created(usize),
    /// Another load got there first
    AlreadyExists,
}

/// Catalog operations over a borrowed connection
pub struct Catalog<'conn> {
    conn: &'conn mut Connection,
}

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name = ?";

fn table_exists_on(conn: &Connection, name: &TableName) -> Result<bool> {
    let count: i64 = conn.query_row(TABLE_EXISTS_SQL, [name.as_str()], |row| row.get(0))?;
    Ok(count > 0)
}

impl<'conn> Catalog<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// True when a table or view with this name exists in the current schema
    pub fn table_exists(&self, name: &TableName) -> Result<bool> {
        table_exists_on(&*self.conn, name)
    }

    /// Create `name` holding `records` typed by `columns`.
    ///
    /// The existence check, DDL and inserts share one transaction. Any error
    /// rolls back, so the table is either fully populated or absent.
    pub fn create_table(
        &mut self,
        name: &TableName,
        columns: &[ColumnSpec],
        records: &RecordSet,
    ) -> Result<CreateOutcome> {
        let tx = self.conn.transaction()?;

        if table_exists_on(&tx, name)? {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let ddl = create_table_sql(name, columns);
        debug!("Creating table: {ddl}", ddl: ddl.as_str());
        if let Err(err) = tx.execute_batch(&ddl) {
            let err = Error::from(err);
            if err.is_duplicate_table() {
                return Ok(CreateOutcome::AlreadyExists);
            }
            return Err(err);
        }

        {
            let mut appender = tx.appender(name.as_str())?;
            for row in &records.rows {
                let values = row
                    .iter()
                    .zip(columns)
                    .map(|(cell, spec)| to_value(cell, spec.column_type));
                appender.append_row(appender_params_from_iter(values))?;
            }
            appender.flush()?;
        }

        tx.commit()?;
        Ok(CreateOutcome::Created(records.num_rows()))
    }

    /// Tables in the current schema, sorted by name
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Row count of a table in the current schema
    pub fn row_count(&self, name: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(name));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Every table with its row count, sorted by name
    pub fn summary(&self) -> Result<Vec<(String, u64)>> {
        self.list_tables()?
            .into_iter()
            .map(|name| {
                let rows = self.row_count(&name)?;
                Ok((name, rows))
            })
            .collect()
    }

    /// Column names of a table, in declaration order
    pub fn columns(&self, name: &TableName) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = ? \
             ORDER BY ordinal_position",
        )?;
        let names = stmt
            .query_map([name.as_str()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

fn create_table_sql(name: &TableName, columns: &[ColumnSpec]) -> String {
    let body = columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({body});", quote_identifier(name.as_str()))
}

/// Convert a cell to the database value for its column type
fn to_value(cell: &Cell, column_type: ColumnType) -> Value {
    match (cell, column_type) {
        (Cell::Null, _) => Value::Null,
        (Cell::Integer(v, _), ColumnType::BigInt) => Value::BigInt(*v),
        (Cell::Integer(v, _), ColumnType::Double) => Value::Double(*v as f64),
        (Cell::Float(v, _), ColumnType::Double) => Value::Double(*v),
        (Cell::Boolean(v, _), ColumnType::Boolean) => Value::Boolean(*v),
        (Cell::Timestamp(ts), ColumnType::Timestamp) => {
            Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
        (cell, _) => cell.to_text().map_or(Value::Null, Value::Text),
    }
}
