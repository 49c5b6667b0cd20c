// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use diagnostics::*;
use duckdb::{AccessMode, Config, Connection};
use loader::config::SchemaNames;
use loader::naming::quote_identifier;
use loader::PipelineConfig;

/// Age buckets produced by the transformation layer, in report order
pub const AGE_GROUPS: &[&str] = &["18-25", "26-35", "36-45", "46-55", "Above 55", "Unknown"];

/// Income buckets produced by the transformation layer, in report order
pub const INCOME_GROUPS: &[&str] = &[
    "Below 5,000",
    "5,000-9,999",
    "10,000-19,999",
    "20,000-29,999",
    "30,000-49,999",
    "50,000-99,999",
    "100,000-149,999",
    "150,000 and above",
    "Unknown",
];

/// Characters of an error message shown in a skip line
const SKIP_MESSAGE_CHARS: usize = 50;

/// Shared state for the report commands: a read-only connection plus the
/// schema and directory settings from [`PipelineConfig`].
pub struct ReportContext {
    conn: Connection,
    schemas: SchemaNames,
    processed_dir: PathBuf,
}

impl ReportContext {
    /// Open the configured database read-only
    pub fn open(config: &PipelineConfig) -> Result<Self> {
        let path = &config.database_path;
        if !path.is_file() {
            anyhow::bail!(
                "Database {} does not exist. Run load-snapshots first.",
                path.display()
            );
        }
        let conn = open_read_only(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self::new(conn, config))
    }

    pub fn new(conn: Connection, config: &PipelineConfig) -> Self {
        Self {
            conn,
            schemas: config.schemas.clone(),
            processed_dir: config.processed_dir.clone(),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn staging(&self, table: &str) -> String {
        qualified(&self.schemas.staging, table)
    }

    pub fn intermediate(&self, table: &str) -> String {
        qualified(&self.schemas.intermediate, table)
    }

    pub fn marts(&self, table: &str) -> String {
        qualified(&self.schemas.marts, table)
    }

    /// Single integer result, e.g. a `COUNT(*)`
    pub fn count(&self, sql: &str) -> Result<i64> {
        let value: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value)
    }

    /// Two-column `(label, count)` result. NULL labels read as "None".
    pub fn pairs(&self, sql: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                let label: Option<String> = row.get(0)?;
                Ok((label.unwrap_or_else(|| "None".to_string()), row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Ok(Connection::open_with_flags(path, config)?)
}

/// `"schema"."table"`
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// SQL string literal
pub fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CASE` expression ranking `column` by its position in `order`
pub fn order_by_category(column: &str, order: &[&str]) -> String {
    let mut sql = format!("CASE {column}");
    for (rank, value) in order.iter().enumerate() {
        sql.push_str(&format!(" WHEN {} THEN {}", sql_string(value), rank + 1));
    }
    sql.push_str(&format!(" ELSE {} END", order.len() + 1));
    sql
}

/// Integer with thousands separators
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `part` as a percentage of `whole`, one decimal place
pub fn format_percent(part: i64, whole: i64) -> String {
    if whole == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

/// Status line for a unit that failed: `[SKIP] unit (Error: message...)`
///
/// A DuckDB error anywhere in the chain supplies the message; its own
/// source is only the bare FFI error code.
pub fn skip_line(unit: &str, err: &anyhow::Error) -> String {
    let cause = err
        .chain()
        .find_map(|e| e.downcast_ref::<duckdb::Error>())
        .map(ToString::to_string)
        .unwrap_or_else(|| err.root_cause().to_string());
    let message: String = cause
        .chars()
        .take(SKIP_MESSAGE_CHARS)
        .collect();
    format!("[SKIP] {unit} (Error: {message}...)")
}

/// Run one report unit. Its output is only written when it succeeds;
/// otherwise a skip line takes its place. Returns whether it succeeded.
pub fn section<W, F>(out: &mut W, unit: &str, body: F) -> Result<bool>
where
    W: Write,
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut buf = Vec::new();
    match body(&mut buf) {
        Ok(()) => {
            out.write_all(&buf)?;
            Ok(true)
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!("Report unit {unit} skipped: {message}", unit: unit, message: message);
            writeln!(out, "{}", skip_line(unit, &err))?;
            Ok(false)
        }
    }
}

/// Write `(label, count)` rows with each row's share of the total
pub fn write_distribution<W: Write>(
    out: &mut W,
    rows: &[(String, i64)],
    label_width: usize,
    noun: &str,
) -> Result<()> {
    let total: i64 = rows.iter().map(|(_, n)| n).sum();
    for (label, count) in rows {
        writeln!(
            out,
            "  {label:label_width$} {:>8} {noun} ({:>6})",
            format_count(*count),
            format_percent(*count, total)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1_048_575), "1,048,575");
        assert_eq!(format_count(-12_345), "-12,345");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1, 3), "33.3%");
        assert_eq!(format_percent(5, 5), "100.0%");
        assert_eq!(format_percent(1, 0), "n/a");
    }

    #[test]
    fn test_skip_line_truncates() {
        let err = anyhow::anyhow!("{}", "x".repeat(80));
        let line = skip_line("export.csv", &err);
        assert_eq!(line, format!("[SKIP] export.csv (Error: {}...)", "x".repeat(50)));

        let short = anyhow::anyhow!("Table missing");
        assert_eq!(
            skip_line("verify", &short),
            "[SKIP] verify (Error: Table missing...)"
        );
    }

    #[test]
    fn test_skip_line_shows_root_cause() {
        let err = anyhow::anyhow!("Catalog Error: no such table").context("querying stg_customers");
        assert_eq!(
            skip_line("unit", &err),
            "[SKIP] unit (Error: Catalog Error: no such table...)"
        );
    }

    #[test]
    fn test_skip_line_shows_database_message() {
        let conn = Connection::open_in_memory().expect("in-memory database");
        let err = conn
            .prepare("SELECT * FROM main_staging.stg_customers")
            .map(|_| ())
            .context("querying stg_customers")
            .expect_err("missing table");
        let line = skip_line("stg_customers.csv", &err);
        assert!(
            line.starts_with("[SKIP] stg_customers.csv (Error: Catalog Error"),
            "{line}"
        );
        assert!(!line.contains("Error code"), "{line}");
    }

    #[test]
    fn test_order_by_category() {
        assert_eq!(
            order_by_category("g", &["a", "b'c"]),
            "CASE g WHEN 'a' THEN 1 WHEN 'b''c' THEN 2 ELSE 3 END"
        );
    }

    #[test]
    fn test_qualified() {
        assert_eq!(
            qualified("main_staging", "stg_customers"),
            "\"main_staging\".\"stg_customers\""
        );
    }

    #[test]
    fn test_section_isolates_failures() -> Result<()> {
        let mut out = Vec::new();
        let ok = section(&mut out, "first", |buf| {
            writeln!(buf, "partial")?;
            anyhow::bail!("boom")
        })?;
        assert!(!ok);
        let ok = section(&mut out, "second", |buf| {
            writeln!(buf, "fine")?;
            Ok(())
        })?;
        assert!(ok);
        let text = String::from_utf8(out)?;
        assert_eq!(text, "[SKIP] first (Error: boom...)\nfine\n");
        Ok(())
    }

    #[test]
    fn test_write_distribution() -> Result<()> {
        let mut out = Vec::new();
        let rows = vec![("Male".to_string(), 3), ("Female".to_string(), 1)];
        write_distribution(&mut out, &rows, 8, "loans")?;
        let text = String::from_utf8(out)?;
        assert_eq!(
            text,
            "  Male            3 loans ( 75.0%)\n  Female          1 loans ( 25.0%)\n"
        );
        Ok(())
    }
}
