// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_csv::WriterBuilder;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use diagnostics::*;
use tempfile::NamedTempFile;

use crate::common::{ReportContext, format_count, format_percent, section};

/// Layer a table is exported from
#[derive(Debug, Clone, Copy)]
enum Layer {
    Staging,
    Marts,
}

struct ExportTarget {
    file: &'static str,
    layer: Layer,
    table: &'static str,
    order_by: &'static str,
}

const EXPORTS: &[ExportTarget] = &[
    ExportTarget {
        file: "mart_portfolio_performance.csv",
        layer: Layer::Marts,
        table: "mart_portfolio_performance",
        order_by: "snapshot_date",
    },
    ExportTarget {
        file: "mart_credit_vs_nps.csv",
        layer: Layer::Marts,
        table: "mart_credit_vs_nps",
        order_by: "loan_id",
    },
    ExportTarget {
        file: "mart_cohort_analysis.csv",
        layer: Layer::Marts,
        table: "mart_cohort_analysis",
        order_by: "cohort_quarter, snapshot_date",
    },
    ExportTarget {
        file: "stg_customers.csv",
        layer: Layer::Staging,
        table: "stg_customers",
        order_by: "loan_id",
    },
];

pub const SUMMARY_FILE: &str = "SUMMARY.csv";

/// What an export run produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// File name and row count of every file written
    pub written: Vec<(String, usize)>,
    /// Files that could not be produced
    pub skipped: Vec<String>,
}

/// Export the mart and staging tables plus a summary to the processed
/// directory. A failing export is reported and the others still run.
pub fn export_command<W: Write>(ctx: &ReportContext, out: &mut W) -> Result<ExportReport> {
    let dir = ctx.processed_dir();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    info!("Exporting tables to {dir}", dir: dir.display().to_string());
    writeln!(out, "EXPORTING PROCESSED DATA TO CSV")?;
    writeln!(out, "\nExporting tables:")?;

    let mut report = ExportReport::default();

    for target in EXPORTS {
        let table = match target.layer {
            Layer::Staging => ctx.staging(target.table),
            Layer::Marts => ctx.marts(target.table),
        };
        let sql = format!("SELECT * FROM {table} ORDER BY {}", target.order_by);
        let path = dir.join(target.file);

        let mut rows = 0;
        let ok = section(out, target.file, |buf| {
            rows = write_query_csv(ctx, &sql, &path)?;
            writeln!(
                buf,
                "  [OK] {:40} {:>8} rows",
                target.file,
                format_count(rows as i64)
            )?;
            Ok(())
        })?;
        if ok {
            report.written.push((target.file.to_string(), rows));
        } else {
            report.skipped.push(target.file.to_string());
        }
    }

    writeln!(out, "\nGenerating summary statistics")?;
    let path = dir.join(SUMMARY_FILE);
    let mut rows = 0;
    let ok = section(out, SUMMARY_FILE, |buf| {
        let metrics = summary_metrics(ctx)?;
        write_summary_csv(&path, &metrics)?;
        rows = metrics.len();
        for (metric, value) in &metrics {
            writeln!(buf, "  {metric:32} {value:>10}")?;
        }
        Ok(())
    })?;
    if ok {
        report.written.push((SUMMARY_FILE.to_string(), rows));
    } else {
        report.skipped.push(SUMMARY_FILE.to_string());
    }

    let location = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    writeln!(out, "[OK] Export complete! Location: {}", location.display())?;
    Ok(report)
}

/// Run `sql` and write every row to `path` with a header line.
fn write_query_csv(ctx: &ReportContext, sql: &str, path: &Path) -> Result<usize> {
    let mut stmt = ctx.conn().prepare(sql)?;
    let arrow = stmt.query_arrow([])?;
    let schema = arrow.get_schema();
    let batches: Vec<RecordBatch> = arrow.collect();

    let rows = write_batches(path, schema, &batches)?;
    debug!("Wrote {rows} rows to {path}", rows: rows, path: path.display().to_string());
    Ok(rows)
}

/// Write `batches` as CSV with a header line, returning the row count.
///
/// The data goes to a temporary file in the same directory that is moved
/// into place once complete. On any error the temporary file is removed,
/// so a failed export leaves neither a truncated file nor a leftover.
fn write_batches(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<usize> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;

    let mut rows = 0;
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut tmp);
        if batches.is_empty() {
            // Header only
            writer.write(&RecordBatch::new_empty(schema))?;
        }
        for batch in batches {
            writer.write(batch)?;
            rows += batch.num_rows();
        }
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to move export into place at {}", path.display()))?;
    Ok(rows)
}

/// Headline metrics for `SUMMARY.csv`
fn summary_metrics(ctx: &ReportContext) -> Result<Vec<(&'static str, String)>> {
    let snapshots = ctx.staging("stg_credit_snapshots");
    let total_loans = ctx.count(&format!(
        "SELECT COUNT(DISTINCT loan_id) FROM {snapshots}
         WHERE snapshot_date = (SELECT MAX(snapshot_date) FROM {snapshots})"
    ))?;
    let total_customers = ctx.count(&format!(
        "SELECT COUNT(DISTINCT loan_id) FROM {}",
        ctx.staging("stg_customers")
    ))?;
    let total_records = ctx.count(&format!("SELECT COUNT(*) FROM {snapshots}"))?;
    let nps_responses = ctx.count(&format!(
        "SELECT COUNT(*) FROM {} WHERE nps_score IS NOT NULL",
        ctx.marts("mart_credit_vs_nps")
    ))?;

    Ok(vec![
        ("Total Loans (Latest Snapshot)", format_count(total_loans)),
        ("Total Unique Customers", format_count(total_customers)),
        ("Total Credit Snapshot Records", format_count(total_records)),
        ("NPS Survey Responses", format_count(nps_responses)),
        (
            "NPS Response Rate (%)",
            format_percent(nps_responses, total_loans),
        ),
    ])
}

fn write_summary_csv(path: &Path, metrics: &[(&'static str, String)]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Metric", DataType::Utf8, false),
        Field::new("Value", DataType::Utf8, false),
    ]));
    let names: ArrayRef = Arc::new(StringArray::from_iter_values(
        metrics.iter().map(|(metric, _)| *metric),
    ));
    let values: ArrayRef = Arc::new(StringArray::from_iter_values(
        metrics.iter().map(|(_, value)| value.as_str()),
    ));
    let batch = RecordBatch::try_new(schema.clone(), vec![names, values])?;
    write_batches(path, schema, &[batch])?;
    Ok(())
}
