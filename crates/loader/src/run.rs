// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Loader orchestration
//!
//! Every source is a unit of work: it is skipped when its table exists,
//! loaded otherwise, and a failure is recorded without stopping the run.

use crate::catalog::{Catalog, CreateOutcome};
use crate::config::{MixedColumns, PipelineConfig, WorkbookSource};
use crate::csv::read_csv;
use crate::infer::infer_schema;
use crate::naming::TableName;
use crate::record::RecordSet;
use crate::source::{SourceFile, SourceKind, discover};
use crate::workbook::Workbook;
use crate::Result;
use diagnostics::*;
use duckdb::Connection;
use std::path::Path;

/// Terminal state of one source
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { rows: usize },
    /// Table already present; nothing was read
    Skipped,
    /// Expected workbook file is absent
    MissingSource,
    Failed { error: String },
}

/// Outcome of one source, with the table it maps to when known
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub table: Option<String>,
    pub outcome: LoadOutcome,
}

impl std::fmt::Display for SourceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.as_deref().unwrap_or("?");
        match &self.outcome {
            LoadOutcome::Loaded { rows } => write!(
                f,
                "[OK]   Loaded {} -> table `{table}` ({rows} rows)",
                self.source
            ),
            LoadOutcome::Skipped => write!(
                f,
                "[SKIP] Table `{table}` already exists, skipping {}",
                self.source
            ),
            LoadOutcome::MissingSource => write!(f, "[WARN] {} not found", self.source),
            LoadOutcome::Failed { error } => {
                write!(f, "[FAIL] {} -> table `{table}`: {error}", self.source)
            }
        }
    }
}

/// Outcomes of a whole run, in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&LoadOutcome) -> bool) -> usize {
        self.sources.iter().filter(|s| pred(&s.outcome)).count()
    }

    pub fn loaded(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Loaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Skipped))
    }

    pub fn missing(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::MissingSource))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Infer column types and create the table from an in-memory record set
pub fn load_records(
    catalog: &mut Catalog<'_>,
    name: &TableName,
    records: &RecordSet,
    policy: MixedColumns,
) -> Result<CreateOutcome> {
    let columns = infer_schema(records, policy)?;
    catalog.create_table(name, &columns, records)
}

/// Read one source completely and materialize it as table `name`.
///
/// Callers check [`Catalog::table_exists`] first; a table created in the
/// meantime by another writer comes back as [`CreateOutcome::AlreadyExists`].
pub fn load(
    catalog: &mut Catalog<'_>,
    source: &SourceFile,
    name: &TableName,
    policy: MixedColumns,
) -> Result<CreateOutcome> {
    let records = match &source.kind {
        SourceKind::Csv => read_csv(&source.path)?,
        SourceKind::Sheet(sheet) => Workbook::open(&source.path)?.read_sheet(sheet)?,
    };
    load_records(catalog, name, &records, policy)
}

fn outcome_of(result: Result<CreateOutcome>) -> LoadOutcome {
    match result {
        Ok(CreateOutcome::Created(rows)) => LoadOutcome::Loaded { rows },
        Ok(CreateOutcome::AlreadyExists) => LoadOutcome::Skipped,
        Err(e) => LoadOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Validate the table name and check the catalog. `Ok(None)` means the
/// table exists and the source is skipped.
fn pending_table(catalog: &Catalog<'_>, table: &str) -> Result<Option<TableName>> {
    let name = TableName::parse(table)?;
    if catalog.table_exists(&name)? {
        return Ok(None);
    }
    Ok(Some(name))
}

fn log_outcome(report: &SourceReport) {
    let source = report.source.as_str();
    let table = report.table.as_deref().unwrap_or_default();
    match &report.outcome {
        LoadOutcome::Loaded { rows } => {
            info!(
                "Loaded {source} into {table} ({rows} rows)",
                source: source,
                table: table,
                rows: *rows
            )
        }
        LoadOutcome::Skipped => {
            info!("Skipped {source}: {table} already exists", source: source, table: table)
        }
        LoadOutcome::MissingSource => warn!("Source {source} not found", source: source),
        LoadOutcome::Failed { error } => {
            error!(
                "Failed to load {source} into {table}: {error}",
                source: source,
                table: table,
                error: error.as_str()
            )
        }
    }
}

struct Recorder<'a> {
    report: RunReport,
    observer: &'a mut dyn FnMut(&SourceReport),
}

impl Recorder<'_> {
    fn record(&mut self, source: String, table: Option<String>, outcome: LoadOutcome) {
        let entry = SourceReport {
            source,
            table,
            outcome,
        };
        log_outcome(&entry);
        (self.observer)(&entry);
        self.report.sources.push(entry);
    }
}

fn load_csv_source(
    catalog: &mut Catalog<'_>,
    source: &SourceFile,
    policy: MixedColumns,
) -> LoadOutcome {
    let table = source.derived_table_name();
    match pending_table(catalog, &table) {
        Ok(Some(name)) => outcome_of(load(catalog, source, &name, policy)),
        Ok(None) => LoadOutcome::Skipped,
        Err(e) => LoadOutcome::Failed {
            error: e.to_string(),
        },
    }
}

fn load_workbook(
    catalog: &mut Catalog<'_>,
    raw_data_dir: &Path,
    workbook: &WorkbookSource,
    policy: MixedColumns,
    recorder: &mut Recorder<'_>,
) {
    let path = raw_data_dir.join(&workbook.file);
    if !path.is_file() {
        recorder.record(workbook.file.clone(), None, LoadOutcome::MissingSource);
        return;
    }

    // Decide per sheet first so the workbook is only opened when needed
    let mut outcomes: Vec<Option<LoadOutcome>> = Vec::with_capacity(workbook.sheets.len());
    let mut pending = Vec::new();
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        match pending_table(catalog, &sheet.table) {
            Ok(Some(name)) => {
                outcomes.push(None);
                pending.push((index, name));
            }
            Ok(None) => outcomes.push(Some(LoadOutcome::Skipped)),
            Err(e) => outcomes.push(Some(LoadOutcome::Failed {
                error: e.to_string(),
            })),
        }
    }

    if !pending.is_empty() {
        match Workbook::open(&path) {
            Ok(mut book) => {
                for (index, name) in pending {
                    let result = book
                        .read_sheet(&workbook.sheets[index].sheet)
                        .and_then(|records| load_records(catalog, &name, &records, policy));
                    outcomes[index] = Some(outcome_of(result));
                }
            }
            Err(e) => {
                let error = e.to_string();
                for (index, _) in pending {
                    outcomes[index] = Some(LoadOutcome::Failed {
                        error: error.clone(),
                    });
                }
            }
        }
    }

    for (sheet, outcome) in workbook.sheets.iter().zip(outcomes) {
        let source = SourceFile::sheet(path.clone(), sheet.sheet.clone());
        let outcome = outcome.unwrap_or(LoadOutcome::Skipped);
        recorder.record(source.logical_name, Some(sheet.table.clone()), outcome);
    }
}

/// Load every recognized source, calling `observer` as each one finishes.
///
/// Order: snapshot CSVs matching the configured pattern, then each
/// configured workbook. Errors that prevent discovery itself (an unreadable
/// raw data directory) end the run; everything else is recorded per source.
pub fn run_with(
    config: &PipelineConfig,
    conn: &mut Connection,
    observer: &mut dyn FnMut(&SourceReport),
) -> Result<RunReport> {
    let mut catalog = Catalog::new(conn);
    let mut recorder = Recorder {
        report: RunReport::default(),
        observer,
    };

    let pattern = config.snapshot_pattern()?;
    for source in discover(&config.raw_data_dir, &pattern)? {
        let outcome = load_csv_source(&mut catalog, &source, config.mixed_columns);
        recorder.record(
            source.logical_name.clone(),
            Some(source.derived_table_name()),
            outcome,
        );
    }

    for workbook in &config.workbooks {
        load_workbook(
            &mut catalog,
            &config.raw_data_dir,
            workbook,
            config.mixed_columns,
            &mut recorder,
        );
    }

    let report = recorder.report;
    info!(
        "Run finished: {loaded} loaded, {skipped} skipped, {failed} failed",
        loaded: report.loaded(),
        skipped: report.skipped(),
        failed: report.failed()
    );
    Ok(report)
}

/// Load every recognized source. See [`run_with`].
pub fn run(config: &PipelineConfig, conn: &mut Connection) -> Result<RunReport> {
    run_with(config, conn, &mut |_| {})
}
