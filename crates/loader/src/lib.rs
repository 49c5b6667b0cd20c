// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Incremental loader for credit snapshot files.
//!
//! Dated snapshot CSVs and a fixed set of workbook sheets are each
//! materialized as one DuckDB table. A table that already exists is never
//! rewritten, so running the loader again only picks up new files.

pub mod catalog;
pub mod config;
pub mod csv;
pub mod error;
pub mod infer;
pub mod naming;
pub mod pattern;
pub mod record;
pub mod run;
pub mod source;
pub mod workbook;

pub use catalog::{Catalog, CreateOutcome, open_database};
pub use config::{MixedColumns, PipelineConfig};
pub use error::{Error, Result};
pub use naming::{TableName, derive_table_name};
pub use run::{LoadOutcome, RunReport, SourceReport, load, run, run_with};
pub use source::{SourceFile, discover};
