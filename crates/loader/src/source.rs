// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Source discovery
//!
//! A source is one delimited file or one sheet of a workbook. Discovery only
//! looks at file names; contents are read later, and only for sources whose
//! table does not exist yet.

use crate::config::SheetRef;
use crate::naming::{derive_table_name, embedded_date};
use crate::pattern::FilePattern;
use crate::{Error, Result};
use chrono::NaiveDate;
use diagnostics::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Delimited text with a header row
    Csv,
    /// One sheet of a workbook
    Sheet(SheetRef),
}

/// One data snapshot on disk
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name, or "<file> [<sheet>]" for workbook sheets
    pub logical_name: String,
    pub embedded_date: Option<NaiveDate>,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn csv(path: PathBuf) -> Self {
        let file_name = file_name(&path);
        Self {
            embedded_date: embedded_date(&file_name),
            logical_name: file_name,
            path,
            kind: SourceKind::Csv,
        }
    }

    pub fn sheet(path: PathBuf, sheet: SheetRef) -> Self {
        let logical_name = format!("{} [{sheet}]", file_name(&path));
        Self {
            embedded_date: None,
            logical_name,
            path,
            kind: SourceKind::Sheet(sheet),
        }
    }

    /// Table name derived from the file name. Sheets use their configured
    /// mapping instead, see [`crate::run`].
    pub fn derived_table_name(&self) -> String {
        derive_table_name(&file_name(&self.path))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// List regular files in `directory` whose name matches `pattern`.
///
/// Results are sorted by file name. A missing directory is not an error: it
/// yields no sources.
pub fn discover(directory: &Path, pattern: &FilePattern) -> Result<Vec<SourceFile>> {
    let dir_str = directory.display().to_string();
    if !directory.is_dir() {
        warn!("Raw data directory {dir} does not exist", dir: dir_str.as_str());
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(|e| Error::io(directory, e))? {
        let entry = entry.map_err(|e| Error::io(directory, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if pattern.matches(&name) {
            sources.push(SourceFile::csv(path));
        }
    }

    sources.sort_by(|a, b| a.logical_name.cmp(&b.logical_name));

    debug!(
        "Discovered {found} files matching {pattern} in {dir}",
        found: sources.len(),
        pattern: pattern.to_string(),
        dir: dir_str.as_str()
    );
    Ok(sources)
}
