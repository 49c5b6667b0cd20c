// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Pipeline configuration
//!
//! Every field has a default, so the binaries run with no configuration file
//! at all against the conventional `Data/Raw` layout.

use crate::naming::TableName;
use crate::pattern::FilePattern;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "CREDIT_PIPELINE_CONFIG";

/// Configuration file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.yaml";

/// What to do with a column whose values have incompatible kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixedColumns {
    /// Fail the load, naming the file and column
    #[default]
    Reject,
    /// Load the column as VARCHAR holding the original cell text
    Text,
}

/// A sheet selected by label or by zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetRef::Index(i) => write!(f, "#{i}"),
            SheetRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// One sheet and the table it loads into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSource {
    pub sheet: SheetRef,
    pub table: String,
}

/// A workbook at a fixed path under the raw data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSource {
    pub file: String,
    pub sheets: Vec<SheetSource>,
}

/// Schemas the external transformation layer writes into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaNames {
    pub staging: String,
    pub intermediate: String,
    pub marts: String,
}

impl Default for SchemaNames {
    fn default() -> Self {
        Self {
            staging: "main_staging".to_string(),
            intermediate: "main_intermediate".to_string(),
            marts: "main_marts".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the source CSV and workbook files
    pub raw_data_dir: PathBuf,
    /// DuckDB database file
    pub database_path: PathBuf,
    /// Directory receiving exported CSV files
    pub processed_dir: PathBuf,
    /// File name pattern of dated snapshot CSVs
    pub snapshot_pattern: String,
    pub mixed_columns: MixedColumns,
    pub schemas: SchemaNames,
    /// Workbooks loaded after the snapshot CSVs, in order
    pub workbooks: Vec<WorkbookSource>,
}

fn sheet(label: &str, table: &str) -> SheetSource {
    SheetSource {
        sheet: SheetRef::Name(label.to_string()),
        table: table.to_string(),
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("Data/Raw"),
            database_path: PathBuf::from("duckdb/mophones.duckdb"),
            processed_dir: PathBuf::from("Data/Processed"),
            snapshot_pattern: "Credit Data - *.csv".to_string(),
            mixed_columns: MixedColumns::default(),
            schemas: SchemaNames::default(),
            workbooks: vec![
                WorkbookSource {
                    file: "Sales and Customer Data.xlsx".to_string(),
                    sheets: vec![
                        sheet("Sales Details", "customer_sales"),
                        sheet("Gender", "customer_gender"),
                        sheet("DOB", "customer_dob"),
                        sheet("Income Level", "customer_income"),
                    ],
                },
                WorkbookSource {
                    file: "NPS Data.xlsx".to_string(),
                    sheets: vec![SheetSource {
                        sheet: SheetRef::Index(0),
                        table: "nps_data".to_string(),
                    }],
                },
            ],
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml_ng::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Config(message) => Error::config(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    /// Resolve the configuration: explicit path, then `CREDIT_PIPELINE_CONFIG`,
    /// then `pipeline.yaml` in the working directory, then defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        let pattern = FilePattern::new(&self.snapshot_pattern)?;
        if !pattern.has_wildcard() {
            return Err(Error::config(format!(
                "snapshot_pattern '{}' must contain a '*' wildcard",
                self.snapshot_pattern
            )));
        }

        for schema in [
            &self.schemas.staging,
            &self.schemas.intermediate,
            &self.schemas.marts,
        ] {
            TableName::parse(schema)?;
        }

        let mut tables = BTreeSet::new();
        for workbook in &self.workbooks {
            if workbook.file.is_empty() {
                return Err(Error::config("workbook file cannot be empty"));
            }
            if workbook.sheets.is_empty() {
                return Err(Error::config(format!(
                    "workbook '{}' lists no sheets",
                    workbook.file
                )));
            }
            for sheet in &workbook.sheets {
                let table = TableName::parse(&sheet.table)?;
                if table.is_snapshot() {
                    return Err(Error::config(format!(
                        "sheet table '{table}' collides with the snapshot table naming"
                    )));
                }
                if !tables.insert(table) {
                    return Err(Error::config(format!(
                        "table '{}' is configured more than once",
                        sheet.table
                    )));
                }
            }
        }

        Ok(())
    }

    /// Compiled snapshot pattern. Only fails on a config that skipped validation.
    pub fn snapshot_pattern(&self) -> Result<FilePattern> {
        FilePattern::new(&self.snapshot_pattern)
    }

    /// Table names loaded from workbooks, in configuration order
    pub fn workbook_tables(&self) -> impl Iterator<Item = &str> {
        self.workbooks
            .iter()
            .flat_map(|w| w.sheets.iter().map(|s| s.table.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.workbook_tables().collect::<Vec<_>>(),
            vec![
                "customer_sales",
                "customer_gender",
                "customer_dob",
                "customer_income",
                "nps_data"
            ]
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml(
            "raw_data_dir: /data/raw\nmixed_columns: text\n",
        )
        .unwrap();
        assert_eq!(config.raw_data_dir, PathBuf::from("/data/raw"));
        assert_eq!(config.mixed_columns, MixedColumns::Text);
        assert_eq!(config.snapshot_pattern, "Credit Data - *.csv");
        assert_eq!(config.workbooks.len(), 2);
    }

    #[test]
    fn test_sheet_refs_by_name_and_index() {
        let config = PipelineConfig::from_yaml(
            r#"
workbooks:
  - file: Book.xlsx
    sheets:
      - { sheet: Summary, table: book_summary }
      - { sheet: 2, table: book_third }
"#,
        )
        .unwrap();
        let sheets = &config.workbooks[0].sheets;
        assert_eq!(sheets[0].sheet, SheetRef::Name("Summary".to_string()));
        assert_eq!(sheets[1].sheet, SheetRef::Index(2));
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        let err = PipelineConfig::from_yaml(
            r#"
workbooks:
  - file: Book.xlsx
    sheets:
      - { sheet: Summary, table: "x; drop table y" }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid table name"));
    }

    #[test]
    fn test_rejects_duplicate_tables() {
        let err = PipelineConfig::from_yaml(
            r#"
workbooks:
  - file: A.xlsx
    sheets: [ { sheet: 0, table: shared } ]
  - file: B.xlsx
    sheets: [ { sheet: 0, table: shared } ]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_pattern_without_wildcard() {
        assert!(PipelineConfig::from_yaml("snapshot_pattern: fixed.csv\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(PipelineConfig::from_yaml("mixed_columns: coerce\n").is_err());
    }
}
