// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Loader error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error while reading a source
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited text could not be parsed
    #[error("Malformed CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: arrow_schema::ArrowError,
    },

    /// Workbook could not be opened or a sheet could not be read
    #[error("Malformed workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    /// Workbook has no sheet with the configured label or index
    #[error("Workbook {} has no sheet {sheet}", path.display())]
    MissingSheet { path: PathBuf, sheet: String },

    /// Source has no header row
    #[error("Source {source_name} has no header row")]
    EmptySource { source_name: String },

    /// A column holds values of incompatible kinds
    #[error("Column '{column}' in {source_name} mixes {first} and {second} values")]
    AmbiguousColumn {
        source_name: String,
        column: String,
        first: &'static str,
        second: &'static str,
    },

    /// Derived or configured name is not a safe SQL identifier
    #[error("Invalid table name '{0}': expected lowercase letters, digits and '_', not starting with a digit, at most 63 bytes")]
    InvalidTableName(String),

    /// Configuration file problems
    #[error("Configuration error: {0}")]
    Config(String),

    /// DuckDB error
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
}

impl Error {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv<P: Into<PathBuf>>(path: P, source: arrow_schema::ArrowError) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn workbook<P: Into<PathBuf>, M: std::fmt::Display>(path: P, message: M) -> Self {
        Error::Workbook {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Error::Config(message.into())
    }

    /// True when DuckDB refused to create a table because it exists already
    pub fn is_duplicate_table(&self) -> bool {
        match self {
            Error::Database(err) => err.to_string().contains("already exists"),
            _ => false,
        }
    }
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, Error>;
