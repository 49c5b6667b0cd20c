// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Table naming rules
//!
//! Snapshot files carry their date in the name ("Credit Data - 05-03-2026.csv")
//! and map to `credit_data_20260305`. Anything else maps to its lowercased
//! stem with spaces and hyphens turned into underscores. Derived names must
//! pass [`TableName::parse`] before they reach any SQL text.

use crate::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Prefix shared by every dated snapshot table
pub const SNAPSHOT_TABLE_PREFIX: &str = "credit_data_";

/// Longest identifier accepted, in bytes
const MAX_IDENTIFIER_LEN: usize = 63;

static EMBEDDED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("valid date regex"));

static SAFE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid identifier regex"));

/// File name without its final extension
fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Extract the first `DD-MM-YYYY` date in a file stem.
///
/// Digit runs that are not a calendar date (e.g. 31-02-2026) are ignored.
pub fn embedded_date(file_name: &str) -> Option<NaiveDate> {
    let caps = EMBEDDED_DATE.captures(file_stem(file_name))?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Derive the table name for a delimited-text source from its file name.
///
/// Pure function of the name: the same file maps to the same table on every
/// run and every machine.
pub fn derive_table_name(file_name: &str) -> String {
    match embedded_date(file_name) {
        Some(date) => format!("{SNAPSHOT_TABLE_PREFIX}{}", date.format("%Y%m%d")),
        None => file_stem(file_name)
            .to_lowercase()
            .replace([' ', '-'], "_"),
    }
}

/// A table name that is safe to interpolate into DDL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    pub fn parse<S: AsRef<str>>(name: S) -> Result<Self> {
        let name = name.as_ref();
        if name.len() > MAX_IDENTIFIER_LEN || !SAFE_IDENTIFIER.is_match(name) {
            return Err(Error::InvalidTableName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for dated snapshot tables (`credit_data_YYYYMMDD`)
    pub fn is_snapshot(&self) -> bool {
        self.0
            .strip_prefix(SNAPSHOT_TABLE_PREFIX)
            .is_some_and(|rest| rest.len() == 8 && rest.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Quote an arbitrary column name as a SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dated_snapshot_names() {
        assert_eq!(
            derive_table_name("Credit Data - 05-03-2026.csv"),
            "credit_data_20260305"
        );
        assert_eq!(
            derive_table_name("Credit Data - 01-06-2026.csv"),
            "credit_data_20260601"
        );
        assert_eq!(
            embedded_date("Credit Data - 05-03-2026.csv"),
            NaiveDate::from_ymd_opt(2026, 3, 5)
        );
    }

    #[test]
    fn test_undated_names() {
        assert_eq!(derive_table_name("Some Other File.csv"), "some_other_file");
        assert_eq!(derive_table_name("Loan-Book Extract.csv"), "loan_book_extract");
        assert_eq!(embedded_date("Some Other File.csv"), None);
    }

    #[test]
    fn test_invalid_calendar_date_falls_back_to_stem() {
        assert_eq!(embedded_date("Credit Data - 31-02-2026.csv"), None);
        assert_eq!(
            derive_table_name("Credit Data - 31-02-2026.csv"),
            "credit_data___31_02_2026"
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let name = "Credit Data - 30-09-2025.csv";
        assert_eq!(derive_table_name(name), derive_table_name(name));
    }

    #[test]
    fn test_table_name_allow_list() {
        assert!(TableName::parse("credit_data_20260305").is_ok());
        assert!(TableName::parse("_staging").is_ok());
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("9lives").is_err());
        assert!(TableName::parse("Customer").is_err());
        assert!(TableName::parse("credit_(copy)").is_err());
        assert!(TableName::parse("x; drop table y").is_err());
        assert!(TableName::parse("a".repeat(64)).is_err());
        assert!(TableName::parse("a".repeat(63)).is_ok());
    }

    #[test]
    fn test_snapshot_detection() {
        assert!(TableName::parse("credit_data_20250101").unwrap().is_snapshot());
        assert!(!TableName::parse("credit_data_summary").unwrap().is_snapshot());
        assert!(!TableName::parse("customer_sales").unwrap().is_snapshot());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Loan Id"), "\"Loan Id\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
