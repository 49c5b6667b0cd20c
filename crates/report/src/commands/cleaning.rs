// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::*;

use crate::common::{
    AGE_GROUPS, INCOME_GROUPS, ReportContext, format_count, order_by_category, section,
    write_distribution,
};

/// Before/after view of the cleaning done by the transformation layer.
///
/// Returns the number of sections that could not run.
pub fn cleaning_command<W: Write>(ctx: &ReportContext, out: &mut W) -> Result<usize> {
    info!("Running data cleaning summary");
    writeln!(out, "DATA CLEANING SUMMARY")?;

    let mut skipped = 0;

    writeln!(out, "\n1. LOAN ID FILTERING")?;
    if !section(out, "loan id filtering", |buf| loan_id_filtering(ctx, buf))? {
        skipped += 1;
    }

    writeln!(out, "\n2. GENDER STANDARDIZATION")?;
    if !section(out, "gender values", |buf| {
        value_counts(ctx, "gender", buf)
    })? {
        skipped += 1;
    }

    writeln!(out, "\n3. CITIZENSHIP STANDARDIZATION")?;
    if !section(out, "citizenship values", |buf| {
        value_counts(ctx, "citizenship", buf)
    })? {
        skipped += 1;
    }

    writeln!(out, "\n4. INCOME GROUPING")?;
    if !section(out, "income groups", |buf| {
        latest_groups(ctx, "income_group", INCOME_GROUPS, 25, buf)
    })? {
        skipped += 1;
    }

    writeln!(out, "\n5. AGE GROUPING")?;
    if !section(out, "age groups", |buf| {
        latest_groups(ctx, "age_group", AGE_GROUPS, 15, buf)
    })? {
        skipped += 1;
    }

    writeln!(out, "\nDATA CLEANING COMPLETE")?;
    Ok(skipped)
}

fn loan_id_filtering(ctx: &ReportContext, out: &mut Vec<u8>) -> Result<()> {
    let raw = ctx.count("SELECT COUNT(*) FROM customer_sales")?;
    // NA spellings were already loaded as NULL
    let with_id = ctx.count("SELECT COUNT(*) FROM customer_sales WHERE \"Loan Id\" IS NOT NULL")?;
    let staged = ctx.count(&format!(
        "SELECT COUNT(*) FROM {}",
        ctx.staging("stg_customers")
    ))?;

    writeln!(out, "Raw customer_sales rows: {}", format_count(raw))?;
    writeln!(out, "After filtering null/NA IDs: {}", format_count(with_id))?;
    writeln!(out, "Final staging table: {} valid records", format_count(staged))?;
    writeln!(out, "Records removed: {}", format_count(raw - staged))?;
    Ok(())
}

/// Distinct loans per value of a standardized demographic column
fn value_counts(ctx: &ReportContext, column: &str, out: &mut Vec<u8>) -> Result<()> {
    let sql = format!(
        "SELECT {column}, COUNT(DISTINCT loan_id) AS loans
         FROM {}
         GROUP BY {column}
         ORDER BY loans DESC, {column}",
        ctx.staging("stg_customer_demographics")
    );
    writeln!(out, "Final standardized values:")?;
    for (value, loans) in ctx.pairs(&sql)? {
        writeln!(out, "  {value:15} {:>8} unique loans", format_count(loans))?;
    }
    Ok(())
}

/// Known buckets of a grouping column in the latest snapshot, in bucket order
fn latest_groups(
    ctx: &ReportContext,
    column: &str,
    order: &[&str],
    width: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let table = ctx.intermediate("int_credit_with_customer");
    let sql = format!(
        "SELECT {column}, COUNT(DISTINCT loan_id)
         FROM {table}
         WHERE snapshot_date = (SELECT MAX(snapshot_date) FROM {table})
           AND {column} NOT IN ('Unknown', 'None')
         GROUP BY {column}
         ORDER BY {}, {column}",
        order_by_category(column, order)
    );

    writeln!(out, "Ranges:")?;
    for bucket in order.iter().filter(|b| **b != "Unknown") {
        writeln!(out, "  - {bucket}")?;
    }
    writeln!(out, "\nDistribution:")?;
    write_distribution(out, &ctx.pairs(&sql)?, width, "loans")
}
