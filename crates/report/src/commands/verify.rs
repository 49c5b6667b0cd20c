// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::*;

use crate::common::{
    AGE_GROUPS, ReportContext, format_count, format_percent, order_by_category, section,
    write_distribution,
};

/// Print data quality checks over the staging and intermediate layers.
///
/// Returns the number of sections that could not run.
pub fn verify_command<W: Write>(ctx: &ReportContext, out: &mut W) -> Result<usize> {
    info!("Running data quality verification");
    writeln!(out, "DATA QUALITY VERIFICATION")?;

    let mut skipped = 0;

    writeln!(out, "\n1. Staging Models (After Data Cleaning):")?;
    if !section(out, "staging row counts", |buf| staging_counts(ctx, buf))? {
        skipped += 1;
    }

    writeln!(out, "\n2. Demographic Coverage:")?;
    if !section(out, "demographic coverage", |buf| demographic_coverage(ctx, buf))? {
        skipped += 1;
    }

    writeln!(out, "\n3. Enrichment Coverage (Latest Snapshot):")?;
    if !section(out, "enrichment coverage", |buf| enrichment_coverage(ctx, buf))? {
        skipped += 1;
    }

    writeln!(out, "\n4. Age Group Distribution:")?;
    if !section(out, "age group distribution", |buf| age_distribution(ctx, buf))? {
        skipped += 1;
    }

    Ok(skipped)
}

fn staging_counts(ctx: &ReportContext, out: &mut Vec<u8>) -> Result<()> {
    let customers = ctx.count(&format!(
        "SELECT COUNT(*) FROM {}",
        ctx.staging("stg_customers")
    ))?;

    // The raw sales sheet is only there when the workbook was loaded
    let raw = ctx.count(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = 'customer_sales'",
    )?;
    if raw > 0 {
        let raw_rows = ctx.count("SELECT COUNT(*) FROM customer_sales")?;
        writeln!(
            out,
            "stg_customers: {} rows (cleaned from {})",
            format_count(customers),
            format_count(raw_rows)
        )?;
    } else {
        writeln!(out, "stg_customers: {} rows", format_count(customers))?;
    }

    let demographics = ctx.count(&format!(
        "SELECT COUNT(DISTINCT loan_id) FROM {}",
        ctx.staging("stg_customer_demographics")
    ))?;
    writeln!(
        out,
        "stg_customer_demographics: {} unique loan_ids",
        format_count(demographics)
    )?;
    Ok(())
}

fn demographic_coverage(ctx: &ReportContext, out: &mut Vec<u8>) -> Result<()> {
    let sql = format!(
        "SELECT
            COUNT(DISTINCT loan_id),
            COUNT(DISTINCT CASE WHEN date_of_birth IS NOT NULL THEN loan_id END),
            COUNT(DISTINCT CASE WHEN gender IS NOT NULL THEN loan_id END),
            COUNT(DISTINCT CASE WHEN avg_monthly_income IS NOT NULL THEN loan_id END)
         FROM {}",
        ctx.staging("stg_customer_demographics")
    );
    let (total, dob, gender, income): (i64, i64, i64, i64) =
        ctx.conn()
            .query_row(&sql, [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;

    writeln!(out, "Total unique loans: {}", format_count(total))?;
    for (label, count) in [("DOB", dob), ("Gender", gender), ("Income", income)] {
        writeln!(
            out,
            "With {label}: {} ({})",
            format_count(count),
            format_percent(count, total)
        )?;
    }
    Ok(())
}

fn enrichment_coverage(ctx: &ReportContext, out: &mut Vec<u8>) -> Result<()> {
    let table = ctx.intermediate("int_credit_with_customer");
    let sql = format!(
        "SELECT
            COUNT(DISTINCT loan_id),
            COUNT(DISTINCT CASE WHEN age_group NOT IN ('Unknown', 'None') THEN loan_id END),
            COUNT(DISTINCT CASE WHEN income_group NOT IN ('Unknown', 'None') THEN loan_id END)
         FROM {table}
         WHERE snapshot_date = (SELECT MAX(snapshot_date) FROM {table})"
    );
    let (total, age, income): (i64, i64, i64) = ctx
        .conn()
        .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    writeln!(out, "Total loans in latest snapshot: {}", format_count(total))?;
    writeln!(
        out,
        "With valid age group: {} ({})",
        format_count(age),
        format_percent(age, total)
    )?;
    writeln!(
        out,
        "With valid income group: {} ({})",
        format_count(income),
        format_percent(income, total)
    )?;
    Ok(())
}

fn age_distribution(ctx: &ReportContext, out: &mut Vec<u8>) -> Result<()> {
    let table = ctx.intermediate("int_credit_with_customer");
    let sql = format!(
        "SELECT age_group, COUNT(DISTINCT loan_id)
         FROM {table}
         WHERE snapshot_date = (SELECT MAX(snapshot_date) FROM {table})
         GROUP BY age_group
         ORDER BY {}, age_group",
        order_by_category("age_group", AGE_GROUPS)
    );
    let rows = ctx.pairs(&sql)?;
    write_distribution(out, &rows, 10, "loans")
}
