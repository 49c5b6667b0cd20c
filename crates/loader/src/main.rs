// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use diagnostics::*;
use loader::{Catalog, PipelineConfig, open_database};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "load-snapshots")]
/// Load new credit snapshot files into the analytical database
struct Cli {
    /// Configuration file (defaults to $CREDIT_PIPELINE_CONFIG, then ./pipeline.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    diagnostics::init();
    let cli = Cli::parse();

    let config = PipelineConfig::discover(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    info!(
        "Loading snapshots from {raw} into {db}",
        raw: config.raw_data_dir.display().to_string(),
        db: config.database_path.display().to_string()
    );

    // Scoped so the database is released before the process exits
    let report = {
        let mut conn = open_database(&config.database_path)
            .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

        let report = loader::run_with(&config, &mut conn, &mut |entry| println!("{entry}"))
            .context("Load run failed")?;

        println!("\nTables in database:");
        let summary = Catalog::new(&mut conn)
            .summary()
            .context("Failed to summarize tables")?;
        for (table, rows) in summary {
            println!("  - {table}: {rows} rows");
        }
        report
    };

    println!(
        "\nLoaded {}, skipped {}, missing {}, failed {}",
        report.loaded(),
        report.skipped(),
        report.missing(),
        report.failed()
    );

    if !report.is_success() {
        bail!("{} source(s) failed to load", report.failed());
    }
    Ok(())
}
