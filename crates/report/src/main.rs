// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loader::PipelineConfig;
use report::ReportContext;
use report::commands::{cleaning_command, export_command, test_command, verify_command};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "pipeline-utils")]
/// Data quality, export and automation reports for the credit pipeline
struct Cli {
    /// Configuration file (defaults to $CREDIT_PIPELINE_CONFIG, then ./pipeline.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Report to run; verify, export and test run in sequence when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate cleaned data and demographic coverage
    Verify,
    /// Export analytical tables to CSV
    Export,
    /// Verify that every raw snapshot table reached staging
    Test,
    /// Summarize the cleaning applied by the transformation layer
    Cleaning,
}

fn main() -> Result<()> {
    diagnostics::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage problems are reported but do not change the exit status
            err.print()?;
            return Ok(());
        }
    };

    let config = PipelineConfig::discover(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // Scoped so the read-only connection is released on every path
    {
        let ctx = ReportContext::open(&config)?;
        match cli.command {
            Some(Commands::Verify) => {
                verify_command(&ctx, &mut out)?;
            }
            Some(Commands::Export) => {
                export_command(&ctx, &mut out)?;
            }
            Some(Commands::Test) => {
                test_command(&ctx, &mut out)?;
            }
            Some(Commands::Cleaning) => {
                cleaning_command(&ctx, &mut out)?;
            }
            None => {
                writeln!(out, "\nRunning all pipeline utilities\n")?;
                verify_command(&ctx, &mut out)?;
                writeln!(out, "\n")?;
                export_command(&ctx, &mut out)?;
                writeln!(out, "\n")?;
                test_command(&ctx, &mut out)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
