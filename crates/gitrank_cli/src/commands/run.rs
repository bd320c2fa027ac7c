use std::process::ExitCode;

use gitrank::github::FetchSummary;
use gitrank::pipeline::{Pipeline, RunReport};

use crate::config::Config;

pub(crate) async fn handle_run(
    config: &Config,
    database_url: &str,
    skip_fetch: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let options = config.pipeline_options(database_url, skip_fetch);
    let pipeline = Pipeline::new(options)?;
    match pipeline.run().await {
        Ok(report) => {
            print_report(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(stage = %e.stage, error = %e.source, "Run failed");
            eprintln!("Run failed during {}: {}", e.stage, e.source);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_report(report: &RunReport) {
    println!("Run complete.");
    print_fetch("Repositories", report.repositories.as_ref());
    print_fetch("Accounts", report.accounts.as_ref());

    for delta in &report.deltas {
        if delta.snapshot_found {
            println!("  Growth {:>3}: {} updated", delta.window.to_string(), delta.updated);
        } else {
            println!("  Growth {:>3}: no baseline snapshot", delta.window.to_string());
        }
    }

    println!(
        "  Artifacts: {} written, {} archived, {} day(s) indexed",
        report.artifacts.len(),
        report.archived.len(),
        report.indexed_days
    );
    for (kind, error) in &report.artifact_failures {
        println!("  Artifact {kind} failed: {error}");
    }

    let size = report
        .store_size_bytes
        .map(|bytes| format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0)))
        .unwrap_or_else(|| "unknown size".to_string());
    println!(
        "  Store: {} repositories, {} accounts, {size}",
        report.repository_count, report.account_count
    );
}

fn print_fetch(label: &str, summary: Option<&FetchSummary>) {
    match summary {
        Some(s) => println!(
            "  {label}: {} fetched, {} stored, {} dropped over {} page(s) ({:?})",
            s.fetched, s.stored, s.dropped, s.pages, s.stop
        ),
        None => println!("  {label}: fetch skipped"),
    }
}
