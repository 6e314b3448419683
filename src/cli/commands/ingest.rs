//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: &str, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let dir = Settings::expand_path(dir);
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {}...", dir.display()));
    let result = orchestrator.ingest_folder(&dir, clear).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Indexed {} courses ({} chunks)",
        report.courses_added, report.chunks_added
    ));
    if report.skipped > 0 {
        Output::kv("Already indexed", &report.skipped.to_string());
    }

    if !report.failures.is_empty() {
        Output::warning(&format!("{} files failed:", report.failures.len()));
        for failure in &report.failures {
            Output::list_item(&format!("{}: {}", failure.path.display(), failure.reason));
        }
    }

    Ok(())
}
