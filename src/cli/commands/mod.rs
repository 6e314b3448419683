//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod ingest;
mod outline;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::run_courses;
pub use ingest::run_ingest;
pub use outline::run_outline;
pub use search::run_search;

use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use tracing::warn;

/// Shown instead of a raw error when a query cannot be answered.
pub(crate) const QUERY_APOLOGY: &str =
    "Sorry, something went wrong while answering. Please try again.";

/// Ingest the configured course folder when `ingest_on_start` is set.
///
/// Already indexed courses are skipped, so this is cheap after the first run.
pub(crate) async fn ingest_on_start(orchestrator: &Orchestrator) {
    let settings = orchestrator.settings();
    if !settings.documents.ingest_on_start {
        return;
    }

    let docs_dir = settings.docs_dir();
    if !docs_dir.is_dir() {
        return;
    }

    let spinner = Output::spinner("Checking course documents...");
    let result = orchestrator.ingest_folder(&docs_dir, false).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) if report.courses_added > 0 => Output::info(&format!(
            "Indexed {} new courses ({} chunks)",
            report.courses_added, report.chunks_added
        )),
        Ok(_) => {}
        Err(e) => warn!("Startup ingestion failed: {}", e),
    }
}
