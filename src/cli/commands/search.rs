//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SyllabusError;
use crate::orchestrator::Orchestrator;
use crate::retrieval::SearchOutcome;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.retriever().search(query, course, lesson, limit).await;
    spinner.finish_and_clear();

    match result {
        Ok(SearchOutcome::CourseNotFound(name)) => {
            Output::warning(&SyllabusError::Resolution(name).to_string());
        }
        Ok(SearchOutcome::Results(hits)) if hits.is_empty() => {
            Output::warning("No results found matching your query.");
        }
        Ok(SearchOutcome::Results(hits)) => {
            Output::success(&format!("Found {} results", hits.len()));
            for hit in &hits {
                Output::search_hit(hit);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
