//! Ask command implementation.

use super::{ingest_on_start, QUERY_APOLOGY};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use tracing::error;

/// Run the ask command. Each run answers in a fresh session.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    ingest_on_start(&orchestrator).await;

    let spinner = Output::spinner("Thinking...");
    let result = orchestrator.query(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
        }
        Err(e) => {
            error!("Query failed: {}", e);
            Output::error(QUERY_APOLOGY);
        }
    }

    Ok(())
}
