//! Outline command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SyllabusError;
use crate::orchestrator::Orchestrator;
use crate::tools::format_outline;
use anyhow::Result;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.retriever().outline(course).await? {
        Some(course) => println!("\n{}", format_outline(&course)),
        None => Output::warning(&SyllabusError::Resolution(course.to_string()).to_string()),
    }

    Ok(())
}
