//! Courses command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let analytics = orchestrator.course_analytics().await?;
    if analytics.total_courses == 0 {
        Output::info("No courses indexed yet. Use 'syllabus ingest <dir>' to add some.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
    println!();
    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    let chunks = orchestrator.vector_store().chunk_count().await?;
    println!();
    Output::kv("Total chunks", &chunks.to_string());

    Ok(())
}
