//! CLI module for Syllabus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Syllabus - Course Transcript Question Answering
///
/// A local-first CLI for indexing course transcripts and asking questions
/// about them, with answers cited down to the lesson.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a folder of course transcripts
    Ingest {
        /// Directory containing .txt course files
        dir: String,

        /// Clear the existing index first
        #[arg(long)]
        clear: bool,
    },

    /// Ask a single question about the indexed courses (use `chat` for follow-ups)
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Search course content without generating an answer
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List indexed courses
    Courses,

    /// Show a course outline
    Outline {
        /// Course name (partial names work)
        course: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_filters() {
        let cli = Cli::parse_from([
            "syllabus", "-vv", "search", "pipelines", "--course", "Intro to X", "--lesson", "2",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search {
                query,
                course,
                lesson,
                limit,
            } => {
                assert_eq!(query, "pipelines");
                assert_eq!(course.as_deref(), Some("Intro to X"));
                assert_eq!(lesson, Some(2));
                assert_eq!(limit, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ask_has_no_session_flag() {
        let cli = Cli::parse_from(["syllabus", "ask", "What is MCP?"]);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "What is MCP?"));

        assert!(Cli::try_parse_from(["syllabus", "ask", "What is MCP?", "--session", "abc"]).is_err());
    }

    #[test]
    fn test_parse_ingest_clear() {
        let cli = Cli::parse_from(["syllabus", "ingest", "./docs", "--clear"]);
        assert!(matches!(cli.command, Commands::Ingest { clear: true, .. }));
    }
}
