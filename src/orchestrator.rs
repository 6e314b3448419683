//! Pipeline orchestrator for Syllabus.
//!
//! Wires the index, retriever, tools, agent and sessions together, and
//! coordinates ingestion from course files through to indexed chunks.

use crate::agent::Agent;
use crate::chunking::{ChunkingConfig, SentenceChunker};
use crate::config::{Prompts, Settings};
use crate::document::{list_course_files, load_course_file, Course, CourseDocument};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, SyllabusError};
use crate::generation::{ChatModel, OpenAIChatModel};
use crate::retrieval::{create_resolver, Retriever};
use crate::session::SessionManager;
use crate::tools::{CourseOutlineTool, SearchCourseContentTool, Source, ToolRegistry};
use crate::vector_store::{create_vector_store, CatalogEntry, IndexedChunk, VectorStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the Syllabus pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    retriever: Arc<Retriever>,
    chunker: SentenceChunker,
    agent: Agent,
    sessions: SessionManager,
}

impl Orchestrator {
    /// Create a new orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let embedder = create_embedder(&settings);
        let vector_store = create_vector_store(&settings)?;

        info!(
            "Using model {} with {} embeddings",
            settings.llm.model, settings.embedding.provider
        );
        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(&settings.llm));

        Ok(Self::with_components(
            settings,
            prompts,
            embedder,
            vector_store,
            model,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let resolver = create_resolver(&settings.retrieval, vector_store.clone(), embedder.clone());
        let retriever = Arc::new(
            Retriever::new(vector_store.clone(), embedder.clone(), resolver)
                .with_max_results(settings.retrieval.max_results),
        );

        let registry = ToolRegistry::new()
            .with_tool(Arc::new(SearchCourseContentTool::new(retriever.clone())))
            .with_tool(Arc::new(CourseOutlineTool::new(retriever.clone())));

        let agent = Agent::new(model, Arc::new(registry))
            .with_prompts(prompts.agent)
            .with_max_rounds(settings.agent.max_rounds)
            .with_closing(settings.agent.closing);

        let chunker = SentenceChunker::new(ChunkingConfig::from(&settings.chunking));
        let sessions = SessionManager::new(settings.history_turns());

        Self {
            settings,
            embedder,
            vector_store,
            retriever,
            chunker,
            agent,
            sessions,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the retriever used by the built-in tools.
    pub fn retriever(&self) -> Arc<Retriever> {
        self.retriever.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Conversation sessions.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Ingest every course file in a directory.
    ///
    /// Courses whose title is already indexed are skipped. Per-file failures
    /// are recorded in the report; only index failures are returned as errors.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        if clear_existing {
            info!("Clearing existing index");
            self.vector_store.clear().await?;
        }

        if !dir.is_dir() {
            warn!("Course folder {} does not exist", dir.display());
            return Ok(report);
        }

        let files = list_course_files(dir)?;
        let mut known: HashSet<String> =
            self.vector_store.course_titles().await?.into_iter().collect();

        for path in files {
            let doc = match load_course_file(&path).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(IngestFailure::new(&path, &e));
                    continue;
                }
            };

            if known.contains(&doc.course.title) {
                debug!("Course already indexed: {}", doc.course.title);
                report.skipped += 1;
                continue;
            }

            match index_document(
                self.vector_store.as_ref(),
                self.embedder.as_ref(),
                &self.chunker,
                &doc,
            )
            .await
            {
                Ok(chunks) => {
                    info!("Indexed '{}' ({} chunks)", doc.course.title, chunks);
                    report.courses_added += 1;
                    report.chunks_added += chunks;
                    known.insert(doc.course.title);
                }
                Err(e) if is_index_failure(&e) => return Err(e),
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    report.failures.push(IngestFailure::new(&path, &e));
                }
            }
        }

        info!(
            "Ingestion finished: {} courses, {} chunks, {} skipped, {} failed",
            report.courses_added,
            report.chunks_added,
            report.skipped,
            report.failures.len()
        );

        Ok(report)
    }

    /// Ingest a single course file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_document(&self, path: &Path) -> Result<IngestedCourse> {
        let doc = load_course_file(path).await?;

        if self.vector_store.get_course(&doc.course.title).await?.is_some() {
            info!("Course already indexed: {}", doc.course.title);
            return Ok(IngestedCourse {
                course: doc.course,
                chunks_added: 0,
                skipped: true,
            });
        }

        let chunks_added = index_document(
            self.vector_store.as_ref(),
            self.embedder.as_ref(),
            &self.chunker,
            &doc,
        )
        .await?;

        Ok(IngestedCourse {
            course: doc.course,
            chunks_added,
            skipped: false,
        })
    }

    /// Answer a question, optionally continuing a session.
    ///
    /// A new session is created when none is given. Queries on the same
    /// session are answered one at a time, in the order they arrive.
    #[instrument(skip(self, query))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };

        let _turn = self.sessions.lock(&session_id).await;
        let history = self.sessions.history(&session_id);

        let response = self.agent.answer(query, &history).await?;
        debug!(
            "Answered in {} rounds with {} tool calls",
            response.rounds,
            response.tool_calls.len()
        );

        self.sessions
            .add_exchange(&session_id, query, &response.content);

        Ok(QueryResponse {
            answer: response.content,
            sources: response.sources,
            session_id,
        })
    }

    /// Summary of the indexed catalog.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.vector_store.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Remove all courses and chunks from the index.
    pub async fn clear(&self) -> Result<()> {
        info!("Clearing index");
        self.vector_store.clear().await
    }
}

/// Chunk, embed and index one parsed course document.
///
/// All embeddings are computed before anything is written, so a failed
/// embedding call leaves the index untouched. Chunks are written before the
/// catalog entry: a course is listed in the catalog only once its content is
/// stored, and a failed chunk write leaves it eligible for re-ingestion.
/// Returns the number of chunks.
pub async fn index_document(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    chunker: &SentenceChunker,
    doc: &CourseDocument,
) -> Result<usize> {
    let chunks = chunker.chunk(&doc.body, &doc.course.title, &doc.boundaries);

    let title_embedding = embedder.embed(&doc.course.title).await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = if texts.is_empty() {
        Vec::new()
    } else {
        embedder.embed_batch(&texts).await?
    };

    if embeddings.len() != chunks.len() {
        return Err(SyllabusError::Embedding(format!(
            "Expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    let indexed: Vec<IndexedChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
        .collect();

    let stored = store.upsert_chunks(&indexed).await?;

    store
        .upsert_course(&CatalogEntry::new(doc.course.clone(), title_embedding))
        .await?;

    Ok(stored)
}

fn is_index_failure(error: &SyllabusError) -> bool {
    matches!(
        error,
        SyllabusError::VectorStore(_) | SyllabusError::Database(_)
    )
}

/// A course file that could not be ingested.
#[derive(Debug, Clone)]
pub struct IngestFailure {
    /// Path of the file.
    pub path: PathBuf,
    /// Why it failed.
    pub reason: String,
}

impl IngestFailure {
    fn new(path: &Path, error: &SyllabusError) -> Self {
        let reason = match error {
            SyllabusError::Ingestion { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        Self {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Result of ingesting a folder.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Number of new courses indexed.
    pub courses_added: usize,
    /// Number of chunks indexed for the new courses.
    pub chunks_added: usize,
    /// Number of files skipped because their course was already indexed.
    pub skipped: usize,
    /// Files that failed to parse or index.
    pub failures: Vec<IngestFailure>,
}

/// Result of ingesting a single document.
#[derive(Debug)]
pub struct IngestedCourse {
    /// Course metadata from the document.
    pub course: Course,
    /// Number of chunks indexed.
    pub chunks_added: usize,
    /// Whether the course was already indexed.
    pub skipped: bool,
}

/// Answer to a query.
#[derive(Debug)]
pub struct QueryResponse {
    /// Final answer text.
    pub answer: String,
    /// De-duplicated citations in the order they were found.
    pub sources: Vec<Source>,
    /// Session the exchange was recorded in.
    pub session_id: String,
}

/// Catalog summary.
#[derive(Debug)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverKind;
    use crate::embedding::HashedEmbedder;
    use crate::generation::{Message, ModelResponse};
    use crate::testing::{tool_call, ScriptedModel, FIXTURE_DIMENSIONS, INTRO_TO_X, MCP_COURSE};
    use crate::vector_store::{
        CatalogMatch, ContentFilter, ContentMatch, MemoryVectorStore,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose chunk writes fail while `fail_chunks` is set.
    struct FlakyStore {
        inner: MemoryVectorStore,
        fail_chunks: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn upsert_course(&self, entry: &CatalogEntry) -> Result<()> {
            self.inner.upsert_course(entry).await
        }

        async fn query_catalog(&self, embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
            self.inner.query_catalog(embedding, limit).await
        }

        async fn get_course(&self, title: &str) -> Result<Option<Course>> {
            self.inner.get_course(title).await
        }

        async fn course_titles(&self) -> Result<Vec<String>> {
            self.inner.course_titles().await
        }

        async fn course_count(&self) -> Result<usize> {
            self.inner.course_count().await
        }

        async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<usize> {
            if self.fail_chunks.load(Ordering::SeqCst) {
                return Err(SyllabusError::VectorStore("disk full".to_string()));
            }
            self.inner.upsert_chunks(chunks).await
        }

        async fn query_content(
            &self,
            embedding: &[f32],
            filter: &ContentFilter,
            limit: usize,
        ) -> Result<Vec<ContentMatch>> {
            self.inner.query_content(embedding, filter, limit).await
        }

        async fn chunk_count(&self) -> Result<usize> {
            self.inner.chunk_count().await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
    }

    fn orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
        let mut settings = Settings::default();
        settings.retrieval.resolver = ResolverKind::Lexical;

        Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(HashedEmbedder::new(FIXTURE_DIMENSIONS)),
            Arc::new(MemoryVectorStore::new()),
            model,
        )
    }

    fn course_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("course1_script.txt"), INTRO_TO_X).unwrap();
        std::fs::write(dir.path().join("course2_script.txt"), MCP_COURSE).unwrap();
        std::fs::write(dir.path().join("broken.txt"), "Course Title: Broken\n\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        dir
    }

    async fn ingested(model: Arc<ScriptedModel>) -> Orchestrator {
        let orchestrator = orchestrator(model);
        let dir = course_dir();
        orchestrator.ingest_folder(dir.path(), false).await.unwrap();
        orchestrator
    }

    #[tokio::test]
    async fn test_ingest_folder_reports_failures_and_skips() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(Vec::new())));
        let dir = course_dir();

        let report = orchestrator.ingest_folder(dir.path(), false).await.unwrap();
        assert_eq!(report.courses_added, 2);
        assert!(report.chunks_added >= 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("broken.txt"));

        let again = orchestrator.ingest_folder(dir.path(), false).await.unwrap();
        assert_eq!(again.courses_added, 0);
        assert_eq!(again.skipped, 2);

        let cleared = orchestrator.ingest_folder(dir.path(), true).await.unwrap();
        assert_eq!(cleared.courses_added, 2);
        assert_eq!(cleared.chunks_added, report.chunks_added);
    }

    #[tokio::test]
    async fn test_ingest_missing_folder_is_empty_report() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(Vec::new())));
        let report = orchestrator
            .ingest_folder(Path::new("/definitely/not/here"), false)
            .await
            .unwrap();
        assert_eq!(report.courses_added, 0);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_document_and_analytics() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(Vec::new())));
        let dir = course_dir();
        let path = dir.path().join("course1_script.txt");

        let first = orchestrator.ingest_document(&path).await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.course.title, "Intro to X");
        assert!(first.chunks_added > 0);

        let second = orchestrator.ingest_document(&path).await.unwrap();
        assert!(second.skipped);

        let analytics = orchestrator.course_analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec!["Intro to X"]);

        orchestrator.clear().await.unwrap();
        assert_eq!(orchestrator.course_analytics().await.unwrap().total_courses, 0);
    }

    #[tokio::test]
    async fn test_failed_chunk_write_leaves_course_reingestable() {
        let store = Arc::new(FlakyStore {
            inner: MemoryVectorStore::new(),
            fail_chunks: AtomicBool::new(true),
        });
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(HashedEmbedder::new(FIXTURE_DIMENSIONS)),
            store.clone(),
            Arc::new(ScriptedModel::new(Vec::new())),
        );
        let dir = course_dir();
        let path = dir.path().join("course1_script.txt");

        let err = orchestrator.ingest_document(&path).await.unwrap_err();
        assert!(matches!(err, SyllabusError::VectorStore(_)));
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert_eq!(store.chunk_count().await.unwrap(), 0);

        store.fail_chunks.store(false, Ordering::SeqCst);

        let retry = orchestrator.ingest_document(&path).await.unwrap();
        assert!(!retry.skipped);
        assert!(retry.chunks_added > 0);
        assert_eq!(store.course_count().await.unwrap(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), retry.chunks_added);
    }

    #[tokio::test]
    async fn test_unknown_course_yields_no_citations() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                content: None,
                tool_calls: vec![tool_call(
                    "c1",
                    "search_course_content",
                    r#"{"query": "pipelines", "course_name": "Intro to Zzz"}"#,
                )],
            },
            ModelResponse::text("I couldn't find a course matching 'Intro to Zzz'."),
        ]));
        let orchestrator = ingested(model.clone()).await;

        let response = orchestrator
            .query("What does Intro to Zzz say about pipelines?", None)
            .await
            .unwrap();

        assert!(response.answer.contains("Intro to Zzz"));
        assert!(response.sources.is_empty());

        let requests = model.requests();
        assert_eq!(
            requests[1].messages.last(),
            Some(&Message::Tool {
                call_id: "c1".to_string(),
                content: "No course found matching 'Intro to Zzz'".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_outline_then_search_across_two_rounds() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                content: None,
                tool_calls: vec![tool_call(
                    "c1",
                    "get_course_outline",
                    r#"{"course_name": "MCP"}"#,
                )],
            },
            ModelResponse {
                content: None,
                tool_calls: vec![tool_call(
                    "c2",
                    "search_course_content",
                    r#"{"query": "server tools client", "course_name": "MCP: Build Rich-Context AI Apps", "lesson_number": 1}"#,
                )],
            },
            ModelResponse::text("Lesson 1 covers building MCP servers."),
        ]));
        let orchestrator = ingested(model.clone()).await;

        let response = orchestrator
            .query("What does lesson 1 of the MCP course cover?", None)
            .await
            .unwrap();

        assert_eq!(response.answer, "Lesson 1 covers building MCP servers.");
        let labels: Vec<_> = response.sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "MCP: Build Rich-Context AI Apps",
                "MCP: Build Rich-Context AI Apps - Lesson 1"
            ]
        );
        assert_eq!(
            response.sources[1].link.as_deref(),
            Some("https://example.com/mcp/1")
        );

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.tools_enabled()));
    }

    #[tokio::test]
    async fn test_session_history_is_carried_and_bounded() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse::text("First answer."),
            ModelResponse::text("Second answer."),
            ModelResponse::text("Third answer."),
            ModelResponse::text("Fourth answer."),
        ]));
        let orchestrator = orchestrator(model.clone());

        let first = orchestrator.query("Question one?", None).await.unwrap();
        let session = first.session_id.clone();
        for question in ["Question two?", "Question three?", "Question four?"] {
            let response = orchestrator.query(question, Some(&session)).await.unwrap();
            assert_eq!(response.session_id, session);
        }

        let requests = model.requests();
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        // Two exchanges are kept, so the fourth query sees questions two and three.
        let last = &requests[3].messages;
        assert_eq!(last.len(), 5);
        assert_eq!(last[0], Message::User("Question two?".to_string()));
        assert_eq!(last[4], Message::User("Question four?".to_string()));

        let history = orchestrator.sessions().history(&session);
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].content, "Fourth answer.");
    }
}
