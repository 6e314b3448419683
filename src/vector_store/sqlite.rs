//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Course catalogs stay small, and content collections of a few thousand
//! chunks scan quickly enough without a vector extension.

use super::{
    rank_catalog, rank_content, CatalogEntry, CatalogMatch, ContentFilter,
    ContentMatch, IndexedChunk, Scorer, VectorStore,
};
use crate::chunking::Chunk;
use crate::document::{Course, Lesson};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    instructor TEXT,
    course_link TEXT,
    lessons_json TEXT NOT NULL,
    lesson_count INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    course_title TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    lesson_number INTEGER,
    content TEXT NOT NULL,
    overlap_chars INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title, lesson_number);
"#;

/// Raw catalog row before lesson JSON is decoded.
type CourseRow = (String, Option<String>, Option<String>, String);

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open or create a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets queries read while an ingest writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn course_from_row((title, instructor, course_link, lessons_json): CourseRow) -> Result<Course> {
        let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json)?;
        Ok(Course {
            title,
            course_link,
            instructor,
            lessons,
        })
    }

    fn chunk_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Chunk, Vec<u8>)> {
        let chunk_index: i64 = row.get(2)?;
        let overlap_chars: i64 = row.get(4)?;
        let embedding: Vec<u8> = row.get(5)?;

        Ok((
            Chunk {
                course_title: row.get(0)?,
                lesson_number: row.get(1)?,
                chunk_index: chunk_index as usize,
                content: row.get(3)?,
                overlap_chars: overlap_chars as usize,
            },
            embedding,
        ))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entry), fields(title = %entry.course.title))]
    async fn upsert_course(&self, entry: &CatalogEntry) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&entry.course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, instructor, course_link, lessons_json, lesson_count, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.course.title,
                entry.course.instructor,
                entry.course.course_link,
                lessons_json,
                entry.course.lessons.len() as i64,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted course '{}'", entry.course.title);
        Ok(())
    }

    #[instrument(skip(self, embedding))]
    async fn query_catalog(&self, embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
        let rows: Vec<(CourseRow, Vec<u8>)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT title, instructor, course_link, lessons_json, embedding FROM courses",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?), row.get(4)?))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut scorer = Scorer::new(embedding);
        let mut results = Vec::with_capacity(rows.len());
        for (course_row, bytes) in rows {
            let score = scorer.score(&Self::bytes_to_embedding(&bytes));
            results.push(CatalogMatch {
                course: Self::course_from_row(course_row)?,
                score,
            });
        }
        scorer.finish("catalog");

        rank_catalog(&mut results, limit);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let row: Option<CourseRow> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT title, instructor, course_link, lessons_json FROM courses WHERE title = ?1",
                params![title],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?
        };

        row.map(Self::course_from_row).transpose()
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for indexed in chunks {
            let chunk = &indexed.chunk;
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (course_title, lesson_number, chunk_index, content, overlap_chars, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index as i64,
                    chunk.content,
                    chunk.overlap_chars as i64,
                    Self::embedding_to_bytes(&indexed.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query_content(
        &self,
        embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<Vec<ContentMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, overlap_chars, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(
            params![filter.course_title, filter.lesson_number],
            Self::chunk_from_row,
        )?;

        let mut scorer = Scorer::new(embedding);
        let mut results = Vec::new();
        for row in rows {
            let (chunk, bytes) = row?;
            let score = scorer.score(&Self::bytes_to_embedding(&bytes));
            results.push(ContentMatch { chunk, score });
        }
        scorer.finish("content");

        rank_content(&mut results, limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared vector store");
        Ok(())
    }
}
