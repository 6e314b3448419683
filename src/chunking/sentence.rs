//! Sentence-based chunking implementation.

use super::{Chunk, ChunkingConfig};
use crate::document::LessonBoundary;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn sentence_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*(?:\s+|$)"#)
            .unwrap_or_else(|e| panic!("invalid sentence regex: {e}"))
    })
}

/// A whitespace-normalised sentence and where it starts in the source text.
#[derive(Debug)]
struct Sentence {
    start: usize,
    text: String,
}

/// Split text into sentences at terminal punctuation.
fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_end_regex().find_iter(text) {
        push_sentence(&mut sentences, text, start, m.end());
        start = m.end();
    }

    if start < text.len() {
        push_sentence(&mut sentences, text, start, text.len());
    }

    sentences
}

fn push_sentence(sentences: &mut Vec<Sentence>, text: &str, start: usize, end: usize) {
    let raw = &text[start..end];
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return;
    }

    let leading = raw.len() - raw.trim_start().len();
    sentences.push(Sentence {
        start: start + leading,
        text: normalized,
    });
}

/// Lesson owning a byte offset: the last boundary at or before it.
fn lesson_at(boundaries: &[LessonBoundary], offset: usize) -> Option<u32> {
    boundaries
        .iter()
        .filter(|b| b.offset <= offset)
        .max_by_key(|b| b.offset)
        .map(|b| b.lesson_number)
}

/// Trailing overlap of at most `max_chars`, snapped forward to a word start.
fn overlap_tail(previous: &str, max_chars: usize) -> Option<&str> {
    if max_chars == 0 {
        return None;
    }

    let total = previous.chars().count();
    let tail = if total <= max_chars {
        previous
    } else {
        let cut = previous
            .char_indices()
            .nth(total - max_chars)
            .map(|(i, _)| i)
            .unwrap_or(previous.len());

        let mid_word = !previous[..cut].ends_with(char::is_whitespace);
        if mid_word {
            match previous[cut..].find(char::is_whitespace) {
                Some(ws) => &previous[cut + ws..],
                None => return None,
            }
        } else {
            &previous[cut..]
        }
    };

    let tail = tail.trim();
    (!tail.is_empty()).then_some(tail)
}

/// Chunker that packs whole sentences into size-bounded chunks.
pub struct SentenceChunker {
    config: ChunkingConfig,
}

impl SentenceChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split a document body into ordered chunks.
    ///
    /// `boundaries` mark where each lesson begins in `text`. Chunks never
    /// pack sentences from two different lessons together.
    pub fn chunk(
        &self,
        text: &str,
        course_title: &str,
        boundaries: &[LessonBoundary],
    ) -> Vec<Chunk> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut group: Vec<String> = Vec::new();
        let mut group_lesson: Option<u32> = None;

        for sentence in sentences {
            let lesson = lesson_at(boundaries, sentence.start);
            if !group.is_empty() && lesson != group_lesson {
                self.pack_lesson(&group, course_title, group_lesson, &mut chunks);
                group.clear();
            }
            group_lesson = lesson;
            group.push(sentence.text);
        }

        if !group.is_empty() {
            self.pack_lesson(&group, course_title, group_lesson, &mut chunks);
        }

        debug!(
            "Chunked '{}' into {} chunks (max {} chars)",
            course_title,
            chunks.len(),
            self.config.max_size
        );

        chunks
    }

    /// Greedily pack the sentences of a single lesson.
    fn pack_lesson(
        &self,
        sentences: &[String],
        course_title: &str,
        lesson_number: Option<u32>,
        chunks: &mut Vec<Chunk>,
    ) {
        let max = self.config.max_size;
        let mut current = String::new();
        let mut current_len = 0;
        let mut overlap_chars = 0;
        let mut previous: Option<String> = None;

        let mut emit = |content: &mut String, overlap_chars: usize, previous: &mut Option<String>| {
            let chunk = Chunk {
                course_title: course_title.to_string(),
                lesson_number,
                chunk_index: chunks.len(),
                content: std::mem::take(content),
                overlap_chars,
            };
            *previous = Some(chunk.content.clone());
            chunks.push(chunk);
        };

        for sentence in sentences {
            let sentence_len = sentence.chars().count();

            if !current.is_empty() && current_len + 1 + sentence_len <= max {
                current.push(' ');
                current.push_str(sentence);
                current_len += 1 + sentence_len;
                continue;
            }

            if !current.is_empty() {
                emit(&mut current, overlap_chars, &mut previous);
            }

            overlap_chars = 0;
            current_len = 0;

            if sentence_len < max {
                let budget = self.config.overlap.min(max - sentence_len - 1);
                if let Some(tail) = previous.as_deref().and_then(|p| overlap_tail(p, budget)) {
                    current.push_str(tail);
                    current.push(' ');
                    overlap_chars = tail.chars().count() + 1;
                    current_len = overlap_chars;
                }
            }

            current.push_str(sentence);
            current_len += sentence_len;
        }

        if !current.is_empty() {
            emit(&mut current, overlap_chars, &mut previous);
        }
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}
