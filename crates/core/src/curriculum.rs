//! Curriculum store trait: read-only access to syllabus outlines and
//! extracted textbook chapters.
//!
//! Absence is never an error: misses return `None` or an empty list.
//! `CurriculumError::NotConfigured` is reserved for an unavailable catalog.

use crate::board::Board;
use crate::error::CurriculumError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of a subject's chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter_number: u32,
    pub chapter_name: String,
}

/// Full chapter body as produced by ingestion. `cleaned_content` is never truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub chapter_number: u32,
    pub chapter_name: String,
    pub cleaned_content: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub available_topics: Vec<String>,
}

/// A unit of a board syllabus with its listed topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusUnit {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Syllabus structure for one `(board, grade, subject)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusOutline {
    pub board: Board,
    pub grade: String,
    pub subject: String,
    pub units: Vec<SyllabusUnit>,
}

/// Lower-case a catalog key and collapse runs of whitespace.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    /// The backend name (e.g., "json_catalog").
    fn name(&self) -> &str;

    /// Chapters of a subject's textbook, in book order.
    async fn get_available_chapters(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Vec<ChapterSummary>, CurriculumError>;

    /// Full content of one chapter.
    async fn get_chapter_content(
        &self,
        grade: &str,
        subject: &str,
        chapter_name: &str,
    ) -> Result<Option<ChapterContent>, CurriculumError>;

    /// Finer-grained topic text within a chapter, when ingestion produced one.
    async fn get_topic_content(
        &self,
        grade: &str,
        subject: &str,
        chapter_name: &str,
        topic_name: &str,
    ) -> Result<Option<String>, CurriculumError>;

    /// Syllabus structure for a board.
    async fn get_syllabus_outline(
        &self,
        board: &Board,
        grade: &str,
        subject: &str,
    ) -> Result<Option<SyllabusOutline>, CurriculumError>;
}
