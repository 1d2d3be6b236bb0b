//! JSON curriculum catalog.
//!
//! Loads the output of the external ingestion step once and serves lookups
//! from memory. File layout:
//!
//! ```json
//! {
//!   "textbooks": [
//!     {"grade": "10", "subject": "Mathematics", "chapters": [
//!       {"chapter_number": 1, "chapter_name": "Real Numbers",
//!        "cleaned_content": "...", "key_concepts": [], "available_topics": [],
//!        "topics": [{"topic_name": "Euclid's Division Lemma", "content": "..."}]}
//!     ]}
//!   ],
//!   "syllabi": [
//!     {"board": "TELANGANA", "grade": "10", "subject": "Mathematics",
//!      "units": [{"name": "Number System", "topics": ["Real Numbers"]}]}
//!   ]
//! }
//! ```
//!
//! Keys are matched case- and whitespace-insensitively. Grades accept a
//! `Class`/`Grade` prefix.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shiksha_core::board::Board;
use shiksha_core::curriculum::{
    ChapterContent, ChapterSummary, CurriculumStore, SyllabusOutline, SyllabusUnit, normalize_key,
};
use shiksha_core::error::CurriculumError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    textbooks: Vec<TextbookEntry>,
    #[serde(default)]
    syllabi: Vec<SyllabusEntry>,
}

#[derive(Debug, Deserialize)]
struct TextbookEntry {
    grade: String,
    subject: String,
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
}

#[derive(Debug, Deserialize)]
struct ChapterEntry {
    chapter_number: u32,
    chapter_name: String,
    #[serde(default)]
    cleaned_content: String,
    #[serde(default)]
    key_concepts: Vec<String>,
    #[serde(default)]
    available_topics: Vec<String>,
    #[serde(default)]
    topics: Vec<TopicEntry>,
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    topic_name: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct SyllabusEntry {
    board: String,
    grade: String,
    subject: String,
    #[serde(default)]
    units: Vec<SyllabusUnit>,
}

struct Chapter {
    content: ChapterContent,
    /// normalized topic name → text
    topics: HashMap<String, String>,
}

/// Per-subject overview for listing commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextbookSummary {
    pub grade: String,
    pub subject: String,
    pub chapters: usize,
}

/// Read-only curriculum catalog held in memory.
pub struct JsonCatalog {
    /// (grade, subject) → chapters in book order
    textbooks: HashMap<(String, String), Vec<Chapter>>,
    /// (board, grade, subject) → outline
    syllabi: HashMap<(String, String, String), SyllabusOutline>,
    summaries: Vec<TextbookSummary>,
}

/// Normalize a grade key: `"Class 10"`, `"grade 10"` and `"10"` are equal.
fn grade_key(grade: &str) -> String {
    let key = normalize_key(grade);
    for prefix in ["class ", "grade "] {
        if let Some(rest) = key.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    key
}

impl JsonCatalog {
    /// Load the catalog from `path`.
    ///
    /// A missing or unreadable file means the catalog is unavailable and
    /// yields `NotConfigured`.
    pub fn load(path: &Path) -> Result<Self, CurriculumError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CurriculumError::NotConfigured(format!(
                "cannot read curriculum catalog at {}: {e}",
                path.display()
            ))
        })?;

        let catalog = Self::from_json(&content).map_err(|e| match e {
            CurriculumError::Catalog(reason) => CurriculumError::NotConfigured(format!(
                "invalid curriculum catalog at {}: {reason}",
                path.display()
            )),
            other => other,
        })?;

        info!(
            path = %path.display(),
            textbooks = catalog.textbooks.len(),
            syllabi = catalog.syllabi.len(),
            "Curriculum catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog document.
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CurriculumError::Catalog(e.to_string()))?;
        Ok(Self::from_file(file))
    }

    /// A catalog with no textbooks or syllabi.
    pub fn empty() -> Self {
        Self::from_file(CatalogFile::default())
    }

    fn from_file(file: CatalogFile) -> Self {
        let mut textbooks: HashMap<(String, String), Vec<Chapter>> = HashMap::new();
        let mut summaries = Vec::new();

        for book in file.textbooks {
            let mut chapters: Vec<Chapter> = book
                .chapters
                .into_iter()
                .map(|ch| Chapter {
                    topics: ch
                        .topics
                        .into_iter()
                        .map(|t| (normalize_key(&t.topic_name), t.content))
                        .collect(),
                    content: ChapterContent {
                        chapter_number: ch.chapter_number,
                        chapter_name: ch.chapter_name,
                        cleaned_content: ch.cleaned_content,
                        key_concepts: ch.key_concepts,
                        available_topics: ch.available_topics,
                    },
                })
                .collect();
            chapters.sort_by_key(|c| c.content.chapter_number);

            summaries.push(TextbookSummary {
                grade: book.grade.clone(),
                subject: book.subject.clone(),
                chapters: chapters.len(),
            });

            textbooks
                .entry((grade_key(&book.grade), normalize_key(&book.subject)))
                .or_default()
                .extend(chapters);
        }

        let syllabi = file
            .syllabi
            .into_iter()
            .map(|s| {
                let board = Board::parse(&s.board);
                let key = (
                    normalize_key(board.code()),
                    grade_key(&s.grade),
                    normalize_key(&s.subject),
                );
                let outline = SyllabusOutline {
                    board,
                    grade: s.grade,
                    subject: s.subject,
                    units: s.units,
                };
                (key, outline)
            })
            .collect();

        Self {
            textbooks,
            syllabi,
            summaries,
        }
    }

    /// Textbooks in the catalog, in file order.
    pub fn textbooks(&self) -> &[TextbookSummary] {
        &self.summaries
    }

    fn chapters(&self, grade: &str, subject: &str) -> Option<&Vec<Chapter>> {
        self.textbooks
            .get(&(grade_key(grade), normalize_key(subject)))
    }

    fn chapter(&self, grade: &str, subject: &str, chapter_name: &str) -> Option<&Chapter> {
        let wanted = normalize_key(chapter_name);
        self.chapters(grade, subject)?
            .iter()
            .find(|c| normalize_key(&c.content.chapter_name) == wanted)
    }
}

#[async_trait]
impl CurriculumStore for JsonCatalog {
    fn name(&self) -> &str {
        "json_catalog"
    }

    async fn get_available_chapters(
        &self,
        grade: &str,
        subject: &str,
    ) -> Result<Vec<ChapterSummary>, CurriculumError> {
        let chapters = self
            .chapters(grade, subject)
            .map(|chapters| {
                chapters
                    .iter()
                    .map(|c| ChapterSummary {
                        chapter_number: c.content.chapter_number,
                        chapter_name: c.content.chapter_name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(chapters)
    }

    async fn get_chapter_content(
        &self,
        grade: &str,
        subject: &str,
        chapter_name: &str,
    ) -> Result<Option<ChapterContent>, CurriculumError> {
        let found = self.chapter(grade, subject, chapter_name);
        debug!(grade, subject, chapter_name, found = found.is_some(), "Chapter lookup");
        Ok(found.map(|c| c.content.clone()))
    }

    async fn get_topic_content(
        &self,
        grade: &str,
        subject: &str,
        chapter_name: &str,
        topic_name: &str,
    ) -> Result<Option<String>, CurriculumError> {
        Ok(self
            .chapter(grade, subject, chapter_name)
            .and_then(|c| c.topics.get(&normalize_key(topic_name)))
            .cloned())
    }

    async fn get_syllabus_outline(
        &self,
        board: &Board,
        grade: &str,
        subject: &str,
    ) -> Result<Option<SyllabusOutline>, CurriculumError> {
        let key = (
            normalize_key(board.code()),
            grade_key(grade),
            normalize_key(subject),
        );
        Ok(self.syllabi.get(&key).cloned())
    }
}
