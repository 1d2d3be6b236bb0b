//! Prompt assembly for the first and follow-up tutoring turns.
//!
//! Every prompt has the same skeleton: role framing, language directive,
//! the grounding source inside a delimited block, then the grounding
//! clause. Assembly is pure and deterministic.

use crate::relevance::truncate_chars;
use shiksha_core::board::{Board, MaterialLanguage};
use shiksha_core::curriculum::SyllabusOutline;
use shiksha_core::message::{Message, Role};

/// Present in every prompt this module produces.
pub const GROUNDING_CLAUSE: &str =
    "Answer only from the enclosed content; do not supply outside knowledge.";

pub const LANGUAGE_DIRECTIVE: &str = "Respond in English. If any of the enclosed content is in Hindi or Telugu, \
translate it into English before using it.";

const SOURCE_START: &str = "=== SOURCE CONTENT START ===";
const SOURCE_END: &str = "=== SOURCE CONTENT END ===";

/// Inputs of the initial-overview prompt.
#[derive(Debug, Clone, Copy)]
pub struct OverviewInput<'a> {
    pub raw_content: &'a str,
    pub topic: &'a str,
    pub subject: &'a str,
    pub grade: &'a str,
    pub is_uploaded_material: bool,
    /// Detected script of uploaded material
    pub material_language: Option<MaterialLanguage>,
    /// Short pedagogy excerpts, rendered outside the source block
    pub teaching_notes: &'a [String],
}

/// Inputs of a follow-up prompt.
#[derive(Debug, Clone, Copy)]
pub struct FollowupInput<'a> {
    pub topic: &'a str,
    pub subject: &'a str,
    /// Relevance-windowed slice of the session's source
    pub relevant_content: &'a str,
    pub question: &'a str,
    /// Conversation preceding the question, oldest first
    pub history: &'a [Message],
    /// Per-message compaction limit for `history`
    pub history_message_chars: usize,
}

fn push_source_block(prompt: &mut String, content: &str) {
    prompt.push_str(SOURCE_START);
    prompt.push('\n');
    prompt.push_str(content.trim());
    prompt.push('\n');
    prompt.push_str(SOURCE_END);
    prompt.push_str("\n\n");
}

/// Build the prompt for the first assistant turn of a session.
pub fn format_comprehensive_overview(input: &OverviewInput<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are an expert teacher educator helping a Grade {} {} teacher prepare to teach \"{}\".\n\n",
        input.grade, input.subject, input.topic
    ));

    prompt.push_str("LANGUAGE: ");
    prompt.push_str(LANGUAGE_DIRECTIVE);
    if let Some(language) = input.material_language.filter(|l| *l != MaterialLanguage::English) {
        prompt.push_str(&format!(" The material below is written in {language}."));
    }
    prompt.push_str("\n\n");

    if input.is_uploaded_material {
        prompt.push_str("The teacher uploaded the following material:\n");
    } else {
        prompt.push_str("Curriculum content for this topic:\n");
    }
    push_source_block(&mut prompt, input.raw_content);

    if !input.teaching_notes.is_empty() {
        prompt.push_str("TEACHING APPROACHES (for presentation only, not a content source):\n");
        for note in input.teaching_notes {
            prompt.push_str("- ");
            prompt.push_str(note.trim());
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str("INSTRUCTIONS:\n");
    prompt.push_str("- ");
    prompt.push_str(GROUNDING_CLAUSE);
    prompt.push('\n');
    prompt.push_str(
        "- If the content does not cover something, say so instead of filling the gap.\n",
    );
    if input.is_uploaded_material {
        prompt.push_str("- Extract all topics present in the material, not only the requested one.\n");
        prompt.push_str("- Cite page numbers where the content shows them.\n");
    }
    prompt.push_str("- Give a structured overview: key concepts, definitions, worked examples from the content, and common student misconceptions.\n");
    prompt.push_str("- Close by inviting the teacher to ask follow-up questions.\n");

    prompt
}

/// Build the prompt for a follow-up question.
pub fn format_followup_prompt(input: &FollowupInput<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are continuing a tutoring conversation about \"{}\" ({}).\n\n",
        input.topic, input.subject
    ));
    prompt.push_str("LANGUAGE: ");
    prompt.push_str(LANGUAGE_DIRECTIVE);
    prompt.push_str("\n\n");

    prompt.push_str("Relevant content:\n");
    push_source_block(&mut prompt, input.relevant_content);

    if !input.history.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for message in input.history {
            let speaker = match message.role {
                Role::User => "Teacher",
                Role::Assistant => "Tutor",
                Role::System => continue,
            };
            prompt.push_str(&format!(
                "{speaker}: {}\n",
                compact(&message.content, input.history_message_chars)
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Teacher's question: {}\n\n", input.question.trim()));

    prompt.push_str("INSTRUCTIONS:\n- ");
    prompt.push_str(GROUNDING_CLAUSE);
    prompt.push('\n');
    prompt.push_str("- If the answer is not in the content, say that it is not covered.\n");
    prompt.push_str("- Answer the question directly and keep it focused.\n");

    prompt
}

/// Render the syllabus outline used when no textbook body or material is available.
///
/// Without an outline, a minimal stub naming the topic is produced.
pub fn format_outline_source(
    outline: Option<&SyllabusOutline>,
    topic: &str,
    subject: &str,
    grade: &str,
    board: &Board,
    state: &str,
) -> String {
    let mut out = format!("Topic: {topic}\nSubject: {subject}\nGrade: {grade}\nBoard: {board}\n");
    if !state.trim().is_empty() {
        out.push_str(&format!("State: {}\n", state.trim()));
    }

    match outline {
        Some(outline) if !outline.units.is_empty() => {
            out.push_str("\nSyllabus outline:\n");
            for unit in &outline.units {
                out.push_str(&format!("- {}\n", unit.name));
                for topic in &unit.topics {
                    out.push_str(&format!("  - {topic}\n"));
                }
            }
        }
        _ => {
            out.push_str("\nNo textbook chapter or syllabus outline is available for this topic.\n");
        }
    }

    out
}

/// Collapse whitespace and cap a history message for prompt inclusion.
fn compact(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        format!("{}...", truncate_chars(&flat, max_chars))
    } else {
        flat
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
