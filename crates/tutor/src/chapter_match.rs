//! Match a requested topic to a textbook chapter title.

use shiksha_core::curriculum::{ChapterSummary, normalize_key};

pub const EXACT_MATCH: u8 = 100;
pub const TOPIC_IN_CHAPTER: u8 = 80;
pub const CHAPTER_IN_TOPIC: u8 = 70;

/// The winning chapter and its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMatch<'a> {
    pub chapter: &'a ChapterSummary,
    pub score: u8,
}

/// Score how well `topic` names `chapter_name`.
///
/// Both sides are lower-cased and whitespace-normalized. Containment only
/// counts when the contained string covers at least half of the other.
pub fn match_score(topic: &str, chapter_name: &str) -> u8 {
    let topic = normalize_key(topic);
    let chapter = normalize_key(chapter_name);
    if topic.is_empty() || chapter.is_empty() {
        return 0;
    }

    let topic_len = topic.chars().count();
    let chapter_len = chapter.chars().count();

    if topic == chapter {
        EXACT_MATCH
    } else if chapter.contains(&topic) && topic_len * 2 >= chapter_len {
        TOPIC_IN_CHAPTER
    } else if topic.contains(&chapter) && chapter_len * 2 >= topic_len {
        CHAPTER_IN_TOPIC
    } else {
        0
    }
}

/// Highest-scoring chapter for `topic`; the first one wins ties.
/// `None` when no chapter scores above zero.
pub fn best_chapter<'a>(topic: &str, chapters: &'a [ChapterSummary]) -> Option<ChapterMatch<'a>> {
    let mut best: Option<ChapterMatch<'a>> = None;

    for chapter in chapters {
        let score = match_score(topic, &chapter.chapter_name);
        if score > 0 && best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(ChapterMatch { chapter, score });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(names: &[&str]) -> Vec<ChapterSummary> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| ChapterSummary {
                chapter_number: i as u32 + 1,
                chapter_name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn exact_match_ignores_case_and_spacing() {
        assert_eq!(match_score("  real  numbers ", "Real Numbers"), EXACT_MATCH);
    }

    #[test]
    fn topic_inside_chapter() {
        assert_eq!(match_score("Quadratic Equations", "Quadratic Equations and Roots"), TOPIC_IN_CHAPTER);
        // too short a share of the chapter title
        assert_eq!(match_score("Roots", "Quadratic Equations and Roots"), 0);
    }

    #[test]
    fn chapter_inside_topic() {
        assert_eq!(match_score("Polynomials and zeroes", "Polynomials"), CHAPTER_IN_TOPIC);
        assert_eq!(match_score("Introduction to polynomials of higher degree", "Polynomials"), 0);
    }

    #[test]
    fn empty_inputs_never_match() {
        assert_eq!(match_score("", "Real Numbers"), 0);
        assert_eq!(match_score("Real Numbers", "  "), 0);
    }

    #[test]
    fn best_chapter_prefers_exact() {
        let list = chapters(&["Real Numbers and Sets", "Polynomials", "Real Numbers"]);
        let found = best_chapter("Real Numbers", &list).unwrap();
        assert_eq!(found.chapter.chapter_number, 3);
        assert_eq!(found.score, EXACT_MATCH);
    }

    #[test]
    fn first_chapter_wins_ties() {
        let list = chapters(&["Light Rays", "Light Wave"]);
        assert_eq!(match_score("Light", "Light Wave"), TOPIC_IN_CHAPTER);
        let found = best_chapter("Light", &list).unwrap();
        assert_eq!(found.chapter.chapter_name, "Light Rays");
        assert_eq!(found.score, TOPIC_IN_CHAPTER);
    }

    #[test]
    fn no_positive_score_is_none() {
        let list = chapters(&["Polynomials", "Triangles"]);
        assert!(best_chapter("Photosynthesis", &list).is_none());
        assert!(best_chapter("Photosynthesis", &[]).is_none());
    }
}
