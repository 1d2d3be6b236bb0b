//! Relevance windowing for follow-up turns.
//!
//! A full chapter can run past 40,000 characters, so follow-up prompts only
//! carry the slice that lexically matches the question. Selection is
//! deterministic: identical inputs always produce identical output.

use shiksha_core::chunk::MaterialChunk;

/// Question words that carry no topical signal.
pub const STOP_WORDS: [&str; 15] = [
    "what", "is", "the", "a", "an", "how", "why", "when", "where", "can", "you", "explain",
    "tell", "me", "about",
];

/// Lines returned when nothing in the text matches the question.
const FALLBACK_LINES: usize = 100;

/// Lower-cased question keywords with stop words removed, first occurrence order.
///
/// Tokens are split on whitespace, stripped of surrounding punctuation, and
/// a possessive `'s` is dropped so "Euclid's" matches "Euclid".
pub fn extract_keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for raw in question.split_whitespace() {
        let lowered = raw.to_lowercase();
        let token = lowered.trim_matches(|c: char| !c.is_alphanumeric());
        let token = token
            .strip_suffix("'s")
            .or_else(|| token.strip_suffix("’s"))
            .unwrap_or(token);

        if token.is_empty() || STOP_WORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }

    keywords
}

/// Number of distinct keywords present in `text`.
pub fn keyword_hits(text: &str, keywords: &[String]) -> usize {
    if keywords.is_empty() {
        return 0;
    }
    let lowered = text.to_lowercase();
    keywords.iter().filter(|k| lowered.contains(k.as_str())).count()
}

/// Pick the `k` chunks with the most keyword hits.
///
/// Ties keep stored order. When no chunk matches, the first `k` are returned.
pub fn select_relevant_chunks<'a>(
    question: &str,
    chunks: &'a [MaterialChunk],
    k: usize,
) -> Vec<&'a MaterialChunk> {
    let keywords = extract_keywords(question);
    let mut scored: Vec<(usize, &MaterialChunk)> = chunks
        .iter()
        .map(|c| (keyword_hits(&c.content, &keywords), c))
        .collect();

    if scored.iter().all(|(score, _)| *score == 0) {
        return chunks.iter().take(k).collect();
    }

    // stable: equal scores stay in stored order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(k).map(|(_, c)| c).collect()
}

/// Extract the window of `text` around the line that best matches `question`.
///
/// The best-scoring line (first on ties) is always included. Neighbouring
/// lines are added alternately above and below, up to `context_lines` on
/// each side, while the window stays within `max_chars` characters. With no
/// matching line, the first 100 lines are returned, truncated to `max_chars`.
pub fn extract_text_window(
    question: &str,
    text: &str,
    max_chars: usize,
    context_lines: usize,
) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let keywords = extract_keywords(question);

    let mut best: Option<(usize, usize)> = None;
    for (i, line) in lines.iter().enumerate() {
        let score = keyword_hits(line, &keywords);
        if score > 0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let Some((best, _)) = best else {
        let head = lines
            .iter()
            .take(FALLBACK_LINES)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        return truncate_chars(&head, max_chars);
    };

    let best_len = char_len(lines[best]);
    if best_len >= max_chars {
        return truncate_chars(lines[best], max_chars);
    }

    let mut start = best;
    let mut end = best;
    let mut used = best_len;
    let mut up_open = true;
    let mut down_open = true;

    for offset in 1..=context_lines {
        if !up_open && !down_open {
            break;
        }

        if up_open {
            match best.checked_sub(offset) {
                Some(i) if used + char_len(lines[i]) + 1 <= max_chars => {
                    used += char_len(lines[i]) + 1;
                    start = i;
                }
                _ => up_open = false,
            }
        }

        if down_open {
            let i = best + offset;
            if i < lines.len() && used + char_len(lines[i]) + 1 <= max_chars {
                used += char_len(lines[i]) + 1;
                end = i;
            } else {
                down_open = false;
            }
        }
    }

    lines[start..=end].join("\n")
}

/// Render chunks with page/section headers for prompt inclusion.
pub fn render_chunks<'a>(chunks: impl IntoIterator<Item = &'a MaterialChunk>) -> String {
    chunks
        .into_iter()
        .map(|c| {
            let mut header = match c.page_number {
                Some(page) => format!("[Page {page}"),
                None => format!("[Chunk {}", c.chunk_index + 1),
            };
            if let Some(section) = &c.section_title {
                header.push_str(" | ");
                header.push_str(section);
            }
            header.push(']');
            format!("{header}\n{}", c.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}
