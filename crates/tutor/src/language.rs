//! Script-based language detection for uploaded material.

use shiksha_core::board::MaterialLanguage;

/// Chunks inspected from the start of a material.
pub const SAMPLE_CHUNKS: usize = 3;

/// Share of alphabetic characters a script must exceed to tag the material.
pub const SCRIPT_THRESHOLD: f64 = 0.30;

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_telugu(c: char) -> bool {
    ('\u{0C00}'..='\u{0C7F}').contains(&c)
}

/// Detect the material language from its first three chunks.
///
/// Counts alphabetic characters in the Devanagari and Telugu blocks. A
/// script whose share of all alphabetic characters is above 30% tags the
/// material; if both are, the larger share wins. Anything else is English.
pub fn detect_language<'a>(chunks: impl IntoIterator<Item = &'a str>) -> MaterialLanguage {
    let mut alphabetic = 0usize;
    let mut devanagari = 0usize;
    let mut telugu = 0usize;

    for text in chunks.into_iter().take(SAMPLE_CHUNKS) {
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            alphabetic += 1;
            if is_devanagari(c) {
                devanagari += 1;
            } else if is_telugu(c) {
                telugu += 1;
            }
        }
    }

    if alphabetic == 0 {
        return MaterialLanguage::English;
    }

    let hindi_ratio = devanagari as f64 / alphabetic as f64;
    let telugu_ratio = telugu as f64 / alphabetic as f64;

    match (hindi_ratio > SCRIPT_THRESHOLD, telugu_ratio > SCRIPT_THRESHOLD) {
        (true, true) if telugu_ratio > hindi_ratio => MaterialLanguage::Telugu,
        (true, _) => MaterialLanguage::Hindi,
        (false, true) => MaterialLanguage::Telugu,
        (false, false) => MaterialLanguage::English,
    }
}
