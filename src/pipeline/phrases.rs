//! Phrase matching for wake phrases, stop phrases and command lookup.
//!
//! Recognizers insert punctuation and capitalization inconsistently, so every
//! comparison here is case-insensitive and requires word boundaries on both
//! sides of a match ("othello" never contains the wake phrase "hello").

/// Characters trimmed from the seams left behind when a phrase is removed.
const SEAM_PUNCTUATION: [char; 7] = [',', ':', ';', '.', '!', '?', ' '];

/// Lowercase, drop punctuation, and collapse whitespace.
///
/// "Turn on   the Lights." → "turn on the lights"
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the first word-bounded occurrence of `phrase` in `text`, ignoring
/// ASCII case. Returns `(byte_pos, byte_len)` into `text`.
pub fn find_phrase(text: &str, phrase: &str) -> Option<(usize, usize)> {
    let phrase = phrase.trim().to_ascii_lowercase();
    if phrase.is_empty() {
        return None;
    }
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let bytes = haystack.as_bytes();

    let mut search_from = 0;
    while search_from < haystack.len() {
        let Some(rel_pos) = haystack[search_from..].find(phrase.as_str()) else {
            break;
        };
        let pos = search_from + rel_pos;
        let end = pos + phrase.len();

        let start_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
        let end_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if start_ok && end_ok {
            return Some((pos, phrase.len()));
        }
        // Advance past the first char of this candidate.
        search_from = pos + haystack[pos..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Whether `text` contains `phrase` on word boundaries.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    find_phrase(text, phrase).is_some()
}

/// Remove the first word-bounded `phrase` from `text`.
///
/// Returns `None` when the phrase is absent. Otherwise returns the remaining
/// text with punctuation trimmed at the seam; may be empty when the phrase was
/// the whole utterance.
pub fn strip_phrase(text: &str, phrase: &str) -> Option<String> {
    let (pos, len) = find_phrase(text, phrase)?;
    let before = text[..pos].trim_end_matches(SEAM_PUNCTUATION).trim();
    let after = text[pos + len..].trim_start_matches(SEAM_PUNCTUATION).trim();

    let joined = match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (false, true) => before.to_owned(),
        (true, false) => after.to_owned(),
        (false, false) => format!("{before} {after}"),
    };
    Some(joined)
}

/// Whether any of `phrases` occurs in `text` after normalization.
pub fn matches_any(text: &str, phrases: &[String]) -> bool {
    let clean = normalize(text);
    phrases
        .iter()
        .map(|p| normalize(p))
        .any(|p| contains_phrase(&clean, &p))
}
