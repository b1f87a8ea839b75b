//! Whole-phrase matching over lowercased text.
//!
//! A phrase only counts when it is not glued to a neighbouring word
//! character, so `hack` never fires inside `hackathon`.

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_clean(haystack: &str, start: usize, phrase: &str) -> bool {
    let needs_boundary = phrase.chars().next().is_some_and(is_word_char);
    !needs_boundary
        || haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_word_char(c))
}

fn ends_clean(haystack: &str, end: usize, phrase: &str) -> bool {
    let needs_boundary = phrase.chars().next_back().is_some_and(is_word_char);
    !needs_boundary || haystack[end..].chars().next().is_none_or(|c| !is_word_char(c))
}

/// Byte offset of the first whole-phrase occurrence of `phrase` at or after
/// `from`. Both inputs are expected to be lowercased already.
pub fn find_phrase(haystack: &str, phrase: &str, from: usize) -> Option<usize> {
    if phrase.is_empty() || from > haystack.len() {
        return None;
    }

    let mut cursor = from;
    while cursor <= haystack.len() {
        let rel = haystack.get(cursor..)?.find(phrase)?;
        let start = cursor + rel;
        let end = start + phrase.len();
        if starts_clean(haystack, start, phrase) && ends_clean(haystack, end, phrase) {
            return Some(start);
        }
        // Advance one character past the rejected start.
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        cursor = start + step;
    }
    None
}

pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    find_phrase(haystack, phrase, 0).is_some()
}

/// Every phrase from `phrases` that occurs in `haystack`, in configured order.
pub fn matched_phrases(haystack: &str, phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .filter(|phrase| contains_phrase(haystack, phrase))
        .cloned()
        .collect()
}
