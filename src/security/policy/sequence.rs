use super::lexical::find_phrase;

/// True when every phrase occurs in `haystack`, each one starting strictly
/// after the start of the previous phrase's match.
///
/// An empty phrase list never matches.
pub fn phrases_in_order(haystack: &str, phrases: &[String]) -> bool {
    if phrases.is_empty() {
        return false;
    }

    let mut from = 0;
    for phrase in phrases {
        let Some(start) = find_phrase(haystack, phrase, from) else {
            return false;
        };
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }
    true
}
