use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Markers after which a credential-like token is redacted.
const SECRET_MARKERS: [&str; 9] = [
    "sk-",
    "Bearer ",
    "bearer ",
    "api_key=",
    "access_token=",
    "\"api_key\":\"",
    "\"access_token\":\"",
    "\"token\":\"",
    "\"secret\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|&(_, c)| !is_secret_char(c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn scrub_after_marker(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        // Bare marker without a token value.
        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(content_start..end, REDACTED);
        search_from = content_start + REDACTED.len();
    }
}

/// Redact API keys and bearer tokens echoed back in backend error bodies.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|m| input.contains(m)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        scrub_after_marker(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub and truncate an error body for logs and error messages.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let end = scrubbed
        .char_indices()
        .nth(MAX_API_ERROR_CHARS)
        .map_or(scrubbed.len(), |(i, _)| i);
    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized error from a non-success backend response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_is_borrowed() {
        assert!(matches!(
            scrub_secret_patterns("quota exceeded"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn redacts_openai_style_keys() {
        let out = scrub_secret_patterns("Incorrect API key provided: sk-abc123XYZ.");
        assert_eq!(out, "Incorrect API key provided: sk-[REDACTED]");
    }

    #[test]
    fn redacts_bearer_and_json_tokens() {
        let out = scrub_secret_patterns(r#"Authorization: Bearer abc.def {"token":"zzz"}"#);
        assert!(!out.contains("abc.def"));
        assert!(!out.contains("zzz"));
    }

    #[test]
    fn bare_marker_is_left_alone() {
        assert_eq!(scrub_secret_patterns("api_key= missing"), "api_key= missing");
    }

    #[test]
    fn long_errors_are_truncated() {
        let long = "x".repeat(500);
        let out = sanitize_api_error(&long);
        assert_eq!(out.len(), MAX_API_ERROR_CHARS + 3);
        assert!(out.ends_with("..."));
    }
}
