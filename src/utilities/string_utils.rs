//! String helpers for prompt and label formatting.

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Uppercase the first character and lowercase the rest.
///
/// Used for tool output labels, so `"wiki"` becomes `"Wiki"` and
/// `"WebSearch"` becomes `"Websearch"`.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Strip markup tags and collapse whitespace.
pub fn strip_html(input: &str) -> String {
    let without_tags = HTML_TAG.replace_all(input, " ");
    WHITESPACE_RUN
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Truncate `input` to at most `max_chars` characters for log output.
pub fn truncate_for_log(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("wiki"), "Wiki");
        assert_eq!(capitalize("memory"), "Memory");
        assert_eq!(capitalize("WebSearch"), "Websearch");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Rome is <b>the</b>\n capital.</p>"),
            "Rome is the capital."
        );
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("héllo", 2), "hé");
        assert_eq!(truncate_for_log("hi", 10), "hi");
    }
}
