//! Text Extractor — pure transformation from a dump file's raw bytes to a
//! (source URL, normalized token stream) pair.
//!
//! No I/O beyond the initial read lives here, so the normalization pipeline
//! can be exercised directly in tests (§8 "Normalization law").

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use crate::error::Result;

const URL_DELIMITER: &str = "---URL---";

lazy_static! {
    static ref SCRIPT_STYLE_RE: Regex =
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1\s*>").unwrap();
    static ref BODY_RE: Regex = Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>").unwrap();
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Result of extracting one dump file: its source URL and the normalized,
/// tokenized body. `tokens` is empty when no `<body>` was found. `well_formed`
/// is false when the file had no `---URL---` delimiter at all, in which case
/// `url` holds the entire file and `tokens` is always empty — callers treat
/// this as a corrupt document (see §9 Open Questions).
pub struct ExtractedDocument {
    pub url: String,
    pub tokens: Vec<String>,
    pub well_formed: bool,
}

/// Read `path` and extract its URL and token stream.
///
/// Unreadable files are a transient I/O error (category 1 in §7) and are
/// surfaced to the caller, which logs and skips them; they do not panic or
/// abort ingestion.
pub fn extract_file(path: &Path) -> Result<ExtractedDocument> {
    let raw = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    Ok(extract_str(&text))
}

/// Extract URL and tokens from an already-decoded file body.
pub fn extract_str(text: &str) -> ExtractedDocument {
    let well_formed = has_url_delimiter(text);
    let (url, rest) = split_url(text);

    if !well_formed {
        return ExtractedDocument { url, tokens: Vec::new(), well_formed: false };
    }

    let Some(body) = extract_body(rest) else {
        return ExtractedDocument { url, tokens: Vec::new(), well_formed: true };
    };

    let normalized = normalize_body(&body);
    let tokens = tokenize(&normalized);

    ExtractedDocument { url, tokens, well_formed: true }
}

/// Split off the URL header: every line up to (not including) the first
/// line that is exactly `---URL---`, concatenated with no separator. Files
/// missing the delimiter return the whole file as the "url" and an empty
/// remainder, per the original prototype's behavior — callers treat that
/// as a corrupt document (see §9 Open Questions) rather than indexing it.
fn split_url(text: &str) -> (String, &str) {
    let mut offset = 0;
    let mut url = String::new();
    let mut found_delimiter = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.strip_suffix('\n').unwrap_or(line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);

        if trimmed == URL_DELIMITER {
            found_delimiter = true;
            offset += line.len();
            break;
        }

        url.push_str(trimmed);
        offset += line.len();
    }

    if found_delimiter {
        (url, &text[offset..])
    } else {
        (text.to_string(), "")
    }
}

/// Whether `text` had a `---URL---` delimiter — used by the spider to
/// classify files without one as corrupt documents.
pub fn has_url_delimiter(text: &str) -> bool {
    text.lines().any(|line| line.trim_end_matches('\r') == URL_DELIMITER)
}

fn extract_body(html: &str) -> Option<String> {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, "");
    BODY_RE
        .captures(&without_scripts)
        .map(|caps| caps[1].to_string())
}

/// Steps 3-6 of §4.1: strip comments, strip tags, decode entities, collapse
/// whitespace, lowercase.
fn normalize_body(body: &str) -> String {
    let without_comments = COMMENT_RE.replace_all(body, "");
    let without_tags = TAG_RE.replace_all(&without_comments, " ");
    let decoded = decode_entities(&without_tags);
    let collapsed = WHITESPACE_RE.replace_all(&decoded, " ");
    collapsed.trim().to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Split on whitespace; strip leading/trailing ASCII punctuation from each
/// token; discard empties.
fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(strip_ascii_punctuation)
        .filter(|t| !t.is_empty())
        .collect()
}

fn strip_ascii_punctuation(token: &str) -> String {
    token
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_term_and_case_folding() {
        let doc = extract_str("http://a\n---URL---\n<body>Hello hello world.</body>");
        assert_eq!(doc.url, "http://a");
        assert_eq!(doc.tokens, vec!["hello", "hello", "world"]);
    }

    #[test]
    fn entity_decoding_then_punctuation_strip() {
        let doc = extract_str("u\n---URL---\n<body>A &amp; B</body>");
        assert_eq!(doc.tokens, vec!["a", "b"]);
    }

    #[test]
    fn missing_body_yields_empty_tokens() {
        let doc = extract_str("u\n---URL---\n<html><head></head></html>");
        assert!(doc.tokens.is_empty());
    }

    #[test]
    fn script_and_style_sections_are_removed() {
        let doc = extract_str(
            "u\n---URL---\n<body><script>var x = 1;</script><style>.a{}</style>visible</body>",
        );
        assert_eq!(doc.tokens, vec!["visible"]);
    }

    #[test]
    fn html_comments_are_removed() {
        let doc = extract_str("u\n---URL---\n<body>before<!-- hidden -->after</body>");
        assert_eq!(doc.tokens, vec!["beforeafter"]);
    }

    #[test]
    fn missing_delimiter_is_detectable() {
        assert!(!has_url_delimiter("just a file with no delimiter"));
        assert!(has_url_delimiter("line one\n---URL---\nbody"));
    }

    #[test]
    fn multi_line_url_header_is_concatenated() {
        let doc = extract_str("http://example.com/\npath\n---URL---\n<body>x</body>");
        assert_eq!(doc.url, "http://example.com/path");
    }
}
