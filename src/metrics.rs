//! Deterministic text statistics computed from generated responses.

use std::sync::OnceLock;

use regex::Regex;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word regex"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]").expect("sentence regex"))
}

/// Word and sentence counts for one generated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
}

/// Computes both statistics in one pass over the text.
pub fn measure(text: &str) -> TextMetrics {
    TextMetrics {
        word_count: word_count(text),
        sentence_count: sentence_count(text),
    }
}

/// Counts word-character runs. Empty text counts zero.
pub fn word_count(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Counts sentence terminators (`.`, `!`, `?`).
pub fn sentence_count(text: &str) -> usize {
    sentence_re().find_iter(text).count()
}
