//! Small string helpers for prompt rendering.

use std::borrow::Cow;

pub const ELLIPSIS: &str = "...";

/// Cuts `s` to `max_chars` characters and appends [`ELLIPSIS`] when it was longer.
pub fn truncate(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((byte_idx, _)) => Cow::Owned(format!("{}{}", &s[..byte_idx], ELLIPSIS)),
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Appends "s" for counts above one. No irregular plurals.
pub fn pluralize(word: &str, count: u32) -> String {
    if count > 1 {
        format!("{word}s")
    } else {
        word.to_string()
    }
}

/// `round(ratio * 100)`, half away from zero.
pub fn percent(ratio: f64) -> i64 {
    (ratio * 100.0).round() as i64
}

pub fn indefinite_article(word: &str) -> &'static str {
    match word.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}
