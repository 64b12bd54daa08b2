//! Shared text helpers used by prompts and stage bookkeeping.

use serde::Serialize;

/// Serialize an enum to its serde string representation (without quotes).
/// Uses serde_json internally so the result matches the
/// `#[serde(rename_all = ...)]` attributes on the enum.
pub fn enum_to_str<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Last `max_chars` characters of `text`, cut on a char boundary.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Single-line preview for logs and progress output.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", head_chars(&flat, max_chars))
    }
}
