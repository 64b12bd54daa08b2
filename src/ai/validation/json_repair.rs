//! JSON Repair
//!
//! Structured responses from local models are often almost-JSON:
//! - wrapped in markdown code fences (```json ... ```)
//! - trailing commas before `]` / `}`
//! - cut off mid-string or missing closing brackets
//! - surrounded by explanatory prose
//!
//! [`JsonRepairer`] tries the raw text first and then applies progressively
//! more invasive repairs until one parses.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ErrorCategory, NovelError, Result};

/// Parse a structured response, repairing common formatting problems.
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    JsonRepairer::default()
        .parse_or_repair(content)
        .map(|(value, _)| value)
}

// =============================================================================
// Lexical scanning
// =============================================================================

/// Tracks whether a character position sits inside a JSON string literal.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feed one character; returns true if it is structural (outside a string).
    fn structural(&mut self, ch: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        match ch {
            '\\' if self.in_string => {
                self.escaped = true;
                false
            }
            '"' => {
                self.in_string = !self.in_string;
                false
            }
            _ => !self.in_string,
        }
    }
}

// =============================================================================
// Repair steps
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum RepairStep {
    TrailingCommas,
    CloseOpenStrings,
    BalanceBrackets,
}

impl RepairStep {
    fn apply(self, input: &str) -> String {
        match self {
            Self::TrailingCommas => drop_trailing_commas(input),
            Self::CloseOpenStrings => close_open_strings(input),
            Self::BalanceBrackets => balance_brackets(input),
        }
    }
}

/// Repair passes, least invasive first. Each pass runs all of its steps in order.
const PASSES: &[&[RepairStep]] = &[
    &[RepairStep::TrailingCommas, RepairStep::BalanceBrackets],
    &[
        RepairStep::TrailingCommas,
        RepairStep::CloseOpenStrings,
        RepairStep::BalanceBrackets,
    ],
];

fn drop_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut state = StringState::default();
    let mut out = String::with_capacity(input.len());

    for (i, &ch) in chars.iter().enumerate() {
        if state.structural(ch) && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn close_open_strings(input: &str) -> String {
    let mut state = StringState::default();
    let mut out = String::with_capacity(input.len() + 4);

    for ch in input.chars() {
        if state.in_string && !state.escaped && matches!(ch, '\n' | '\r') {
            out.push('"');
            state.in_string = false;
        }
        state.structural(ch);
        out.push(ch);
    }
    if state.in_string {
        out.push('"');
    }
    out
}

fn balance_brackets(input: &str) -> String {
    let mut state = StringState::default();
    let mut open = Vec::new();

    for ch in input.chars() {
        if !state.structural(ch) {
            continue;
        }
        match ch {
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&ch) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = input.to_string();
    if state.in_string {
        out.push('"');
    }
    while let Some(closer) = open.pop() {
        out.push(closer);
    }
    out
}

/// First balanced `{...}` or `[...]` span inside surrounding prose.
fn embedded_span(input: &str) -> Option<&str> {
    let start = input.find(['{', '['])?;
    let mut state = StringState::default();
    let mut depth = 0usize;

    for (offset, ch) in input[start..].char_indices() {
        if !state.structural(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&input[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches('\u{feff}');
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(newline) => &s[newline + 1..],
            None => s.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }
    s.trim()
}

// =============================================================================
// JsonRepairer
// =============================================================================

#[derive(Debug, Default)]
pub struct JsonRepairer;

impl JsonRepairer {
    /// Parse JSON, repairing if needed. Returns `(value, was_repaired)`.
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = strip_fences(raw);

        if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
            return Ok((value, false));
        }
        debug!("Direct JSON parse failed, attempting repair");

        for (level, steps) in PASSES.iter().enumerate() {
            let repaired = steps
                .iter()
                .fold(cleaned.to_string(), |acc, step| step.apply(&acc));
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                warn!("JSON repaired at level {}", level + 1);
                return Ok((value, true));
            }
        }

        if let Some(span) = embedded_span(cleaned) {
            let span = drop_trailing_commas(span);
            if let Ok(value) = serde_json::from_str::<Value>(&span) {
                warn!("JSON extracted from mixed content");
                return Ok((value, true));
            }
        }

        Err(NovelError::llm_with_category(
            ErrorCategory::ParseError,
            "json",
            format!(
                "Response is not valid JSON. Preview: {}...",
                cleaned.chars().take(200).collect::<String>()
            ),
        ))
    }
}
