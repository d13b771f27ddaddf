//! JSON recovery from free-form model output.
//!
//! Model responses arrive fenced in markdown, wrapped in prose, or with
//! trailing commas. `extract_json` tries, per candidate text: a direct parse,
//! a parse with trailing commas removed, and then every balanced top-level
//! `{...}` region in order of appearance. The first value the normalizer
//! recognizes as a weekly program with at least one block record wins; a
//! program-shaped value with no blocks is returned only when nothing better
//! turns up.

use serde_json::Value;

use super::normalize::normalize;

/// Upper bound on balanced regions tried per candidate.
pub const MAX_BALANCED_CANDIDATES: usize = 8;

/// Scanner state while walking model output character by character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    Escaped,
}

/// Recover the first weekly-program-shaped JSON value from `text`.
///
/// Returns the parsed value unchanged (not normalized), or `None` when
/// nothing in the text qualifies.
pub fn extract_json(text: &str) -> Option<Value> {
    let mut candidates: Vec<&str> = Vec::with_capacity(2);
    if let Some(fenced) = strip_code_fence(text) {
        candidates.push(fenced);
    }
    candidates.push(text);

    let mut empty_program: Option<Value> = None;
    for candidate in candidates {
        let whole = parse_lenient(candidate);
        let regions = balanced_objects(candidate, MAX_BALANCED_CANDIDATES)
            .into_iter()
            .filter_map(parse_lenient);

        for value in whole.into_iter().chain(regions) {
            match normalize(&value) {
                Some(program) if program.has_block_records() => return Some(value),
                Some(_) if empty_program.is_none() => empty_program = Some(value),
                _ => {}
            }
        }
    }
    empty_program
}

/// Body of the first markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_ticks = &text[start + 3..];
    // Skip an optional language tag on the opening line.
    let body_start = match after_ticks.find('\n') {
        Some(nl) if after_ticks[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => nl + 1,
        _ => 0,
    };
    let body = &after_ticks[body_start..];
    let end = body.find("```")?;
    let inner = body[..end].trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Parse as JSON, retrying once with trailing commas removed.
pub fn parse_lenient(candidate: &str) -> Option<Value> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed)
        .ok()
        .or_else(|| serde_json::from_str(&strip_trailing_commas(trimmed)).ok())
}

/// Remove commas that directly precede `}` or `]` outside string literals.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::Normal;

    for (i, &ch) in chars.iter().enumerate() {
        match state {
            ScanState::Escaped => state = ScanState::InString,
            ScanState::InString => match ch {
                '\\' => state = ScanState::Escaped,
                '"' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::Normal => {
                if ch == '"' {
                    state = ScanState::InString;
                } else if ch == ',' {
                    let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if matches!(next, Some('}') | Some(']')) {
                        continue;
                    }
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Balanced top-level `{...}` regions of `text`, in order of appearance.
///
/// String literals (with escaped quotes) are skipped so braces inside them do
/// not count. An object that never closes yields nothing.
pub fn balanced_objects(text: &str, limit: usize) -> Vec<&str> {
    let mut found = Vec::new();
    let mut state = ScanState::Normal;
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in text.char_indices() {
        match state {
            ScanState::Escaped => state = ScanState::InString,
            ScanState::InString => match ch {
                '\\' => state = ScanState::Escaped,
                '"' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::Normal => match ch {
                // Quotes only open strings inside an object; prose apostrophes
                // and stray quotes outside are ignored.
                '"' if depth > 0 => state = ScanState::InString,
                '{' => {
                    if depth == 0 {
                        start = i;
                    }
                    depth += 1;
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        found.push(&text[start..=i]);
                        if found.len() >= limit {
                            break;
                        }
                    }
                }
                _ => {}
            },
        }
    }
    found
}
