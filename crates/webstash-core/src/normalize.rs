//! Recover structured data from a model reply.
//!
//! Models asked for JSON answer with bare JSON, fenced JSON, JSON Lines,
//! or JSON buried in prose. [`normalize`] tries, in order:
//!
//! 1. a native structured value returned by the facility,
//! 2. the whole text (after stripping a BOM and an outer code fence),
//! 3. JSON Lines, keeping only lines that are objects,
//! 4. the first balanced `{...}` or `[...]` block, found by [`BracketScanner`],
//!
//! and otherwise hands back the original text. It never fails.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::session::ModelOutput;

/// Result of normalizing a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Records to render as cards. A parsed array contributes its
    /// elements; any other value is a single record.
    Structured(Vec<Value>),
    /// The reply, unchanged, to render as prose.
    PlainText(String),
}

/// Normalize whatever the facility returned.
pub fn normalize(output: ModelOutput) -> Normalized {
    match output {
        ModelOutput::Structured(value) => Normalized::Structured(into_records(value)),
        ModelOutput::Text(text) => normalize_text(&text),
    }
}

/// Normalize a text reply.
pub fn normalize_text(raw: &str) -> Normalized {
    let trimmed = raw.trim();
    let unboxed = trimmed.strip_prefix('\u{feff}').unwrap_or(trimmed);
    let body = strip_code_fence(unboxed);

    if let Some(value) = parse_direct(body) {
        return Normalized::Structured(into_records(value));
    }
    if let Some(records) = parse_json_lines(body) {
        return Normalized::Structured(records);
    }
    if let Some(value) = extract_embedded(body) {
        return Normalized::Structured(into_records(value));
    }
    Normalized::PlainText(raw.to_string())
}

fn into_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?is)^\s*```(?:json|javascript)?\s*(.*?)\s*```").expect("static regex is valid")
    })
}

/// Return the interior of a leading code fence, or `s` unchanged.
fn strip_code_fence(s: &str) -> &str {
    fence_regex()
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(s)
}

/// Whole-text parse; only text that begins like an object or array counts.
fn parse_direct(s: &str) -> Option<Value> {
    let t = s.trim();
    if !(t.starts_with('{') || t.starts_with('[')) {
        return None;
    }
    serde_json::from_str(t).ok()
}

/// Parse lines shaped like `{...}` as objects; other lines are dropped.
fn parse_json_lines(s: &str) -> Option<Vec<Value>> {
    let records: Vec<Value> = s
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(Value::is_object)
        .collect();
    (!records.is_empty()).then_some(records)
}

/// Parse the first balanced block in `s`. A block that closes but fails to
/// parse ends the search.
fn extract_embedded(s: &str) -> Option<Value> {
    let (start, end) = BracketScanner::find_block(s)?;
    serde_json::from_str(&s[start..end]).ok()
}

/// Scanner state between characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InString,
    /// Inside a string, immediately after an unescaped backslash.
    Escaped,
}

/// Balanced-bracket scanner over one bracket type, aware of JSON strings.
///
/// Brackets inside quoted strings do not count; a backslash inside a
/// string escapes the next character.
#[derive(Debug, Clone)]
pub struct BracketScanner {
    open: char,
    close: char,
    depth: usize,
    state: ScanState,
}

impl BracketScanner {
    /// Scanner for blocks opened by `open` (`{` or `[`).
    pub fn new(open: char) -> Self {
        let close = if open == '{' { '}' } else { ']' };
        Self {
            open,
            close,
            depth: 0,
            state: ScanState::Outside,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Feed one character. Returns `true` when it closes the outermost block.
    pub fn feed(&mut self, ch: char) -> bool {
        match self.state {
            ScanState::Escaped => {
                self.state = ScanState::InString;
                false
            }
            ScanState::InString => {
                match ch {
                    '\\' => self.state = ScanState::Escaped,
                    '"' => self.state = ScanState::Outside,
                    _ => {}
                }
                false
            }
            ScanState::Outside => {
                if ch == '"' {
                    self.state = ScanState::InString;
                } else if ch == self.open {
                    self.depth += 1;
                } else if ch == self.close && self.depth > 0 {
                    self.depth -= 1;
                    return self.depth == 0;
                }
                false
            }
        }
    }

    /// Byte range of the first balanced block opened by whichever of `{`
    /// or `[` occurs first in `s`.
    pub fn find_block(s: &str) -> Option<(usize, usize)> {
        let start = s.find(|c: char| c == '{' || c == '[')?;
        let open = s[start..].chars().next()?;
        let mut scanner = BracketScanner::new(open);
        for (offset, ch) in s[start..].char_indices() {
            if scanner.feed(ch) {
                return Some((start, start + offset + ch.len_utf8()));
            }
        }
        None
    }
}
