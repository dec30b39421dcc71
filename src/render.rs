//! Plain-text cards for the terminal.
//!
//! Two kinds of card: saved items (the browse listing) and answer records
//! (structured model replies). Both are built as strings so the commands
//! decide where they go.

use chrono::{Local, TimeZone};
use serde_json::{Map, Value};
use std::fmt::Display;

use webstash_core::filter::{parse_timestamp, DayGroup};
use webstash_core::models::{Item, ItemType};
use webstash_core::normalize::Normalized;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const HEADER_KEYS: [&str; 3] = ["title", "name", "heading"];

/// Render a normalized answer: cards for records, the reply itself otherwise.
pub fn render_answer(answer: &Normalized) -> String {
    render_answer_in(answer, &Local)
}

/// Render one saved item as a card.
pub fn render_item(item: &Item) -> String {
    render_item_in(item, &Local)
}

/// Render the browse listing, one heading per day.
pub fn render_groups(groups: &[DayGroup<'_>]) -> String {
    let mut out = String::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("── {} ──\n", group.label));
        for item in &group.items {
            out.push_str(&render_item(item));
            out.push('\n');
        }
    }
    out
}

fn render_answer_in<Tz: TimeZone>(answer: &Normalized, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match answer {
        Normalized::PlainText(text) => text.clone(),
        Normalized::Structured(records) if records.is_empty() => "No data returned.".to_string(),
        Normalized::Structured(records) => records
            .iter()
            .map(|r| render_record(r, tz))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn render_record<Tz: TimeZone>(value: &Value, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match value {
        Value::Object(map) => render_object(map, tz),
        other => scalar_text(other),
    }
}

fn render_object<Tz: TimeZone>(map: &Map<String, Value>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let header = HEADER_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    });

    let mut lines = Vec::new();
    if let Some(title) = header {
        lines.push(title.to_string());
    }
    for (key, value) in map {
        if HEADER_KEYS.contains(&key.as_str()) {
            continue;
        }
        lines.push(format!("{}: {}", key, field_text(key, value, tz)));
    }
    lines.join("\n")
}

fn field_text<Tz: TimeZone>(key: &str, value: &Value, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match value {
        Value::String(s) if key == "createdAt" => local_time(s, tz).unwrap_or_else(|| s.clone()),
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) if s.starts_with('#') => s.clone(),
                Value::String(s) => format!("#{}", s),
                other => scalar_text(other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn local_time<Tz: TimeZone>(ts: &str, tz: &Tz) -> Option<String>
where
    Tz::Offset: Display,
{
    parse_timestamp(ts).map(|dt| dt.with_timezone(tz).format(TIME_FORMAT).to_string())
}

fn item_heading(item: &Item) -> String {
    let title = item.title_or_empty().trim();
    if !title.is_empty() {
        return title.to_string();
    }
    match item.kind {
        ItemType::Note => "Note".to_string(),
        other => other.as_str().to_uppercase(),
    }
}

fn render_item_in<Tz: TimeZone>(item: &Item, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let when = local_time(&item.created_at, tz).unwrap_or_else(|| item.created_at.clone());
    let mut lines = vec![
        item_heading(item),
        format!("{} • {}", item.kind, when),
        item.content.clone(),
    ];
    if !item.tags.is_empty() {
        lines.push(
            item.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    lines.push(format!("id: {}", item.id));
    lines.join("\n")
}
