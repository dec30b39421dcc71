//! Filter engine for the browse view.
//!
//! A query is split on whitespace. Tokens starting with `#` are tag
//! filters (exact, case-insensitive, "any of"); the remaining tokens are
//! rejoined with single spaces and matched as a case-insensitive
//! substring against the title, the content, and each tag. Both
//! predicates must hold.
//!
//! The output of [`filter_items`] is the filtered view that the
//! question pipeline reasons over; [`crate::state::AppState`] caches it.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::models::Item;

/// Sort order of the filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// `createdAt` descending.
    #[default]
    Newest,
    /// `createdAt` ascending.
    Oldest,
    /// Title ascending (absent titles sort as the empty string).
    Title,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "title" => Ok(SortOrder::Title),
            other => Err(format!(
                "Unknown sort order: '{}'. Use newest, oldest, or title.",
                other
            )),
        }
    }
}

/// A search query split into tag terms and free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Lowercased tag terms, without the `#`.
    pub tags: Vec<String>,
    /// Non-tag tokens joined by single spaces.
    pub text: String,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> ParsedQuery {
        let mut tags = Vec::new();
        let mut words = Vec::new();
        for token in query.split_whitespace() {
            if let Some(tag) = token.strip_prefix('#') {
                // A bare `#` names no tag.
                if !tag.is_empty() {
                    tags.push(tag.to_lowercase());
                }
            } else {
                words.push(token);
            }
        }
        ParsedQuery {
            tags,
            text: words.join(" "),
        }
    }

    /// True when the query has neither tag nor text terms.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.text.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        let text_match = self.text.is_empty() || {
            let needle = self.text.to_lowercase();
            contains_ci(item.title_or_empty(), &needle)
                || contains_ci(&item.content, &needle)
                || item.tags.iter().any(|t| contains_ci(t, &needle))
        };
        let tag_match = self.tags.is_empty()
            || item
                .tags
                .iter()
                .any(|t| self.tags.contains(&t.to_lowercase()));
        text_match && tag_match
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// Produce the filtered view: every item matching `query`, in `order`.
///
/// Never fails; a blank query matches everything.
pub fn filter_items(items: &[Item], query: &str, order: SortOrder) -> Vec<Item> {
    let parsed = ParsedQuery::parse(query);
    let mut filtered: Vec<Item> = items
        .iter()
        .filter(|it| parsed.matches(it))
        .cloned()
        .collect();
    sort_items(&mut filtered, order);
    filtered
}

/// Sort items in place.
pub fn sort_items(items: &mut [Item], order: SortOrder) {
    match order {
        SortOrder::Newest => {
            items.sort_by(|a, b| timestamp_millis(&b.created_at).cmp(&timestamp_millis(&a.created_at)))
        }
        SortOrder::Oldest => {
            items.sort_by(|a, b| timestamp_millis(&a.created_at).cmp(&timestamp_millis(&b.created_at)))
        }
        SortOrder::Title => {
            items.sort_by(|a, b| compare_titles(a.title_or_empty(), b.title_or_empty()))
        }
    }
}

/// Case-insensitive title order; on case-only ties lowercase sorts first.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Milliseconds since the epoch, or `None` when the timestamp is unreadable.
///
/// `None` orders before every real timestamp, so unreadable items count
/// as the oldest.
pub fn timestamp_millis(ts: &str) -> Option<i64> {
    parse_timestamp(ts).map(|dt| dt.timestamp_millis())
}

/// Parse an ISO-8601 timestamp, with or without an offset (naive means UTC).
pub fn parse_timestamp(ts: &str) -> Option<DateTime<chrono::Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Items sharing a calendar-day label, for the browse listing.
#[derive(Debug, Clone)]
pub struct DayGroup<'a> {
    /// `Today`, `Yesterday`, `Mon D, YYYY`, or `Unknown date`.
    pub label: String,
    pub items: Vec<&'a Item>,
}

/// Group items by the calendar day of `createdAt` in `tz`.
///
/// Items keep their filtered order within a group; groups appear in the
/// order their label is first seen.
pub fn group_by_day<'a, Tz: TimeZone>(
    items: &'a [Item],
    tz: &Tz,
    today: NaiveDate,
) -> Vec<DayGroup<'a>> {
    let mut groups: Vec<DayGroup<'a>> = Vec::new();
    for item in items {
        let label = match parse_timestamp(&item.created_at) {
            Some(dt) => day_label(dt.with_timezone(tz).date_naive(), today),
            None => "Unknown date".to_string(),
        };
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.items.push(item),
            None => groups.push(DayGroup {
                label,
                items: vec![item],
            }),
        }
    }
    groups
}

fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    match (today - day).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        _ => day.format("%b %-d, %Y").to_string(),
    }
}
