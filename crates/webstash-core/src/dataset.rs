//! JSON Lines dataset handed to the model.
//!
//! One JSON object per item, with exactly the fields
//! `{id, title, tags, content, createdAt, type}` in that order. Content is
//! truncated by characters without an ellipsis. Output is deterministic
//! for a given input and limits.

use serde::Serialize;

use crate::models::{Item, ItemType};

/// Default maximum number of items in a dataset.
pub const DEFAULT_MAX_ITEMS: usize = 200;
/// Default maximum number of content characters per item.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 400;

/// Size limits for [`serialize_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetLimits {
    pub max_items: usize,
    pub max_content_chars: usize,
}

impl Default for DatasetLimits {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetRecord<'a> {
    id: &'a str,
    title: &'a str,
    tags: &'a [String],
    content: &'a str,
    created_at: &'a str,
    #[serde(rename = "type")]
    kind: ItemType,
}

/// Serialize the first `limits.max_items` items, in order, as JSON Lines.
///
/// Lines are joined with `\n`; there is no trailing newline. An empty
/// input produces an empty string.
pub fn serialize_dataset(items: &[Item], limits: DatasetLimits) -> String {
    items
        .iter()
        .take(limits.max_items)
        .map(|it| {
            let record = DatasetRecord {
                id: &it.id,
                title: it.title_or_empty(),
                tags: &it.tags,
                content: truncate_chars(&it.content, limits.max_content_chars),
                created_at: &it.created_at,
                kind: it.kind,
            };
            // A struct of strings and a unit enum always serializes.
            serde_json::to_string(&record).unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
