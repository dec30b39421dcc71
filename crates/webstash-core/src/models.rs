//! Core data models used throughout WebStash.
//!
//! An [`Item`] is a saved note, link, or media reference. Items are
//! immutable once created; the only mutation the store supports is
//! deletion by id.

use std::collections::HashSet;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ItemError;

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".m4v", ".avi"];

/// What kind of thing an item's content refers to.
///
/// Derived once from the content at creation time by [`ItemType::classify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Note,
    Link,
    Image,
    Video,
}

impl ItemType {
    /// Classify content by its shape.
    ///
    /// Content that parses as an absolute URL is a `link`, unless the
    /// lowercased URL path ends in a known image or video extension.
    /// Everything else is a `note`. Never fails.
    ///
    /// ```rust
    /// use webstash_core::models::ItemType;
    ///
    /// assert_eq!(ItemType::classify("https://example.com/photo.jpg"), ItemType::Image);
    /// assert_eq!(ItemType::classify("https://example.com/page"), ItemType::Link);
    /// assert_eq!(ItemType::classify("hello world"), ItemType::Note);
    /// ```
    pub fn classify(content: &str) -> ItemType {
        let Ok(url) = Url::parse(content.trim()) else {
            return ItemType::Note;
        };
        let path = url.path().to_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            ItemType::Image
        } else if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            ItemType::Video
        } else {
            ItemType::Link
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Note => "note",
            ItemType::Link => "link",
            ItemType::Image => "image",
            ItemType::Video => "video",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved note, link, or media reference.
///
/// Serialized as `{id, createdAt, title, content, tags, type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Opaque unique identifier (UUID v4).
    pub id: String,
    /// Creation timestamp, RFC 3339 in UTC.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The saved text or URL. Never empty.
    pub content: String,
    /// Lowercase tags without a leading `#`, deduplicated.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: ItemType,
}

impl Item {
    /// Create a new item from raw form input.
    ///
    /// Title and content are trimmed; an empty title becomes `None`.
    /// `raw_tags` is parsed with [`normalize_tags`].
    pub fn new(title: &str, content: &str, raw_tags: &str) -> Result<Item, ItemError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ItemError::EmptyContent);
        }
        let title = title.trim();

        Ok(Item {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now_iso(),
            title: (!title.is_empty()).then(|| title.to_string()),
            content: content.to_string(),
            tags: normalize_tags(raw_tags),
            kind: ItemType::classify(content),
        })
    }

    /// Title for display and sorting; empty when absent.
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse free-form tag input into a normalized tag list.
///
/// Splits on runs of whitespace and commas, strips leading `#`,
/// lowercases, drops empties, and deduplicates keeping first-seen order.
///
/// ```rust
/// use webstash_core::models::normalize_tags;
///
/// assert_eq!(normalize_tags("#Rocket, space rocket"), vec!["rocket", "space"]);
/// ```
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
