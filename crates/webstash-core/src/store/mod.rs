//! Storage abstraction for WebStash.
//!
//! The [`ItemStore`] trait persists the whole ordered item list as a single
//! value: read it all, or replace it all. There is no per-item write; the
//! caller owns ordering (most recent first) and hands back the full list.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Item;

/// Key under which the item list is stored.
pub const DEFAULT_STORAGE_KEY: &str = "webstash_items_v1";

/// Whole-list persistence for saved items.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load_all`](ItemStore::load_all) | Read the stored list; empty when nothing usable is stored |
/// | [`save_all`](ItemStore::save_all) | Replace the stored list |
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Read every stored item, in stored order.
    ///
    /// An absent or malformed value is an empty list, not an error. Errors
    /// are reserved for an unreachable backend.
    async fn load_all(&self) -> Result<Vec<Item>>;

    /// Replace the stored list with `items`.
    async fn save_all(&self, items: &[Item]) -> Result<()>;
}

/// Decode a stored value, treating anything but an array of items as empty.
pub fn decode_items(raw: Option<&str>) -> Vec<Item> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Item>>(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Stored item list is malformed; treating as empty");
            Vec::new()
        }
    }
}

/// Encode the item list as the stored JSON array.
pub fn encode_items(items: &[Item]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}
