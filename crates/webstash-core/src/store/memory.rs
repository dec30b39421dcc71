//! In-memory [`ItemStore`] implementation for tests and embedding.
//!
//! Holds the encoded JSON value behind `std::sync::RwLock`, so it goes
//! through the same decode path as a persistent backend.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::Item;

use super::{decode_items, encode_items, ItemStore};

/// In-memory store holding the serialized item list.
#[derive(Default)]
pub struct InMemoryItemStore {
    value: RwLock<Option<String>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose stored value is `raw` verbatim.
    pub fn with_raw(raw: &str) -> Self {
        Self {
            value: RwLock::new(Some(raw.to_string())),
        }
    }

    /// The stored value, if any.
    pub fn raw(&self) -> Option<String> {
        self.value.read().ok().and_then(|v| v.clone())
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn load_all(&self) -> Result<Vec<Item>> {
        let value = self
            .value
            .read()
            .map_err(|_| anyhow!("item store lock poisoned"))?;
        Ok(decode_items(value.as_deref()))
    }

    async fn save_all(&self, items: &[Item]) -> Result<()> {
        let encoded = encode_items(items)?;
        let mut value = self
            .value
            .write()
            .map_err(|_| anyhow!("item store lock poisoned"))?;
        *value = Some(encoded);
        Ok(())
    }
}
