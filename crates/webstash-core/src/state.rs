//! Application state.
//!
//! [`AppState`] is the single owner of the in-memory item list, the last
//! filtered view, and the model session. Every mutation goes through a
//! `&mut self` method, so there is exactly one writer at a time; a
//! multi-task host must keep the state behind one owning task or a mutex.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dataset::{serialize_dataset, DatasetLimits};
use crate::error::ModelError;
use crate::filter::{filter_items, SortOrder};
use crate::models::{now_iso, Item};
use crate::normalize::{normalize, Normalized};
use crate::prompt::compose_grounded_prompt;
use crate::session::{LanguageModel, SessionManager, SessionSettings};
use crate::store::ItemStore;

/// Full, unfiltered export of the item list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    pub exported_at: String,
    pub items: Vec<Item>,
}

/// The active query, sort order and the view they produced.
#[derive(Debug, Clone)]
struct View {
    query: String,
    order: SortOrder,
    items: Vec<Item>,
}

pub struct AppState<M> {
    items: Vec<Item>,
    view: Option<View>,
    session: SessionManager<M>,
    limits: DatasetLimits,
}

impl<M: LanguageModel> AppState<M> {
    pub fn new(model: M, settings: SessionSettings, limits: DatasetLimits) -> Self {
        Self {
            items: Vec::new(),
            view: None,
            session: SessionManager::new(model, settings),
            limits,
        }
    }

    /// Replace the in-memory list with the store's contents.
    ///
    /// An unreadable store yields an empty list.
    pub async fn load<S: ItemStore + ?Sized>(&mut self, store: &S) {
        self.items = match store.load_all().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Item store unavailable; starting empty");
                Vec::new()
            }
        };
        debug!(count = self.items.len(), "Loaded items");
        self.refresh_view();
    }

    /// All items, most recent first by insertion.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The dataset the question pipeline uses: the last filtered view, or
    /// every item when no filter has been applied yet.
    pub fn filtered_view(&self) -> &[Item] {
        match &self.view {
            Some(view) => &view.items,
            None => &self.items,
        }
    }

    /// Create an item, prepend it, and persist the new list.
    ///
    /// The in-memory list changes only after the store write succeeds.
    pub async fn save<S: ItemStore + ?Sized>(
        &mut self,
        store: &S,
        title: &str,
        content: &str,
        raw_tags: &str,
    ) -> Result<Item> {
        let item = Item::new(title, content, raw_tags)?;
        let mut next = Vec::with_capacity(self.items.len() + 1);
        next.push(item.clone());
        next.extend(self.items.iter().cloned());
        store.save_all(&next).await?;
        self.items = next;
        self.refresh_view();
        Ok(item)
    }

    /// Delete by id and persist. Returns whether an item was removed.
    pub async fn delete<S: ItemStore + ?Sized>(&mut self, store: &S, id: &str) -> Result<bool> {
        if !self.items.iter().any(|it| it.id == id) {
            return Ok(false);
        }
        let next: Vec<Item> = self.items.iter().filter(|it| it.id != id).cloned().collect();
        store.save_all(&next).await?;
        self.items = next;
        self.refresh_view();
        Ok(true)
    }

    /// Run the filter engine and cache the result as the filtered view.
    pub fn apply_filter(&mut self, query: &str, order: SortOrder) -> &[Item] {
        let items = filter_items(&self.items, query, order);
        let view = self.view.insert(View {
            query: query.to_string(),
            order,
            items,
        });
        &view.items
    }

    fn refresh_view(&mut self) {
        if let Some(view) = &self.view {
            let (query, order) = (view.query.clone(), view.order);
            self.apply_filter(&query, order);
        }
    }

    /// JSON Lines dataset for the current filtered view.
    pub fn dataset(&self) -> String {
        serialize_dataset(self.filtered_view(), self.limits)
    }

    /// The full grounded prompt for `question`.
    pub fn grounded_prompt(&self, question: &str) -> String {
        compose_grounded_prompt(&self.dataset(), question)
    }

    /// Ask a question over exactly the current filtered view.
    pub async fn ask(&mut self, question: &str) -> Result<Normalized, ModelError> {
        self.session.seed_defaults().await?;
        let prompt = self.grounded_prompt(question);
        debug!(
            items = self.filtered_view().len().min(self.limits.max_items),
            prompt_len = prompt.len(),
            "Asking model"
        );
        let output = self.session.prompt(&prompt).await?;
        Ok(normalize(output))
    }

    pub fn session(&self) -> &SessionManager<M> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<M> {
        &mut self.session
    }

    /// Snapshot of every item with an export timestamp.
    pub fn export(&self) -> Export {
        Export {
            exported_at: now_iso(),
            items: self.items.clone(),
        }
    }
}
