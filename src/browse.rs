//! Save, list and delete commands.
//!
//! Each command loads the stored list into an [`AppState`], performs one
//! operation, and prints the result. None of them needs the model, so the
//! state is built over [`DisabledModel`].

use anyhow::{bail, Result};
use chrono::Local;

use webstash_core::filter::{group_by_day, SortOrder};
use webstash_core::session::DisabledModel;
use webstash_core::state::AppState;

use crate::config::Config;
use crate::render;
use crate::store::SqliteItemStore;

/// Load the stored list into a state that needs no model.
pub(crate) async fn open(config: &Config) -> Result<(AppState<DisabledModel>, SqliteItemStore)> {
    let store = SqliteItemStore::open(config).await?;
    let mut app = AppState::new(
        DisabledModel,
        config.model.session_settings(),
        config.dataset.limits(),
    );
    app.load(&store).await;
    Ok((app, store))
}

/// Save one item and print its id.
pub async fn run_save(
    config: &Config,
    content: &str,
    title: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let (mut app, store) = open(config).await?;
    let item = app
        .save(&store, title.unwrap_or(""), content, tags.unwrap_or(""))
        .await?;
    println!("Saved ✓ {}", item.id);
    store.close().await;
    Ok(())
}

/// Print the filtered listing, grouped by day, or as a JSON array.
pub async fn run_list(config: &Config, query: &str, order: SortOrder, json: bool) -> Result<()> {
    let (mut app, store) = open(config).await?;
    store.close().await;

    let view = app.apply_filter(query, order);
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }
    if view.is_empty() {
        println!("No items.");
        return Ok(());
    }

    let groups = group_by_day(view, &Local, Local::now().date_naive());
    print!("{}", render::render_groups(&groups));
    Ok(())
}

/// Delete one item by id.
pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let (mut app, store) = open(config).await?;
    let removed = app.delete(&store, id).await?;
    store.close().await;
    if !removed {
        bail!("No item with id: {}", id);
    }
    println!("Deleted {}", id);
    Ok(())
}
