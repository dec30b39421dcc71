//! Export every saved item as one JSON document.
//!
//! Produces `{ "exportedAt": ..., "items": [...] }`, the full unfiltered
//! list in stored order.

use anyhow::{Context, Result};
use std::path::Path;

use crate::browse;
use crate::config::Config;

/// File name used when `--output` names a directory.
pub const DEFAULT_EXPORT_FILE: &str = "webstash-export.json";

/// Export all items as pretty JSON.
///
/// If `output` is `Some`, writes to that path (a directory gets
/// [`DEFAULT_EXPORT_FILE`] inside it). Otherwise writes to stdout.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let (app, store) = browse::open(config).await?;
    store.close().await;

    let export = app.export();
    let count = export.items.len();
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(DEFAULT_EXPORT_FILE)
            } else {
                path.to_path_buf()
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} items to {}", count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
