//! # Webstash
//!
//! A local-first stash for notes, links and media references, with
//! grounded questions over whatever the current filter shows.
//!
//! The pure pipeline (filtering, dataset serialization, prompt
//! composition, session management, response normalization) lives in
//! the `webstash-core` crate. This crate adds the runtime around it:
//! configuration, SQLite persistence, the Ollama facility, terminal
//! rendering and the `stash` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │  SQLite  │◀─▶│   AppState   │──▶│ SessionManager│──▶ Ollama
//! │  (kv)    │   │ items + view │   │  one session  │
//! └──────────┘   └──────┬───────┘   └───────┬───────┘
//!                       │                   │ reply
//!                       ▼                   ▼
//!                  ┌─────────┐        ┌───────────┐
//!                  │  cards  │◀───────│ normalize │
//!                  └─────────┘        └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stash init
//! stash save "https://example.com/launch.png" --tags "#space"
//! stash list "#space"
//! stash ask "What is my favorite tag?" --query "#space"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | SQLite-backed item store |
//! | [`ollama`] | Ollama text-generation facility |
//! | [`render`] | Item and answer cards |
//! | [`progress`] | Loading indicator |
//! | [`telemetry`] | Tracing setup |
//! | [`browse`] | `save`, `list`, `delete` commands |
//! | [`export`] | `export` command |
//! | [`ask`] | `ask`, `chat`, `params` commands |

pub mod ask;
pub mod browse;
pub mod config;
pub mod db;
pub mod export;
pub mod migrate;
pub mod ollama;
pub mod progress;
pub mod render;
pub mod store;
pub mod telemetry;
