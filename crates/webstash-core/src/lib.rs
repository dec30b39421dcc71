//! # WebStash Core
//!
//! Shared, runtime-free logic for WebStash: the saved-item model, the
//! filter engine behind the browse view, and the grounded-question pipeline
//! that lets a language model answer questions over exactly the items the
//! user is looking at.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem I/O.
//! Storage and the text-generation facility are reached through the
//! [`store::ItemStore`] and [`session::LanguageModel`] traits, which the
//! `webstash` app crate implements.
//!
//! ## Pipeline
//!
//! ```text
//! items ──▶ filter ──▶ dataset (JSONL) ──▶ prompt ──▶ session ──▶ normalize
//!            │                                                     │
//!            └── last filtered view                 cards / plain text
//! ```

pub mod dataset;
pub mod error;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod session;
pub mod state;
pub mod store;
