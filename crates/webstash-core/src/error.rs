//! Error types shared by the core pipeline.

use thiserror::Error;

/// Message used when a generation failure carries no text of its own.
pub const GENERIC_GENERATION_FAILURE: &str = "The model failed to produce a response.";

/// Errors raised while creating items.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// The item content was empty after trimming.
    #[error("content is required")]
    EmptyContent,
}

/// Errors raised by the text-generation facility.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// No usable text-generation facility is configured or reachable.
    #[error("feature not available: {0}")]
    Unavailable(String),

    /// Session creation or a prompt call failed.
    #[error("{0}")]
    Generation(String),
}

impl ModelError {
    /// Build a [`ModelError::Generation`], substituting a generic message
    /// when `message` is blank.
    pub fn generation(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ModelError::Generation(GENERIC_GENERATION_FAILURE.to_string())
        } else {
            ModelError::Generation(message)
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ModelError::Unavailable(_))
    }
}
