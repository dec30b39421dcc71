//! Grounded prompt composition.
//!
//! The template is fixed: it has the same shape whether the dataset holds
//! two hundred items or none.

/// System instruction given to every new session.
pub const SYSTEM_PROMPT: &str = "You are a helpful and friendly assistant.";

/// Wrap a JSON Lines dataset and a question in the grounding template.
pub fn compose_grounded_prompt(dataset: &str, question: &str) -> String {
    format!(
        "You are given the user's currently filtered WebStash items as JSON Lines (one JSON object per line).\n\
         Each object has: id, title, tags[], content (snippet), createdAt, type.\n\
         \n\
         Use ONLY this dataset to answer the question.\n\
         If the question implies aggregation (e.g., \"favorite hashtag\"), compute it from the dataset\n\
         (e.g., count tag frequency and pick the most frequent). If insufficient, say so briefly.\n\
         \n\
         DATASET (JSONL):\n\
         {dataset}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         TASK:\n\
         1) Answer concisely using only the DATASET.\n\
         2) Include a short \"Based on:\" line citing tag(s) or id(s) used."
    )
}
