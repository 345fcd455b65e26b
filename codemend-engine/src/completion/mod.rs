//! Completion-service integration: client, prompts, and strict reply
//! parsing.

pub mod client;
pub mod prompt;
pub mod response;
pub mod types;

pub use client::{CompletionClient, CompletionOutcome};
pub use types::{ProposedPatch, ReviewVerdict};
