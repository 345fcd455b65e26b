//! Patch-source abstraction — "propose a replacement function body".
//!
//! The completion-service client is one implementation; tests substitute
//! deterministic doubles. The template library is the other patch source,
//! but it is infallible and synchronous, so the orchestrator addresses it
//! directly.

use std::future::Future;

use codemend_analysis::rules::Violation;
use codemend_core::errors::CompletionError;

use crate::completion::prompt::{build_patch_prompt, build_review_prompt};
use crate::completion::response::{parse_patch_generation, parse_review_verdict};
use crate::completion::{CompletionClient, ProposedPatch, ReviewVerdict};

/// A strategy that proposes replacement function bodies.
pub trait PatchSource: Send + Sync {
    /// Propose a patch for one violation. An error means the source is
    /// unavailable for this attempt; the orchestrator falls through to the
    /// deterministic template when permitted.
    fn propose_patch(
        &self,
        violation: &Violation,
        function_source: &str,
    ) -> impl Future<Output = Result<ProposedPatch, CompletionError>> + Send;

    /// Review an already-generated patch. Sources without a review facility
    /// answer safe.
    fn review_patch(
        &self,
        violation: &Violation,
        original_code: &str,
        patched_code: &str,
    ) -> impl Future<Output = Result<ReviewVerdict, CompletionError>> + Send;

    /// Tokens consumed so far, for audit accounting.
    fn tokens_used(&self) -> u64 {
        0
    }
}

/// A patch source that is never available. Stands in for the completion
/// service in deterministic-only pipelines.
pub struct UnavailablePatchSource;

impl PatchSource for UnavailablePatchSource {
    async fn propose_patch(
        &self,
        _violation: &Violation,
        _function_source: &str,
    ) -> Result<ProposedPatch, CompletionError> {
        Err(CompletionError::Request {
            message: "completion service not configured".to_string(),
        })
    }

    async fn review_patch(
        &self,
        _violation: &Violation,
        _original_code: &str,
        _patched_code: &str,
    ) -> Result<ReviewVerdict, CompletionError> {
        Ok(ReviewVerdict::default())
    }
}

impl PatchSource for CompletionClient {
    async fn propose_patch(
        &self,
        violation: &Violation,
        function_source: &str,
    ) -> Result<ProposedPatch, CompletionError> {
        let prompt = build_patch_prompt(violation, function_source, None);
        let outcome = self.complete(&prompt).await?;
        let parsed = outcome.parsed.ok_or(CompletionError::MalformedReply)?;
        parse_patch_generation(&parsed).ok_or(CompletionError::MalformedReply)
    }

    async fn review_patch(
        &self,
        violation: &Violation,
        original_code: &str,
        patched_code: &str,
    ) -> Result<ReviewVerdict, CompletionError> {
        let prompt = build_review_prompt(violation, original_code, patched_code);
        let outcome = self.complete(&prompt).await?;
        let parsed = outcome.parsed.ok_or(CompletionError::MalformedReply)?;
        parse_review_verdict(&parsed).ok_or(CompletionError::MalformedReply)
    }

    fn tokens_used(&self) -> u64 {
        CompletionClient::tokens_used(self)
    }
}
