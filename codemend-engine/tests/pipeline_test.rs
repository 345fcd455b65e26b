//! Pipeline tests — deterministic fallback repairs, completion-backed
//! repairs via a test double, rollback on risk increase, and rejection
//! safety.

use codemend_analysis::rules::Violation;
use codemend_core::config::EngineConfig;
use codemend_core::errors::CompletionError;
use codemend_engine::completion::{ProposedPatch, ReviewVerdict};
use codemend_engine::patch_source::{PatchSource, UnavailablePatchSource};
use codemend_engine::pipeline::{PatchFile, PatchPipeline, PatchStatus};
use codemend_engine::templates::TemplateLibrary;

fn files(path: &str, content: &str) -> Vec<PatchFile> {
    vec![PatchFile {
        path: path.to_string(),
        content: content.to_string(),
    }]
}

fn deterministic_pipeline() -> PatchPipeline<UnavailablePatchSource> {
    PatchPipeline::new(None, &EngineConfig::default())
}

/// A patch source that always proposes the same replacement code.
struct FixedSource {
    code: String,
}

impl PatchSource for FixedSource {
    async fn propose_patch(
        &self,
        violation: &Violation,
        _function_source: &str,
    ) -> Result<ProposedPatch, CompletionError> {
        Ok(ProposedPatch {
            explanation: "fixed".to_string(),
            target: violation.affected_function.clone(),
            new_code: self.code.clone(),
            risk_score_after: 0,
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

#[tokio::test]
async fn http_timeout_repaired_by_deterministic_template() {
    let source = "def f():\n    return requests.get(\"https://x\")\n";
    let mut pipeline = deterministic_pipeline();

    let response = pipeline.run(&files("t.py", source), None, true).await;

    assert_eq!(response.message, "patch_complete");
    assert_eq!(response.total_violations, 1);
    assert_eq!(response.patches_applied, 1);
    let result = &response.results[0];
    assert_eq!(result.status, PatchStatus::Applied);
    assert!(result.used_fallback);
    assert!(response.patched_sources["t.py"].contains("timeout=10"));
    assert!(response.risk_score_after < response.risk_score_before);
}

#[tokio::test]
async fn blocking_sleep_repaired_with_async_equivalent() {
    let source = "async def f():\n    time.sleep(1)\n";
    let mut pipeline = deterministic_pipeline();

    let response = pipeline.run(&files("t.py", source), None, true).await;

    assert_eq!(response.patches_applied, 1);
    let patched = &response.patched_sources["t.py"];
    assert!(patched.contains("await asyncio.sleep("));
    assert!(!patched.contains("time.sleep("));
}

#[tokio::test]
async fn risk_increase_rolls_back_to_snapshot() {
    // A deliberately broken template: eliminates the target rule but
    // introduces a critical eval, raising the risk score.
    let mut templates = TemplateLibrary::empty();
    templates.register("missing_http_timeout", |_, _| {
        "def f():\n    return eval(input())\n".to_string()
    });

    let source = "def f():\n    return requests.get(\"https://x\")\n";
    let mut pipeline = deterministic_pipeline().with_templates(templates);

    let response = pipeline.run(&files("t.py", source), None, true).await;

    assert_eq!(response.patches_rolled_back, 1);
    let result = &response.results[0];
    assert_eq!(result.status, PatchStatus::Rollback);
    // Byte-identical to the pre-patch snapshot.
    assert_eq!(response.patched_sources["t.py"], source);
    assert!(result.risk_score_after > result.risk_score_before);
}

#[tokio::test]
async fn invalid_patch_is_rejected_and_file_untouched() {
    // Template renames the function, which validation refuses.
    let mut templates = TemplateLibrary::empty();
    templates.register("missing_http_timeout", |_, _| {
        "def renamed():\n    return requests.get(\"https://x\", timeout=10)\n".to_string()
    });

    let source = "def f():\n    return requests.get(\"https://x\")\n";
    let mut pipeline = deterministic_pipeline().with_templates(templates);

    let response = pipeline.run(&files("t.py", source), None, true).await;

    assert_eq!(response.patches_applied, 0);
    let result = &response.results[0];
    assert_eq!(result.status, PatchStatus::Rejected);
    assert!(!result.validation_errors.is_empty());
    assert_eq!(response.patched_sources["t.py"], source);
}

#[tokio::test]
async fn completion_source_is_tried_before_templates() {
    let source = "def f():\n    return requests.get(\"https://x\")\n";
    let fixed = FixedSource {
        code: "def f():\n    return requests.get(\"https://x\", timeout=10)\n".to_string(),
    };
    let mut pipeline = PatchPipeline::new(Some(fixed), &EngineConfig::default());

    let response = pipeline.run(&files("t.py", source), None, true).await;

    assert_eq!(response.patches_applied, 1);
    let result = &response.results[0];
    assert_eq!(result.status, PatchStatus::Applied);
    assert_eq!(result.llm_attempts, 1);
    assert!(!result.used_fallback);
}

#[tokio::test]
async fn target_rule_filter_limits_work() {
    let source = "def f(s):\n    eval(s)\n    return requests.get(\"https://x\")\n";
    let mut pipeline = deterministic_pipeline();

    let targets = vec!["missing_http_timeout".to_string()];
    let response = pipeline
        .run(&files("t.py", source), Some(&targets), true)
        .await;

    assert_eq!(response.total_violations, 1);
    assert!(response
        .results
        .iter()
        .all(|r| r.rule_id == "missing_http_timeout"));
}

#[tokio::test]
async fn empty_file_list_is_error_shaped() {
    let mut pipeline = deterministic_pipeline();
    let response = pipeline.run(&[], None, true).await;
    assert!(response.message.starts_with("error"));
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn generation_failure_without_fallback_is_failed() {
    let source = "def f():\n    return requests.get(\"https://x\")\n";
    let mut pipeline = deterministic_pipeline();

    let response = pipeline.run(&files("t.py", source), None, false).await;

    let result = &response.results[0];
    assert_eq!(result.status, PatchStatus::Failed);
    assert_eq!(response.patched_sources["t.py"], source);
}
