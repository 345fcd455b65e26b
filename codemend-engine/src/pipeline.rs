//! Pipeline orchestrator — detect → generate → validate → apply → rescan →
//! rollback, with bounded retries per violation.
//!
//! Guarantees: the working source never contains a patch that failed
//! validation or rescan; a rolled-back violation leaves the file
//! byte-identical to its pre-patch snapshot; a rejected violation does not
//! block the others.

use std::collections::BTreeMap;

use codemend_analysis::call_graph::build_call_graph;
use codemend_analysis::engine::RuleEngine;
use codemend_analysis::parser::parse_file;
use codemend_analysis::rules::Violation;
use codemend_analysis::scorer::compute_risk_score;
use codemend_core::config::EngineConfig;
use codemend_core::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::applier::{apply_function_patch, extract_function_source};
use crate::patch_source::PatchSource;
use crate::rescan::rescan_patched_source;
use crate::rollback::RollbackStore;
use crate::templates::TemplateLibrary;
use crate::validator::validate_patch;

/// A source file submitted for patching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchFile {
    pub path: String,
    pub content: String,
}

/// Terminal status of one violation's patch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchStatus {
    Applied,
    Rejected,
    Rollback,
    Fallback,
    Failed,
}

/// Result of patching a single violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchResult {
    pub rule_id: String,
    pub target_function: String,
    pub file_path: String,
    pub status: PatchStatus,
    pub explanation: String,
    pub original_code: String,
    pub patched_code: String,
    pub validation_errors: Vec<String>,
    pub risk_score_before: u32,
    pub risk_score_after: u32,
    pub llm_attempts: u32,
    pub used_fallback: bool,
}

impl PatchResult {
    fn new(violation: &Violation, risk_score_before: u32) -> Self {
        Self {
            rule_id: violation.rule_id.clone(),
            target_function: violation.affected_function.clone(),
            file_path: violation.file.clone(),
            status: PatchStatus::Failed,
            explanation: String::new(),
            original_code: String::new(),
            patched_code: String::new(),
            validation_errors: Vec::new(),
            risk_score_before,
            risk_score_after: 0,
            llm_attempts: 0,
            used_fallback: false,
        }
    }
}

/// Response from a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchResponse {
    pub message: String,
    pub results: Vec<PatchResult>,
    pub total_violations: usize,
    pub patches_applied: usize,
    pub patches_rejected: usize,
    pub patches_rolled_back: usize,
    pub risk_score_before: u32,
    pub risk_score_after: u32,
    pub patched_sources: BTreeMap<String, String>,
}

impl PatchResponse {
    /// An error-shaped response with no results.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            results: Vec::new(),
            total_violations: 0,
            patches_applied: 0,
            patches_rejected: 0,
            patches_rolled_back: 0,
            risk_score_before: 0,
            risk_score_after: 0,
            patched_sources: BTreeMap::new(),
        }
    }
}

/// The patch pipeline orchestrator.
///
/// Generic over the completion-backed patch source so tests can substitute
/// deterministic doubles; the template library is always available as the
/// second source.
pub struct PatchPipeline<S: PatchSource> {
    completion: Option<S>,
    templates: TemplateLibrary,
    rule_engine: RuleEngine,
    rollback: RollbackStore,
    max_retries: u32,
    review_enabled: bool,
}

impl<S: PatchSource> PatchPipeline<S> {
    pub fn new(completion: Option<S>, config: &EngineConfig) -> Self {
        Self {
            completion,
            templates: TemplateLibrary::default(),
            rule_engine: RuleEngine::new(),
            rollback: RollbackStore::new(),
            max_retries: config.effective_patch_max_retries(),
            review_enabled: config.effective_patch_review_enabled(),
        }
    }

    /// Replace the template library (tests install broken doubles).
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
    }

    /// Execute the full pipeline over a set of files.
    pub async fn run(
        &mut self,
        files: &[PatchFile],
        target_rule_ids: Option<&[String]>,
        use_fallback: bool,
    ) -> PatchResponse {
        if files.is_empty() {
            return PatchResponse::error("error: no files provided");
        }
        tracing::info!(files = files.len(), "patch pipeline starting");

        // Detect.
        let modules: Vec<(String, codemend_analysis::parser::ModuleAst)> = files
            .iter()
            .map(|f| (f.path.clone(), parse_file(&f.content, &f.path)))
            .collect();
        let mut sources: BTreeMap<String, String> = files
            .iter()
            .map(|f| (f.path.clone(), f.content.clone()))
            .collect();

        let call_graph = build_call_graph(&modules);
        let rule_result = self.rule_engine.run(&modules, Some(&call_graph));
        let risk = compute_risk_score(&rule_result, Some(&call_graph), &FxHashSet::default());
        let original_risk_score = risk.total_score;

        let violations: Vec<&Violation> = match target_rule_ids {
            Some(ids) => rule_result
                .violations
                .iter()
                .filter(|v| ids.iter().any(|id| id == &v.rule_id))
                .collect(),
            None => rule_result.violations.iter().collect(),
        };
        tracing::info!(
            violations = violations.len(),
            risk = original_risk_score,
            "detection complete"
        );

        // Repair, violation by violation, in detection order.
        let mut results = Vec::with_capacity(violations.len());
        for &violation in &violations {
            let result = self
                .process_violation(violation, &mut sources, original_risk_score, use_fallback)
                .await;
            results.push(result);
        }

        // Final pass: re-score the aggregate working source.
        let final_modules: Vec<(String, codemend_analysis::parser::ModuleAst)> = sources
            .iter()
            .map(|(path, content)| (path.clone(), parse_file(content, path)))
            .collect();
        let final_rule_result = self.rule_engine.run(&final_modules, None);
        let final_risk = compute_risk_score(&final_rule_result, None, &FxHashSet::default());

        let response = PatchResponse {
            message: "patch_complete".to_string(),
            total_violations: violations.len(),
            patches_applied: results
                .iter()
                .filter(|r| r.status == PatchStatus::Applied)
                .count(),
            patches_rejected: results
                .iter()
                .filter(|r| r.status == PatchStatus::Rejected)
                .count(),
            patches_rolled_back: results
                .iter()
                .filter(|r| r.status == PatchStatus::Rollback)
                .count(),
            risk_score_before: original_risk_score,
            risk_score_after: final_risk.total_score,
            results,
            patched_sources: sources,
        };

        tracing::info!(
            applied = response.patches_applied,
            rejected = response.patches_rejected,
            rolled_back = response.patches_rolled_back,
            risk_before = response.risk_score_before,
            risk_after = response.risk_score_after,
            "patch pipeline complete"
        );
        response
    }

    /// Process a single violation through generate → validate → apply →
    /// rescan, with rollback on risk increase.
    async fn process_violation(
        &mut self,
        violation: &Violation,
        sources: &mut BTreeMap<String, String>,
        original_risk_score: u32,
        use_fallback: bool,
    ) -> PatchResult {
        let mut result = PatchResult::new(violation, original_risk_score);

        // Methods are addressed by their bare name in source text.
        let target = violation
            .affected_function
            .rsplit('.')
            .next()
            .unwrap_or(&violation.affected_function)
            .to_string();

        let Some(source) = sources.get(&violation.file).cloned() else {
            result.explanation = format!("Source not found for {}", violation.file);
            return result;
        };

        self.rollback.save_snapshot(&violation.file, &target, &source);

        let func_source =
            extract_function_source(&source, &target).unwrap_or_else(|| source.clone());
        result.original_code = func_source.clone();

        // Function metadata for the validator.
        let module = parse_file(&source, &violation.file);
        let (is_async, decorators) = module
            .all_functions()
            .find(|f| f.name == target || f.qualified_name == violation.affected_function)
            .map(|f| (f.is_async, f.decorators.clone()))
            .unwrap_or((false, Vec::new()));

        for attempt in 0..=self.max_retries {
            result.llm_attempts = attempt + 1;
            let force_fallback = use_fallback && attempt == self.max_retries;

            let new_code = self
                .generate_patch(violation, &func_source, force_fallback, &mut result)
                .await;
            let Some(new_code) = new_code else {
                if attempt < self.max_retries {
                    continue;
                }
                result.status = PatchStatus::Failed;
                result.explanation = "All patch generation attempts failed".to_string();
                return result;
            };

            // Apply, then validate the structure of the whole file.
            let Some(patched_source) = apply_function_patch(&source, &target, &new_code) else {
                result.validation_errors.push(
                    "Patch application failed (function not found or syntax error)".to_string(),
                );
                if attempt < self.max_retries {
                    continue;
                }
                result.status = PatchStatus::Rejected;
                return result;
            };

            let verdict = validate_patch(&source, &patched_source, &target, is_async, &decorators);
            if !verdict.valid {
                result.validation_errors.extend(verdict.errors);
                if attempt < self.max_retries {
                    continue;
                }
                result.status = PatchStatus::Rejected;
                return result;
            }

            // Optional self-review before committing to a rescan.
            if self.review_enabled && attempt < self.max_retries {
                if let Some(completion) = &self.completion {
                    let review_ok = match completion
                        .review_patch(violation, &func_source, &new_code)
                        .await
                    {
                        Ok(review) => {
                            if !review.safe {
                                tracing::warn!(issues = ?review.issues, "self-review flagged issues");
                            }
                            review.safe
                        }
                        // Review failures never block a patch.
                        Err(_) => true,
                    };
                    if !review_ok {
                        continue;
                    }
                }
            }

            let rescan = rescan_patched_source(
                &patched_source,
                &violation.file,
                &violation.rule_id,
                original_risk_score,
                &self.rule_engine,
            );
            result.risk_score_after = rescan.risk_score_after;

            if rescan.passed {
                result.status = PatchStatus::Applied;
                result.explanation = format!("Patch applied successfully. {}", rescan.details);
                result.patched_code = patched_source.clone();
                sources.insert(violation.file.clone(), patched_source);
                return result;
            }

            if rescan.risk_increased {
                result.status = PatchStatus::Rollback;
                result.explanation = format!("Rolled back: {}", rescan.details);
                if let Some(original) = self.rollback.rollback(&violation.file, &target) {
                    sources.insert(violation.file.clone(), original.to_string());
                }
                return result;
            }

            if attempt < self.max_retries {
                continue;
            }
            result.status = PatchStatus::Rejected;
            result.explanation = format!(
                "Re-scan failed after {} attempts: {}",
                self.max_retries + 1,
                rescan.details
            );
            return result;
        }

        result
    }

    /// One generation attempt: completion service unless this attempt
    /// forces the deterministic template.
    async fn generate_patch(
        &self,
        violation: &Violation,
        func_source: &str,
        force_fallback: bool,
        result: &mut PatchResult,
    ) -> Option<String> {
        if !force_fallback {
            if let Some(completion) = &self.completion {
                match completion.propose_patch(violation, func_source).await {
                    Ok(patch) => return Some(patch.new_code),
                    Err(e) => {
                        tracing::warn!(error = %e, "completion patch generation failed");
                        return None;
                    }
                }
            }
            return None;
        }

        let target = violation
            .affected_function
            .rsplit('.')
            .next()
            .unwrap_or(&violation.affected_function);
        let patched = self
            .templates
            .generate(&violation.rule_id, func_source, target);
        if patched.is_some() {
            tracing::info!(rule_id = %violation.rule_id, "using deterministic fallback template");
            result.used_fallback = true;
        }
        patched
    }
}
