//! Scan worker — the full analysis pipeline behind one scan request.
//!
//! Steps: parse (cache-aware) → call graph → data flow → rule engine →
//! optional test harness → risk scoring → explanations (completion service
//! or deterministic fallback) → cache write → response assembly.

use std::time::{Duration, Instant};

use codemend_analysis::cache::FileCache;
use codemend_analysis::call_graph::build_call_graph;
use codemend_analysis::data_flow::analyze_data_flow;
use codemend_analysis::engine::RuleEngine;
use codemend_analysis::parser::{parse_file, ModuleAst};
use codemend_analysis::rules::Violation;
use codemend_analysis::scorer::compute_risk_score;
use codemend_core::config::EngineConfig;
use codemend_core::{FxHashMap, FxHashSet};
use codemend_engine::completion::CompletionClient;
use serde_json::json;
use uuid::Uuid;

use crate::explain::generate_fallback_issues;
use crate::models::{
    AuditEntry, FileInput, Issue, LlmScanReply, PatchSuggestion, ScanMode, ScanReport,
    ScanResponse,
};
use crate::response_validator::{validate_scan_reply, LINE_TOLERANCE};
use crate::scan_prompt::build_scan_prompt;
use crate::test_harness;

/// Async scan orchestrator. One instance serves many scans; the file cache
/// is the only cross-scan state and is keyed by content hash.
pub struct ScanWorker {
    cache: FileCache,
    completion: Option<CompletionClient>,
    rule_engine: RuleEngine,
    config: EngineConfig,
}

impl ScanWorker {
    pub fn new(config: EngineConfig) -> Self {
        let completion = CompletionClient::from_config(&config.completion);
        let cache = FileCache::new(
            10_000,
            Duration::from_secs(config.scan.effective_cache_ttl_secs()),
        );
        Self {
            cache,
            completion,
            rule_engine: RuleEngine::new(),
            config,
        }
    }

    /// Replace the completion client (tests inject doubles or disable it).
    pub fn without_completion(mut self) -> Self {
        self.completion = None;
        self
    }

    /// Execute the full analysis pipeline over a set of files.
    pub async fn run_scan(&self, files: &[FileInput], scan_mode: ScanMode) -> ScanResponse {
        let scan_id = Uuid::new_v4().to_string()[..8].to_string();
        let start = Instant::now();
        tracing::info!(%scan_id, files = files.len(), ?scan_mode, "starting scan");

        // Step 1: parse, via the cache when content is unchanged.
        let mut modules: Vec<(String, ModuleAst)> = Vec::with_capacity(files.len());
        for file in files {
            match self.cache.get(&file.path, &file.content) {
                Some(entry) => {
                    tracing::debug!(%scan_id, path = %file.path, "cache hit");
                    modules.push((file.path.clone(), entry.module_ast));
                }
                None => {
                    modules.push((file.path.clone(), parse_file(&file.content, &file.path)));
                }
            }
        }

        // Step 2: call graph.
        let call_graph = build_call_graph(&modules);
        tracing::info!(
            %scan_id,
            nodes = call_graph.node_count(),
            edges = call_graph.edge_count(),
            "call graph built"
        );

        // Step 3: data flow.
        let mut data_flow_issues = Vec::new();
        for (_, module) in &modules {
            data_flow_issues.extend(analyze_data_flow(module));
        }
        tracing::info!(%scan_id, issues = data_flow_issues.len(), "data flow analyzed");

        // Step 4: rule engine.
        let rule_result = self.rule_engine.run(&modules, Some(&call_graph));
        tracing::info!(
            %scan_id,
            violations = rule_result.violations.len(),
            duration_ms = rule_result.scan_duration_ms,
            "rules evaluated"
        );

        // Step 5: test harness, when enabled.
        let mut test_failures_json = "[]".to_string();
        let mut test_failure_rule_ids: FxHashSet<String> = FxHashSet::default();
        if self.config.test_harness.effective_enabled() {
            let (failures_json, failed_functions) = self.run_test_harness(&modules).await;
            test_failures_json = failures_json;
            for violation in &rule_result.violations {
                let function = violation
                    .affected_function
                    .rsplit('.')
                    .next()
                    .unwrap_or(&violation.affected_function);
                if failed_functions.contains(function) {
                    test_failure_rule_ids.insert(violation.rule_id.clone());
                }
            }
        }

        // Step 6: risk scoring.
        let risk_breakdown =
            compute_risk_score(&rule_result, Some(&call_graph), &test_failure_rule_ids);
        tracing::info!(%scan_id, score = risk_breakdown.total_score, "risk scored");

        // Steps 7-8: explanations — completion service above the risk
        // threshold, deterministic fallback otherwise.
        let has_critical_or_high = rule_result
            .violations
            .iter()
            .any(|v| v.severity.is_critical_or_high());
        let should_use_llm = self.completion.is_some()
            && !rule_result.violations.is_empty()
            && (risk_breakdown.total_score > self.config.completion.effective_risk_threshold()
                || has_critical_or_high);

        let mut llm_used = false;
        let mut llm_tokens = 0u64;
        let issues: Vec<Issue> = if should_use_llm {
            let (issues, used, tokens) = self
                .explain_with_completion(
                    &rule_result.violations,
                    &rule_result,
                    &call_graph,
                    &risk_breakdown,
                    &test_failures_json,
                    &modules,
                )
                .await;
            llm_used = used;
            llm_tokens = tokens;
            issues
        } else {
            tracing::info!(%scan_id, "using deterministic-only output");
            generate_fallback_issues(&rule_result.violations)
        };

        // Step 9: cache per-file results.
        for file in files {
            let Some((_, module)) = modules.iter().find(|(path, _)| path == &file.path) else {
                continue;
            };
            let file_violations: Vec<Violation> = rule_result
                .violations
                .iter()
                .filter(|v| v.file == file.path)
                .cloned()
                .collect();
            self.cache
                .put(&file.path, &file.content, module.clone(), file_violations);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let audit = AuditEntry {
            scan_id: scan_id.clone(),
            files_scanned: files.len(),
            violations_found: rule_result.violations.len(),
            risk_score: risk_breakdown.total_score,
            llm_invoked: llm_used,
            llm_tokens_used: llm_tokens,
            duration_ms: (elapsed_ms * 100.0).round() / 100.0,
            deterministic_only: !llm_used,
        };

        let mut summary = risk_breakdown.summary.clone();
        if !data_flow_issues.is_empty() {
            summary.push_str(&format!(
                " Data flow analysis noted {} additional finding(s).",
                data_flow_issues.len()
            ));
        }
        if scan_mode == ScanMode::Pr {
            summary = format!("PR Analysis: {summary}");
        }

        let report = ScanReport {
            issues,
            risk_score: risk_breakdown.total_score,
            risk_breakdown: Some(risk_breakdown),
            summary,
            llm_used,
            deterministic_only: !llm_used,
            audit: Some(audit),
        };

        tracing::info!(
            %scan_id,
            issues = report.issues.len(),
            score = report.risk_score,
            llm = llm_used,
            "scan complete"
        );

        ScanResponse {
            message: "scan_complete".to_string(),
            scan_id,
            report: Some(report),
        }
    }

    /// Generate edge cases for every module-level function and run them.
    /// Returns the serialized failures and the names of failing functions.
    async fn run_test_harness(
        &self,
        modules: &[(String, ModuleAst)],
    ) -> (String, FxHashSet<String>) {
        let timeout = self.config.test_harness.effective_timeout_secs();
        let mut all_results = Vec::new();

        for (_, module) in modules {
            for func in &module.functions {
                let cases = test_harness::generate_edge_cases(func);
                let results =
                    test_harness::run_tests(&cases, &func.body_source, timeout).await;
                all_results.extend(results);
            }
        }

        let failures: Vec<&test_harness::TestResult> =
            all_results.iter().filter(|r| !r.passed).collect();
        let failed_functions: FxHashSet<String> =
            failures.iter().map(|r| r.function_name.clone()).collect();

        let failures_json = serde_json::to_string(
            &failures
                .iter()
                .map(|r| {
                    json!({
                        "function": r.function_name,
                        "description": r.test_description,
                        "error_type": r.error_type,
                        "error_message": r.error_message,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        tracing::info!(
            tests = all_results.len(),
            failures = failures.len(),
            "test harness complete"
        );
        (failures_json, failed_functions)
    }

    /// Ask the completion service for explanations, validating strictly;
    /// any rejection falls back to the deterministic templates.
    #[allow(clippy::too_many_arguments)]
    async fn explain_with_completion(
        &self,
        violations: &[Violation],
        rule_result: &codemend_analysis::rules::RuleResult,
        call_graph: &codemend_analysis::call_graph::CallGraph,
        risk_breakdown: &codemend_analysis::scorer::RiskBreakdown,
        test_failures_json: &str,
        modules: &[(String, ModuleAst)],
    ) -> (Vec<Issue>, bool, u64) {
        let Some(completion) = &self.completion else {
            return (generate_fallback_issues(violations), false, 0);
        };
        completion.reset_token_counter();

        let file_paths: Vec<String> = modules.iter().map(|(path, _)| path.clone()).collect();
        let prompt = build_scan_prompt(
            rule_result,
            Some(call_graph),
            Some(risk_breakdown),
            test_failures_json,
            &file_paths,
        );

        let outcome = match completion.complete(&prompt).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "completion service failed; using fallback");
                return (generate_fallback_issues(violations), false, 0);
            }
        };
        let tokens = outcome.tokens_used;

        let valid_paths: FxHashSet<String> = file_paths.iter().cloned().collect();
        let valid_rule_ids: FxHashSet<String> =
            violations.iter().map(|v| v.rule_id.clone()).collect();
        let ranges: FxHashMap<String, (u32, u32)> = violations
            .iter()
            .map(|v| {
                (
                    v.rule_id.clone(),
                    (v.line, v.end_line.unwrap_or(v.line)),
                )
            })
            .collect();

        let validation = validate_scan_reply(
            outcome.parsed.as_ref(),
            &valid_paths,
            &valid_rule_ids,
            &ranges,
            LINE_TOLERANCE,
        );

        match validation.reply {
            Some(reply) if validation.valid => {
                tracing::info!("completion reply validated and merged");
                (merge_reply_with_violations(violations, &reply), true, tokens)
            }
            _ => {
                tracing::warn!(errors = ?validation.errors, "completion reply rejected");
                (generate_fallback_issues(violations), false, tokens)
            }
        }
    }
}

/// Merge completion-service explanations with deterministic violations.
fn merge_reply_with_violations(violations: &[Violation], reply: &LlmScanReply) -> Vec<Issue> {
    let explanation_map: FxHashMap<&str, &crate::models::LlmExplanation> = reply
        .explanations
        .iter()
        .map(|e| (e.violation_rule_id.as_str(), e))
        .collect();

    violations
        .iter()
        .enumerate()
        .map(|(i, violation)| {
            let explanation = explanation_map.get(violation.rule_id.as_str());

            let mut explanation_text = violation.description.clone();
            let mut risk_text = violation.description.clone();
            let mut patches = Vec::new();

            if let Some(explanation) = explanation {
                if !explanation.natural_language_explanation.is_empty() {
                    explanation_text = explanation.natural_language_explanation.clone();
                }
                if !explanation.production_risk_summary.is_empty() {
                    risk_text = explanation.production_risk_summary.clone();
                }
                for suggestion in &explanation.patch_suggestions {
                    patches.push(PatchSuggestion {
                        file: suggestion.file.clone(),
                        start_line: suggestion.start_line,
                        end_line: suggestion.end_line,
                        new_code: suggestion.new_code.clone(),
                    });
                }
            }

            Issue {
                id: format!("{}-{}", violation.rule_id, i + 1),
                severity: violation.severity,
                file: violation.file.clone(),
                line: violation.line,
                rule_id: violation.rule_id.clone(),
                issue: violation.title.clone(),
                explanation: explanation_text,
                risk: risk_text,
                evidence: violation.evidence.clone(),
                patches,
                test_impact: Vec::new(),
            }
        })
        .collect()
}
