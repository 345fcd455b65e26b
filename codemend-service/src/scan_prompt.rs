//! Scan-explanation prompt — structured deterministic output in, strict
//! JSON out. The completion service never receives raw source code, only
//! the violation records, the affected subgraph, test failures, and the
//! risk breakdown.

use codemend_analysis::call_graph::{affected_subgraph, CallGraph};
use codemend_analysis::rules::RuleResult;
use codemend_analysis::scorer::RiskBreakdown;
use serde_json::json;

const SYSTEM_PROMPT: &str = r#"You are an assistant that explains deterministic code analysis findings.

You MUST NOT invent new issues. You ONLY explain and suggest patches for the violations already detected by the deterministic engine.

You receive:
1. A list of rule violations (detected deterministically — these are FACTS)
2. A call graph subgraph showing affected functions and their relationships
3. Test failure results from automated edge-case testing
4. A risk scoring breakdown

Your task:
- For each violation, write a clear natural language explanation
- Suggest minimal, targeted code patches (only for the affected lines)
- Summarize the overall blast impact

STRICT RULES:
- ONLY reference files from the provided file whitelist
- Patches must target ONLY the violation line range (±5 lines max)
- NEVER invent new violations not in the input
- NEVER reference functions/classes not in the subgraph
- Output STRICT JSON matching this schema:

{
  "explanations": [
    {
      "violation_rule_id": "exact rule_id from input",
      "natural_language_explanation": "...",
      "production_risk_summary": "...",
      "patch_suggestions": [
        {
          "file": "exact file path from whitelist",
          "start_line": number,
          "end_line": number,
          "new_code": "replacement code",
          "rationale": "why this patch fixes the issue"
        }
      ]
    }
  ],
  "blast_impact_summary": "overall impact paragraph",
  "overall_recommendation": "ship/hold/rollback recommendation"
}"#;

/// Build the scan-explanation prompt from deterministic analysis output.
pub fn build_scan_prompt(
    rule_result: &RuleResult,
    call_graph: Option<&CallGraph>,
    risk_breakdown: Option<&RiskBreakdown>,
    test_failures_json: &str,
    file_paths: &[String],
) -> String {
    let violations: Vec<serde_json::Value> = rule_result
        .violations
        .iter()
        .map(|v| {
            json!({
                "rule_id": v.rule_id,
                "severity": v.severity.name(),
                "file": v.file,
                "line": v.line,
                "title": v.title,
                "description": v.description,
                "evidence": v.evidence,
                "affected_function": v.affected_function,
            })
        })
        .collect();

    let subgraph = match call_graph {
        Some(graph) => {
            let seeds: Vec<&str> = rule_result
                .violations
                .iter()
                .filter_map(|v| v.graph_node_id.as_deref())
                .collect();
            let snapshot = affected_subgraph(graph, &seeds, 1).snapshot();
            serde_json::to_value(snapshot).unwrap_or_else(|_| json!({}))
        }
        None => json!({"nodes": [], "edges": []}),
    };

    let risk = risk_breakdown
        .and_then(|r| serde_json::to_value(r).ok())
        .unwrap_or_else(|| json!({}));

    format!(
        "{SYSTEM_PROMPT}\n\n\
         === RULE VIOLATIONS (deterministic facts) ===\n{violations}\n\n\
         === AFFECTED CALL GRAPH SUBGRAPH ===\n{subgraph}\n\n\
         === TEST FAILURES ===\n{test_failures_json}\n\n\
         === RISK BREAKDOWN ===\n{risk}\n\n\
         === VALID FILE PATHS (whitelist) ===\n{files}\n\n\
         Respond with STRICT JSON only.\n",
        violations = serde_json::to_string_pretty(&violations).unwrap_or_default(),
        subgraph = serde_json::to_string(&subgraph).unwrap_or_default(),
        risk = serde_json::to_string(&risk).unwrap_or_default(),
        files = serde_json::to_string(file_paths).unwrap_or_default(),
    )
}
