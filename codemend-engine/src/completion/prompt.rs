//! Prompt construction for patch generation and self-review.
//!
//! Strict JSON out, strict JSON in: the prompts spell out the only reply
//! schema the response parser accepts.

use codemend_analysis::rules::Violation;
use serde_json::json;

/// Default import whitelist offered to the completion service.
pub const ALLOWED_IMPORTS: &[&str] = &["asyncio", "logging", "typing", "contextlib", "functools"];

const PATCH_SYSTEM_PROMPT: &str = r#"You are a code repair assistant that generates MINIMAL, SAFE patches.

You receive a single rule violation detected by the deterministic engine, along with the
source code of the affected function. Your task: generate a corrected version of ONLY the
affected function.

STRICT CONSTRAINTS — VIOLATION OF ANY CONSTRAINT MEANS REJECTION:
1. PRESERVE the function signature exactly (name, parameters, type hints, return type)
2. DO NOT modify route decorators (@app.get, @router.post, etc.)
3. DO NOT introduce new global variables or 'global' statements
4. ONLY modify the detected function — do not add new functions
5. DO NOT remove business logic — only fix the detected issue
6. DO NOT add imports outside the provided whitelist
7. Output MUST be strict JSON — no markdown, no comments, no text outside JSON

OUTPUT SCHEMA (strict):
{
  "explanation": "Why this patch fixes the issue (1-2 sentences)",
  "patch": {
    "type": "replace_function",
    "target": "exact function name",
    "new_code": "complete corrected function definition (including def/async def line)"
  },
  "risk_score_after": <estimated 0-100 risk score after fix>
}"#;

const REVIEW_SYSTEM_PROMPT: &str = r#"You are a patch safety reviewer. You review a code patch that was generated to fix
a production issue.

Analyze the patch for:
1. Race conditions — does the patch introduce shared mutable state access?
2. Blocking calls — does the patch add time.sleep(), requests.get(), or file I/O in async context?
3. Unsafe patterns — eval, exec, subprocess, unsanitized I/O?
4. Logic errors — does the patch preserve the original business logic?
5. Missing error handling — does the patch remove try/except blocks?

OUTPUT SCHEMA (strict JSON):
{
  "safe": true/false,
  "issues": ["list of issues found, empty if safe"],
  "recommendation": "apply" | "regenerate" | "reject"
}"#;

/// Build the patch-generation prompt: system instruction, violation record,
/// affected function source, and the import whitelist.
pub fn build_patch_prompt(
    violation: &Violation,
    function_source: &str,
    allowed_imports: Option<&[&str]>,
) -> String {
    let imports = allowed_imports.unwrap_or(ALLOWED_IMPORTS);
    let violation_data = json!({
        "rule_id": violation.rule_id,
        "severity": violation.severity.name(),
        "file": violation.file,
        "line": violation.line,
        "end_line": violation.end_line.unwrap_or(violation.line),
        "title": violation.title,
        "description": violation.description,
        "evidence": violation.evidence,
        "affected_function": violation.affected_function,
    });

    format!(
        "{PATCH_SYSTEM_PROMPT}\n\n\
         === VIOLATION (detected deterministically — this is a FACT) ===\n\
         {violation}\n\n\
         === AFFECTED FUNCTION SOURCE ===\n\
         ```python\n{function_source}\n```\n\n\
         === ALLOWED IMPORT WHITELIST ===\n\
         {imports}\n\n\
         Generate a corrected version of ONLY the function above.\n\
         Respond with STRICT JSON only. No markdown, no comments, no text outside JSON.\n",
        violation = serde_json::to_string_pretty(&violation_data).unwrap_or_default(),
        imports = serde_json::to_string(imports).unwrap_or_default(),
    )
}

/// Build the self-review prompt over an original/patched pair.
pub fn build_review_prompt(
    violation: &Violation,
    original_code: &str,
    patched_code: &str,
) -> String {
    format!(
        "{REVIEW_SYSTEM_PROMPT}\n\n\
         === ORIGINAL VIOLATION ===\n\
         Rule: {}\n\
         Description: {}\n\n\
         === ORIGINAL FUNCTION ===\n\
         ```python\n{original_code}\n```\n\n\
         === PROPOSED PATCH ===\n\
         ```python\n{patched_code}\n```\n\n\
         Review this patch carefully. Respond with STRICT JSON only.\n",
        violation.rule_id, violation.description,
    )
}
