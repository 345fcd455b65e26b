//! Deterministic explanation fallbacks — per-rule risk text and patch
//! hints, used whenever the completion service is absent, below threshold,
//! failed, or rejected.

use std::sync::LazyLock;

use codemend_analysis::rules::Violation;
use codemend_core::FxHashMap;

use crate::models::{Issue, PatchSuggestion};

struct ExplainTemplate {
    risk: &'static str,
    patch_hint: &'static str,
}

static RULE_TEMPLATES: LazyLock<FxHashMap<&'static str, ExplainTemplate>> = LazyLock::new(|| {
    FxHashMap::from_iter([
        (
            "race_condition",
            ExplainTemplate {
                risk: "Concurrent async functions writing to the same shared mutable state \
                       will corrupt data non-deterministically. This will cause intermittent \
                       bugs that are impossible to reproduce locally.",
                patch_hint: "Use asyncio.Lock() to synchronize access, or refactor to pass \
                             state via arguments.",
            },
        ),
        (
            "missing_await",
            ExplainTemplate {
                risk: "The coroutine is created but never executed. The operation (database \
                       write, API call, file operation) will silently not happen, causing \
                       data loss.",
                patch_hint: "Add 'await' before the async function call.",
            },
        ),
        (
            "unsanitized_io",
            ExplainTemplate {
                risk: "User-controlled input flows into file/system operations without \
                       sanitization. An attacker can perform path traversal, overwrite \
                       critical files, or execute arbitrary system commands.",
                patch_hint: "Validate and sanitize input: use os.path.basename(), restrict \
                             to allowed paths, and never pass raw user input to file/system \
                             operations.",
            },
        ),
        (
            "dangerous_eval",
            ExplainTemplate {
                risk: "eval()/exec() with dynamic input enables arbitrary code execution. An \
                       attacker controlling the input can execute any code in the process, \
                       including reading secrets, modifying data, or spawning reverse shells.",
                patch_hint: "Replace eval/exec with ast.literal_eval() for data parsing, or \
                             use a proper parser/DSL.",
            },
        ),
        (
            "shared_mutable_state",
            ExplainTemplate {
                risk: "Module-level mutable state creates implicit coupling between \
                       functions. In concurrent environments (threads, async, workers), this \
                       causes data races. In testing, it causes flaky tests due to shared \
                       state leaking between test cases.",
                patch_hint: "Encapsulate state in a class, pass as function arguments, or \
                             use thread-local storage.",
            },
        ),
        (
            "missing_exception_boundary",
            ExplainTemplate {
                risk: "Unhandled exceptions in API handlers will return raw stack traces to \
                       clients (information leakage) or crash background workers without \
                       cleanup. In production, this causes 500 errors and service \
                       degradation.",
                patch_hint: "Wrap the handler body in try/except, log the error, and return \
                             a structured error response.",
            },
        ),
        (
            "retry_without_backoff",
            ExplainTemplate {
                risk: "Retry loops without backoff will hammer the target service at full \
                       speed on failure. This causes cascading failures, IP bans, rate limit \
                       exhaustion, and amplifies outages.",
                patch_hint: "Add exponential backoff: time.sleep(2 ** attempt) between \
                             retries, with a max retry count.",
            },
        ),
        (
            "blocking_io_in_async",
            ExplainTemplate {
                risk: "Blocking I/O inside async functions stalls the entire event loop. All \
                       concurrent coroutines (other API requests, background tasks) will \
                       freeze until the blocking call completes. This destroys concurrency \
                       and causes timeouts.",
                patch_hint: "Use async equivalents: asyncio.sleep(), httpx.AsyncClient, \
                             aiofiles.open(), asyncio.create_subprocess_exec().",
            },
        ),
        (
            "db_conn_per_request",
            ExplainTemplate {
                risk: "Creating a new database connection for every request causes \
                       connection pool exhaustion under load. Connection establishment is \
                       expensive (TCP handshake, auth, TLS negotiation) and databases have \
                       connection limits.",
                patch_hint: "Use a connection pool: sqlalchemy.create_engine(pool_size=10), \
                             psycopg2.pool, or framework-provided pool.",
            },
        ),
        (
            "missing_idempotency",
            ExplainTemplate {
                risk: "Non-idempotent write handlers cause duplicate records, \
                       double-charges, and data corruption when clients retry on timeout or \
                       network failure. This is especially dangerous for payment and order \
                       creation endpoints.",
                patch_hint: "Accept an Idempotency-Key header, check for prior execution, \
                             and return cached response on duplicate.",
            },
        ),
        (
            "partial_txn_no_rollback",
            ExplainTemplate {
                risk: "DB operations without try/except + rollback leave partial \
                       transactions on failure. This corrupts data consistency, leaks DB \
                       connections, and can cause cascading failures in downstream systems.",
                patch_hint: "Wrap DB operations in try/except with rollback in except, or \
                             use a context manager (with conn:).",
            },
        ),
        (
            "missing_http_timeout",
            ExplainTemplate {
                risk: "HTTP calls without a timeout will hang indefinitely if the remote \
                       server doesn't respond. This blocks threads/coroutines and eventually \
                       exhausts the process's resources, causing service unavailability.",
                patch_hint: "Add timeout=10 (or appropriate value) to all HTTP client calls.",
            },
        ),
    ])
});

const DEFAULT_TEMPLATE: ExplainTemplate = ExplainTemplate {
    risk: "This violation may cause issues in production environments.",
    patch_hint: "Review and fix the flagged code.",
};

/// Synthesize issues from violations using the deterministic templates.
pub fn generate_fallback_issues(violations: &[Violation]) -> Vec<Issue> {
    violations
        .iter()
        .enumerate()
        .map(|(i, violation)| {
            let template = RULE_TEMPLATES
                .get(violation.rule_id.as_str())
                .unwrap_or(&DEFAULT_TEMPLATE);

            let patches = if violation.line > 0 {
                vec![PatchSuggestion {
                    file: violation.file.clone(),
                    start_line: violation.line,
                    end_line: violation.end_line.unwrap_or(violation.line),
                    new_code: format!("# TODO: {}", template.patch_hint),
                }]
            } else {
                Vec::new()
            };

            Issue {
                id: format!("{}-{}", violation.rule_id, i + 1),
                severity: violation.severity,
                file: violation.file.clone(),
                line: violation.line,
                rule_id: violation.rule_id.clone(),
                issue: violation.title.clone(),
                explanation: violation.description.clone(),
                risk: template.risk.to_string(),
                evidence: violation.evidence.clone(),
                patches,
                test_impact: Vec::new(),
            }
        })
        .collect()
}
