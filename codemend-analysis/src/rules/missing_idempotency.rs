//! `missing_idempotency` — a POST/PUT/PATCH handler that performs writes
//! with no idempotency keyword anywhere in the body text.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::{
    decorator_matches, matches_any_substring, IDEMPOTENCY_KEYWORDS, MUTATING_DECORATORS,
    WRITE_CALLS,
};
use super::types::Violation;
use super::Rule;

static IDEMPOTENCY_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(IDEMPOTENCY_KEYWORDS)
        .expect("idempotency keyword set is valid")
});

pub struct MissingIdempotency;

impl Rule for MissingIdempotency {
    fn id(&self) -> &'static str {
        "missing_idempotency"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let is_mutating = decorator_matches(&func.decorators, MUTATING_DECORATORS)
                || decorator_matches(&func.calls, MUTATING_DECORATORS);
            if !is_mutating {
                continue;
            }

            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            let has_write = func
                .calls
                .iter()
                .any(|name| matches_any_substring(name, WRITE_CALLS))
                || body
                    .call_names()
                    .any(|name| matches_any_substring(name, WRITE_CALLS));
            if !has_write {
                continue;
            }

            if IDEMPOTENCY_MATCHER.is_match(&body.text) {
                continue;
            }

            let mut violation =
                Violation::new(self.id(), Severity::High, &module.file_path, func.line);
            violation.end_line = Some(func.end_line);
            violation.title = format!(
                "Missing idempotency guard in mutating handler '{}'",
                func.name
            );
            violation.description = format!(
                "Handler '{}' performs write operations (DB inserts, API calls) \
                 without an idempotency key or duplicate guard. Client retries on \
                 network failures will cause duplicate records, double-charges, or \
                 data corruption.",
                func.name,
            );
            violation.evidence = vec![
                format!("Handler: {}", func.display_name()),
                "Performs write operations without idempotency guard".to_string(),
                "Risk: duplicate records on client retry".to_string(),
                "Fix: Accept an idempotency key and check before executing write".to_string(),
            ];
            violation.affected_function = func.display_name().to_string();
            violation
                .metadata
                .insert("failure_class".to_string(), "data_corruption".to_string());
            violations.push(violation);
        }

        violations
    }
}
