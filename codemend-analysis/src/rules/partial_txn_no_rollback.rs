//! `partial_txn_no_rollback` — transaction-indicative calls outside a
//! with-block, with no except-handler invoking rollback. Critical when no
//! commit is present either, high when commit exists but rollback is
//! missing.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::{matches_any_substring, COMMIT_CALLS, ROLLBACK_CALLS, TXN_CALLS};
use super::types::Violation;
use super::Rule;

pub struct PartialTxnNoRollback;

impl Rule for PartialTxnNoRollback {
    fn id(&self) -> &'static str {
        "partial_txn_no_rollback"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            let txn_calls: Vec<&str> = body
                .call_names()
                .filter(|name| matches_any_substring(name, TXN_CALLS))
                .collect();
            if txn_calls.is_empty() {
                continue;
            }

            let has_rollback_handler = body
                .handler_calls
                .iter()
                .any(|name| matches_any_substring(name, ROLLBACK_CALLS));
            if has_rollback_handler || body.has_with_block {
                continue;
            }

            let has_commit = body
                .call_names()
                .any(|name| matches_any_substring(name, COMMIT_CALLS));
            let severity = if has_commit {
                Severity::High
            } else {
                Severity::Critical
            };

            let shown: Vec<&str> = txn_calls.iter().take(3).copied().collect();
            let shown = shown.join(", ");

            let mut violation =
                Violation::new(self.id(), severity, &module.file_path, func.line);
            violation.end_line = Some(func.end_line);
            violation.title =
                format!("Partial transaction without rollback in '{}'", func.name);
            violation.description = format!(
                "Function '{}' executes DB operations ({shown}) without try/except + \
                 rollback handling or a context manager. On failure, partial writes \
                 remain, corrupting data and potentially leaking DB connections.",
                func.name,
            );
            violation.evidence = vec![
                format!("Function: {}", func.display_name()),
                format!("DB operations: {shown}"),
                format!("Has commit: {has_commit}"),
                format!("Has rollback: {has_rollback_handler}"),
                "Fix: Wrap in try/except with rollback, or use a context manager".to_string(),
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
