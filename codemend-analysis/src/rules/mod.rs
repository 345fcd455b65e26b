//! The deterministic rule catalog.
//!
//! Each rule is a pure check over `(ModuleAst, Option<&CallGraph>)`. Rules
//! never share state; a panicking rule is isolated by the registry and
//! reported as a single low-severity violation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

pub mod body;
pub mod tables;
pub mod types;

mod blocking_io_in_async;
mod dangerous_eval;
mod db_conn_per_request;
mod missing_await;
mod missing_exception_boundary;
mod missing_http_timeout;
mod missing_idempotency;
mod partial_txn_no_rollback;
mod race_condition;
mod retry_without_backoff;
mod shared_mutable_state;
mod unsanitized_io;

pub use types::{RuleResult, Violation};

/// A deterministic pattern rule.
pub trait Rule: Send + Sync {
    /// Stable rule identifier, e.g. `dangerous_eval`.
    fn id(&self) -> &'static str;

    /// Evaluate the rule against one module.
    fn check(&self, module: &ModuleAst, graph: Option<&CallGraph>) -> Vec<Violation>;
}

/// Ordered registry of rules. Evaluation order is registration order.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Run one rule, converting a panic into a low-severity violation so the
    /// rest of the catalog still runs.
    pub fn run_rule(
        &self,
        rule: &dyn Rule,
        module: &ModuleAst,
        graph: Option<&CallGraph>,
    ) -> Vec<Violation> {
        let outcome = catch_unwind(AssertUnwindSafe(|| rule.check(module, graph)));
        match outcome {
            Ok(violations) => violations,
            Err(_) => {
                tracing::error!(rule_id = rule.id(), file = %module.file_path, "rule panicked");
                let mut violation =
                    Violation::new(rule.id(), Severity::Low, &module.file_path, 0);
                violation.title = format!("Rule '{}' internal error", rule.id());
                violation.description =
                    format!("Rule '{}' failed while checking this module.", rule.id());
                violation.evidence = vec![
                    format!("Rule: {}", rule.id()),
                    format!("File: {}", module.file_path),
                    "Rule execution aborted; other rules still ran".to_string(),
                ];
                vec![violation]
            }
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The full 12-rule catalog in evaluation order.
pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register(Box::new(race_condition::RaceCondition));
    registry.register(Box::new(missing_await::MissingAwait));
    registry.register(Box::new(unsanitized_io::UnsanitizedIo));
    registry.register(Box::new(dangerous_eval::DangerousEval));
    registry.register(Box::new(shared_mutable_state::SharedMutableState));
    registry.register(Box::new(missing_exception_boundary::MissingExceptionBoundary));
    registry.register(Box::new(retry_without_backoff::RetryWithoutBackoff));
    registry.register(Box::new(blocking_io_in_async::BlockingIoInAsync));
    registry.register(Box::new(db_conn_per_request::DbConnPerRequest));
    registry.register(Box::new(missing_idempotency::MissingIdempotency));
    registry.register(Box::new(partial_txn_no_rollback::PartialTxnNoRollback));
    registry.register(Box::new(missing_http_timeout::MissingHttpTimeout));
    registry
}
