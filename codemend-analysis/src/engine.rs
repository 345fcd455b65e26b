//! Rule engine — drives the catalog over all modules.
//!
//! Violation order is the testable contract: rule-registry order first,
//! then per-module input order.

use std::time::Instant;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;
use crate::rules::{default_registry, RuleRegistry, RuleResult};

pub struct RuleEngine {
    registry: RuleRegistry,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            registry: default_registry(),
        }
    }

    /// Build an engine over a custom registry (tests inject panicking or
    /// reduced catalogs).
    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run every rule against every module.
    pub fn run(
        &self,
        modules: &[(String, ModuleAst)],
        call_graph: Option<&CallGraph>,
    ) -> RuleResult {
        let start = Instant::now();
        let mut result = RuleResult {
            total_files_scanned: modules.len(),
            ..RuleResult::default()
        };

        for rule in self.registry.rules() {
            result.rules_executed.push(rule.id().to_string());
            for (_, module) in modules {
                let violations = self.registry.run_rule(rule.as_ref(), module, call_graph);
                result.violations.extend(violations);
            }
        }

        // Anchor violations to the graph so the scorer can weigh blast
        // radius.
        if let Some(graph) = call_graph {
            for violation in &mut result.violations {
                if violation.graph_node_id.is_some() || violation.affected_function.is_empty() {
                    continue;
                }
                let node_id = CallGraph::node_id(&violation.file, &violation.affected_function);
                if graph.contains(&node_id) {
                    violation.graph_node_id = Some(node_id);
                }
            }
        }

        result.scan_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            violations = result.violations.len(),
            files = result.total_files_scanned,
            duration_ms = result.scan_duration_ms,
            "rule engine pass complete"
        );
        result
    }

    /// Run a single rule against a single module. Unknown ids yield an
    /// empty list.
    pub fn run_single_rule(
        &self,
        rule_id: &str,
        module: &ModuleAst,
        call_graph: Option<&CallGraph>,
    ) -> Vec<crate::rules::Violation> {
        for rule in self.registry.rules() {
            if rule.id() == rule_id {
                return self.registry.run_rule(rule.as_ref(), module, call_graph);
            }
        }
        Vec::new()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
