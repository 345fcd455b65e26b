//! `missing_await` — a known-async call target that never appears in the
//! caller's awaited set. The coroutine is created and silently dropped.
//!
//! Matching falls back to the bare last segment of a dotted target, which
//! can false-positive on name collisions across modules; the call graph only
//! widens the known-async set, it does not narrow the match.

use codemend_core::{FxHashSet, Severity};

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::types::Violation;
use super::Rule;

pub struct MissingAwait;

impl Rule for MissingAwait {
    fn id(&self) -> &'static str {
        "missing_await"
    }

    fn check(&self, module: &ModuleAst, graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut async_names: FxHashSet<String> = FxHashSet::default();
        for func in &module.functions {
            if func.is_async {
                async_names.insert(func.name.clone());
            }
        }
        for class in &module.classes {
            for method in &class.methods {
                if method.is_async {
                    async_names.insert(method.name.clone());
                    async_names.insert(format!("{}.{}", class.name, method.name));
                }
            }
        }

        // Cross-module async functions are also fair game.
        if let Some(graph) = graph {
            for id in graph.node_ids() {
                if let Some(node) = graph.get_node(id) {
                    if node.is_async {
                        async_names.insert(node.function.clone());
                    }
                }
            }
        }

        if async_names.is_empty() {
            return violations;
        }

        for func in module.all_functions() {
            let awaited: FxHashSet<&str> = func.awaits.iter().map(String::as_str).collect();
            for call_name in &func.calls {
                let base_name = call_name.rsplit('.').next().unwrap_or(call_name);
                if !async_names.contains(call_name.as_str())
                    && !async_names.contains(base_name)
                {
                    continue;
                }
                if awaited.contains(call_name.as_str()) || awaited.contains(base_name) {
                    continue;
                }

                let severity = if func.is_async {
                    Severity::High
                } else {
                    Severity::Critical
                };
                let mut awaited_list: Vec<&str> = awaited.iter().copied().collect();
                awaited_list.sort_unstable();

                let mut violation =
                    Violation::new(self.id(), severity, &module.file_path, func.line);
                violation.title =
                    format!("Async function '{call_name}' called without await");
                violation.description = format!(
                    "In function '{}', async function '{call_name}' is called without \
                     'await'. The coroutine will be created but never executed, \
                     silently dropping the operation.",
                    func.name,
                );
                violation.evidence = vec![
                    format!("Caller: {} (async={})", func.display_name(), func.is_async),
                    format!("Callee: {call_name} (async=True)"),
                    "No 'await' keyword found for this call".to_string(),
                    format!(
                        "Awaited calls in this function: {}",
                        if awaited_list.is_empty() {
                            "none".to_string()
                        } else {
                            awaited_list.join(", ")
                        }
                    ),
                ];
                violation.affected_function = func.display_name().to_string();
                violations.push(violation);
            }
        }

        violations
    }
}
