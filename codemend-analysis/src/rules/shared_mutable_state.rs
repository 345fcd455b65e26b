//! `shared_mutable_state` — a module-level mutable container read or
//! written by more than one function.

use std::collections::BTreeSet;

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::types::Violation;
use super::Rule;

pub struct SharedMutableState;

impl Rule for SharedMutableState {
    fn id(&self) -> &'static str {
        "shared_mutable_state"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (var_name, target_type, line) in module.module_level_mutables() {
            let accessors: BTreeSet<&str> = module
                .all_functions()
                .filter(|f| {
                    f.reads_globals.iter().any(|n| n == var_name)
                        || f.writes_globals.iter().any(|n| n == var_name)
                })
                .map(|f| f.display_name())
                .collect();

            if accessors.len() < 2 {
                continue;
            }

            let accessor_list = accessors.iter().copied().collect::<Vec<_>>().join(", ");
            let first = accessors.iter().next().copied().unwrap_or_default();

            let mut violation = Violation::new(self.id(), Severity::High, &module.file_path, line);
            violation.title = format!(
                "Shared mutable state: '{var_name}' accessed by {} functions",
                accessors.len()
            );
            violation.description = format!(
                "Module-level {} '{var_name}' is accessed by multiple functions: \
                 {accessor_list}. This creates implicit coupling and is unsafe under \
                 concurrent access (threads, async, multiprocessing).",
                target_type.name(),
            );
            violation.evidence = vec![
                format!("Variable: {var_name} (type: {})", target_type.name()),
                format!("Accessing functions: {accessor_list}"),
                format!("Count: {} accessors", accessors.len()),
                "No encapsulation or thread-safety mechanism detected".to_string(),
            ];
            violation.affected_function = first.to_string();
            violations.push(violation);
        }

        violations
    }
}
