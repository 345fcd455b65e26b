//! `race_condition` — a module-level mutable container written by more than
//! one async function.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::types::Violation;
use super::Rule;

pub struct RaceCondition;

impl Rule for RaceCondition {
    fn id(&self) -> &'static str {
        "race_condition"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mutables = module.module_level_mutables();
        if mutables.is_empty() {
            return violations;
        }

        for (var_name, target_type, line) in mutables {
            let writers: Vec<&str> = module
                .all_functions()
                .filter(|f| f.is_async)
                .filter(|f| f.writes_globals.iter().any(|w| w == var_name))
                .map(|f| f.display_name())
                .collect();

            if writers.len() < 2 {
                continue;
            }

            let mut violation = Violation::new(self.id(), Severity::Critical, &module.file_path, line);
            violation.title = format!(
                "Race condition: '{var_name}' written by multiple async functions"
            );
            violation.description = format!(
                "Module-level mutable '{var_name}' ({}) is written by {} async \
                 functions: {}. Without synchronization (locks/queues), concurrent \
                 execution will cause data corruption.",
                target_type.name(),
                writers.len(),
                writers.join(", "),
            );
            violation.evidence = vec![
                format!("Shared mutable variable: {var_name} (type: {})", target_type.name()),
                format!("Async writers: {}", writers.join(", ")),
                "No synchronization primitive detected".to_string(),
            ];
            violation.affected_function = writers[0].to_string();
            violations.push(violation);
        }

        violations
    }
}
