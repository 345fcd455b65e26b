//! `dangerous_eval` — `eval`/`exec`/`compile`/`__import__` with zero
//! arguments or any non-string-literal argument. Matching is on the bare
//! last segment, so `builtins.eval` still counts.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::DANGEROUS_EVAL_FUNCTIONS;
use super::types::Violation;
use super::Rule;

pub struct DangerousEval;

impl Rule for DangerousEval {
    fn id(&self) -> &'static str {
        "dangerous_eval"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        // Module-level statements can execute code too.
        for call in &module.module_calls {
            let base_name = call.name.rsplit('.').next().unwrap_or(&call.name);
            if !DANGEROUS_EVAL_FUNCTIONS.contains(base_name) {
                continue;
            }
            if call.positional_args > 0 && call.all_positional_string_literals {
                continue;
            }

            let mut violation =
                Violation::new(self.id(), Severity::Critical, &module.file_path, call.line);
            violation.title = format!("Dangerous '{base_name}()' with non-literal argument");
            violation.description = format!(
                "'{base_name}()' is called at module level with a dynamic (non-literal) \
                 argument. This enables arbitrary code execution at import time."
            );
            violation.evidence = vec![
                "Scope: module level".to_string(),
                format!("Dangerous call: {base_name}()"),
                format!(
                    "Argument type: {}",
                    if call.positional_args == 0 {
                        "no args"
                    } else {
                        "dynamic expression"
                    }
                ),
                "Non-literal arguments allow arbitrary code execution".to_string(),
            ];
            violation.affected_function = "<module>".to_string();
            violations.push(violation);
        }

        for func in module.all_functions() {
            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for call in &body.calls {
                let base_name = call.name.rsplit('.').next().unwrap_or(&call.name);
                if !DANGEROUS_EVAL_FUNCTIONS.contains(base_name) {
                    continue;
                }

                // String literals are the only safe arguments.
                if call.positional_args > 0 && call.all_positional_string_literals {
                    continue;
                }

                let line = func.line + call.line - 1;
                let mut violation =
                    Violation::new(self.id(), Severity::Critical, &module.file_path, line);
                violation.title =
                    format!("Dangerous '{base_name}()' with non-literal argument");
                violation.description = format!(
                    "In function '{}', '{base_name}()' is called with a dynamic \
                     (non-literal) argument. This enables arbitrary code execution. An \
                     attacker controlling the input can execute any code in the process.",
                    func.name,
                );
                violation.evidence = vec![
                    format!("Function: {}", func.display_name()),
                    format!("Dangerous call: {base_name}()"),
                    format!(
                        "Argument type: {}",
                        if call.positional_args == 0 {
                            "no args"
                        } else {
                            "dynamic expression"
                        }
                    ),
                    "Non-literal arguments allow arbitrary code execution".to_string(),
                ];
                violation.affected_function = func.display_name().to_string();
                violations.push(violation);
            }
        }

        violations
    }
}
