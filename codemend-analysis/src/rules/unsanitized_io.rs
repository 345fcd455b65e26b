//! `unsanitized_io` — a function parameter flows directly into a filesystem
//! or process call. Severity comes from the per-call table.

use std::collections::BTreeSet;

use codemend_core::FxHashSet;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::DANGEROUS_IO_CALLS;
use super::types::Violation;
use super::Rule;

pub struct UnsanitizedIo;

impl Rule for UnsanitizedIo {
    fn id(&self) -> &'static str {
        "unsanitized_io"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let param_names: FxHashSet<&str> = func
                .parameters
                .iter()
                .map(|p| p.name.as_str())
                .filter(|name| *name != "self")
                .collect();
            if param_names.is_empty() {
                continue;
            }

            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for call in &body.calls {
                let Some(&severity) = DANGEROUS_IO_CALLS.get(call.name.as_str()) else {
                    continue;
                };

                let tainted: BTreeSet<&str> = call
                    .arg_identifiers
                    .iter()
                    .map(String::as_str)
                    .filter(|name| param_names.contains(name))
                    .collect();
                if tainted.is_empty() {
                    continue;
                }

                let tainted_list = tainted.into_iter().collect::<Vec<_>>().join(", ");
                let line = func.line + call.line - 1;

                let mut violation = Violation::new(self.id(), severity, &module.file_path, line);
                violation.title = format!("Unsanitized input in '{}()' call", call.name);
                violation.description = format!(
                    "In function '{}', parameter(s) {tainted_list} flow directly into \
                     '{}()' without sanitization. This enables path traversal, command \
                     injection, or arbitrary file operations.",
                    func.name, call.name,
                );
                violation.evidence = vec![
                    format!("Function: {}", func.display_name()),
                    format!("Dangerous call: {}()", call.name),
                    format!("Tainted parameters: {tainted_list}"),
                    "No input validation or sanitization detected".to_string(),
                ];
                violation.affected_function = func.display_name().to_string();
                violations.push(violation);
            }
        }

        violations
    }
}
