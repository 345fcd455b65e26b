//! `missing_exception_boundary` — an entry point with no try/except.
//!
//! Entry points: request-handler decorators, `main`/`__main__`, and async
//! functions whose names carry a handler prefix.

use codemend_core::Severity;

use crate::call_graph::{is_entry_point, CallGraph};
use crate::parser::ModuleAst;

use super::tables::ENTRY_POINT_NAME_PREFIXES;
use super::types::Violation;
use super::Rule;

pub struct MissingExceptionBoundary;

impl Rule for MissingExceptionBoundary {
    fn id(&self) -> &'static str {
        "missing_exception_boundary"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let mut is_entry = is_entry_point(&func.name, &func.decorators);
            if !is_entry && func.is_async {
                is_entry = ENTRY_POINT_NAME_PREFIXES
                    .iter()
                    .any(|prefix| func.name.starts_with(prefix));
            }
            if !is_entry || func.has_try_except {
                continue;
            }

            let decorators = if func.decorators.is_empty() {
                "none".to_string()
            } else {
                func.decorators.join(", ")
            };

            let mut violation =
                Violation::new(self.id(), Severity::High, &module.file_path, func.line);
            violation.title = format!(
                "Missing exception boundary in entry point '{}'",
                func.name
            );
            violation.description = format!(
                "Entry point '{}' has no try/except block. Unhandled exceptions will \
                 propagate to the framework, potentially returning 500 errors with \
                 stack traces (information leakage) or crashing background workers.",
                func.name,
            );
            violation.evidence = vec![
                format!("Function: {}", func.display_name()),
                format!("Decorators: {decorators}"),
                format!("Async: {}", func.is_async),
                "No try/except block found in function body".to_string(),
            ];
            violation.affected_function = func.display_name().to_string();
            violations.push(violation);
        }

        violations
    }
}
