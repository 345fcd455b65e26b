//! `missing_http_timeout` — an HTTP-client call with no `timeout=` keyword
//! argument.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::HTTP_CALLS;
use super::types::Violation;
use super::Rule;

pub struct MissingHttpTimeout;

impl Rule for MissingHttpTimeout {
    fn id(&self) -> &'static str {
        "missing_http_timeout"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for call in &body.calls {
                if !HTTP_CALLS.contains(call.name.as_str()) {
                    continue;
                }
                if call.keyword_names.iter().any(|kw| kw == "timeout") {
                    continue;
                }

                let line = func.line + call.line - 1;
                let mut violation =
                    Violation::new(self.id(), Severity::High, &module.file_path, line);
                violation.title = format!(
                    "Missing timeout in '{}()' inside '{}'",
                    call.name, func.name
                );
                violation.description = format!(
                    "'{}()' in function '{}' has no timeout parameter. Without a \
                     timeout, the call will hang indefinitely if the remote server \
                     doesn't respond, blocking the thread/coroutine and eventually \
                     exhausting process resources.",
                    call.name, func.name,
                );
                violation.evidence = vec![
                    format!("Function: {}", func.display_name()),
                    format!("HTTP call: {}()", call.name),
                    "No timeout= parameter specified".to_string(),
                    "Fix: Add timeout=10 (or appropriate value) to the call".to_string(),
                ];
                violation.affected_function = func.display_name().to_string();
                violation
                    .metadata
                    .insert("failure_class".to_string(), "resource_exhaustion".to_string());
                violations.push(violation);
            }
        }

        violations
    }
}
