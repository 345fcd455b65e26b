//! `blocking_io_in_async` — a known blocking call inside an async function.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::BLOCKING_CALLS;
use super::types::Violation;
use super::Rule;

pub struct BlockingIoInAsync;

impl Rule for BlockingIoInAsync {
    fn id(&self) -> &'static str {
        "blocking_io_in_async"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions().filter(|f| f.is_async) {
            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for call in &body.calls {
                let Some(&fix) = BLOCKING_CALLS.get(call.name.as_str()) else {
                    continue;
                };

                let line = func.line + call.line - 1;
                let mut violation =
                    Violation::new(self.id(), Severity::High, &module.file_path, line);
                violation.title = format!(
                    "Blocking '{}()' inside async function '{}'",
                    call.name, func.name
                );
                violation.description = format!(
                    "'{}()' is a synchronous blocking call used inside async function \
                     '{}'. This blocks the entire event loop, stalling all concurrent \
                     coroutines. Fix: {fix}",
                    call.name, func.name,
                );
                violation.evidence = vec![
                    format!("Async function: {}", func.display_name()),
                    format!("Blocking call: {}()", call.name),
                    format!("Fix: {fix}"),
                    "Blocks event loop for all concurrent tasks".to_string(),
                ];
                violation.affected_function = func.display_name().to_string();
                violations.push(violation);
            }
        }

        violations
    }
}
