//! `retry_without_backoff` — a loop whose body makes network calls with no
//! sleep/backoff call anywhere in the loop.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::{matches_any_substring, BACKOFF_INDICATORS, NETWORK_CALLS};
use super::types::Violation;
use super::Rule;

pub struct RetryWithoutBackoff;

impl Rule for RetryWithoutBackoff {
    fn id(&self) -> &'static str {
        "retry_without_backoff"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for body_loop in &body.loops {
                let mut network_call = None;
                let mut has_backoff = false;

                for call_name in &body_loop.calls {
                    if NETWORK_CALLS.contains(&call_name.as_str())
                        || matches_any_substring(call_name, NETWORK_CALLS)
                    {
                        network_call = Some(call_name.as_str());
                    }
                    if BACKOFF_INDICATORS.contains(&call_name.as_str())
                        || matches_any_substring(call_name, BACKOFF_INDICATORS)
                    {
                        has_backoff = true;
                    }
                }

                let Some(network_call) = network_call else {
                    continue;
                };
                if has_backoff {
                    continue;
                }

                let line = func.line + body_loop.line - 1;
                let mut violation =
                    Violation::new(self.id(), Severity::High, &module.file_path, line);
                violation.title =
                    format!("Retry loop without backoff calling '{network_call}'");
                violation.description = format!(
                    "In function '{}', a loop makes network calls to '{network_call}' \
                     without any sleep/backoff logic. On failure, this will immediately \
                     retry at full speed, overwhelming the target service and causing \
                     cascading failures.",
                    func.name,
                );
                violation.evidence = vec![
                    format!("Function: {}", func.display_name()),
                    format!("Loop type: {}", body_loop.kind.name()),
                    format!("Network call: {network_call}"),
                    "No time.sleep(), asyncio.sleep(), or backoff decorator detected"
                        .to_string(),
                ];
                violation.affected_function = func.display_name().to_string();
                violations.push(violation);
            }
        }

        violations
    }
}
