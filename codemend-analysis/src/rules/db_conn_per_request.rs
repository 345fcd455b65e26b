//! `db_conn_per_request` — a raw database connection constructed inside a
//! request handler. Production systems pool connections.

use codemend_core::Severity;

use crate::call_graph::CallGraph;
use crate::parser::ModuleAst;

use super::body::FunctionBody;
use super::tables::{decorator_matches, DB_CONNECT_CALLS, HANDLER_DECORATORS};
use super::types::Violation;
use super::Rule;

pub struct DbConnPerRequest;

impl Rule for DbConnPerRequest {
    fn id(&self) -> &'static str {
        "db_conn_per_request"
    }

    fn check(&self, module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for func in module.all_functions() {
            // Call-form decorators surface in the call list too.
            let is_handler = decorator_matches(&func.decorators, HANDLER_DECORATORS)
                || decorator_matches(&func.calls, HANDLER_DECORATORS);
            if !is_handler {
                continue;
            }

            let Some(body) = FunctionBody::parse(func) else {
                continue;
            };

            for call in &body.calls {
                let Some(&fix) = DB_CONNECT_CALLS.get(call.name.as_str()) else {
                    continue;
                };

                let line = func.line + call.line - 1;
                let mut violation =
                    Violation::new(self.id(), Severity::Critical, &module.file_path, line);
                violation.title = format!(
                    "DB connection '{}()' created per request in '{}'",
                    call.name, func.name
                );
                violation.description = format!(
                    "'{}()' creates a new database connection on every request inside \
                     handler '{}'. Under load this causes connection exhaustion, pool \
                     starvation, and service degradation. Fix: {fix}",
                    call.name, func.name,
                );
                violation.evidence = vec![
                    format!("Handler: {}", func.display_name()),
                    format!("DB call: {}()", call.name),
                    format!("Fix: {fix}"),
                    "Creates new connection per request — not pooled".to_string(),
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
