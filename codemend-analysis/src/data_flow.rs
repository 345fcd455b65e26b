//! Intra-module data-flow checks.
//!
//! Three checks per function: nullable-return contracts, unguarded parameter
//! propagation into dangerous calls, and cross-module mutation of
//! module-level mutables. Issues surface through the scan summary and
//! tracing; they are not merged into the violation list.

use std::sync::LazyLock;

use codemend_core::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::parser::{FunctionDef, ModuleAst};
use crate::rules::body::FunctionBody;

/// Kind of data-flow problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFlowIssueKind {
    NullableReturn,
    UnguardedInput,
    CrossModuleMutation,
}

/// A data-flow problem detected by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlowIssue {
    pub kind: DataFlowIssueKind,
    pub file: String,
    pub function: String,
    pub line: u32,
    pub description: String,
    pub evidence: Vec<String>,
}

static DANGEROUS_SINKS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    FxHashSet::from_iter([
        "eval",
        "exec",
        "compile",
        "os.system",
        "subprocess.run",
        "subprocess.call",
        "subprocess.Popen",
        "open",
    ])
});

/// Return annotations that make `None` an acceptable result.
const NONE_LIKE: &[&str] = &["None", "none", "NoneType"];
const NONE_OR_OPTIONAL: &[&str] = &["None", "none", "NoneType", "Optional"];

/// Analyze data flow within a module.
pub fn analyze_data_flow(module: &ModuleAst) -> Vec<DataFlowIssue> {
    let mut issues = Vec::new();

    let mutable_vars: FxHashSet<&str> = module
        .module_level_mutables()
        .into_iter()
        .map(|(name, _, _)| name)
        .collect();

    for func in module.all_functions() {
        check_nullable_return(func, &module.file_path, &mut issues);
        check_unguarded_input(func, &module.file_path, &mut issues);
        check_cross_module_mutation(func, &mutable_vars, &module.file_path, &mut issues);
    }

    issues
}

fn check_nullable_return(func: &FunctionDef, file: &str, issues: &mut Vec<DataFlowIssue>) {
    let Some(annotation) = func.return_annotation.as_deref() else {
        return;
    };
    let Some(body) = FunctionBody::parse(func) else {
        return;
    };

    if body.returns.is_empty() {
        if !NONE_LIKE.contains(&annotation) {
            issues.push(DataFlowIssue {
                kind: DataFlowIssueKind::NullableReturn,
                file: file.to_string(),
                function: func.display_name().to_string(),
                line: func.line,
                description: format!(
                    "Function '{}' has return annotation '{annotation}' but has no \
                     explicit return statement (implicitly returns None).",
                    func.name,
                ),
                evidence: vec![
                    format!("Return annotation: {annotation}"),
                    "No return statement found in function body".to_string(),
                ],
            });
        }
        return;
    }

    for ret in &body.returns {
        if !ret.has_value && !NONE_OR_OPTIONAL.contains(&annotation) {
            issues.push(DataFlowIssue {
                kind: DataFlowIssueKind::NullableReturn,
                file: file.to_string(),
                function: func.display_name().to_string(),
                line: func.line + ret.line - 1,
                description: format!(
                    "Function '{}' returns None on some paths despite annotation \
                     '{annotation}'.",
                    func.name,
                ),
                evidence: vec![
                    format!("Return annotation: {annotation}"),
                    format!("Bare 'return' at relative line {}", ret.line),
                ],
            });
        }
    }
}

fn check_unguarded_input(func: &FunctionDef, file: &str, issues: &mut Vec<DataFlowIssue>) {
    let param_names: FxHashSet<&str> = func
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .filter(|name| *name != "self")
        .collect();
    if param_names.is_empty() {
        return;
    }
    let Some(body) = FunctionBody::parse(func) else {
        return;
    };

    for call in &body.calls {
        if !DANGEROUS_SINKS.contains(call.name.as_str()) {
            continue;
        }
        for arg in &call.arg_identifiers {
            if !param_names.contains(arg.as_str()) {
                continue;
            }
            issues.push(DataFlowIssue {
                kind: DataFlowIssueKind::UnguardedInput,
                file: file.to_string(),
                function: func.display_name().to_string(),
                line: func.line + call.line - 1,
                description: format!(
                    "Parameter '{arg}' is passed directly to '{}()' without \
                     validation or sanitization.",
                    call.name,
                ),
                evidence: vec![
                    format!("Parameter: {arg}"),
                    format!("Dangerous call: {}()", call.name),
                    "No input validation detected before use".to_string(),
                ],
            });
        }
    }
}

fn check_cross_module_mutation(
    func: &FunctionDef,
    mutable_vars: &FxHashSet<&str>,
    file: &str,
    issues: &mut Vec<DataFlowIssue>,
) {
    for var_name in &func.writes_globals {
        if !mutable_vars.contains(var_name.as_str()) {
            continue;
        }
        issues.push(DataFlowIssue {
            kind: DataFlowIssueKind::CrossModuleMutation,
            file: file.to_string(),
            function: func.display_name().to_string(),
            line: func.line,
            description: format!(
                "Function '{}' mutates module-level mutable variable '{var_name}'. \
                 This can cause race conditions in concurrent environments.",
                func.name,
            ),
            evidence: vec![
                format!("Module-level mutable: {var_name}"),
                format!("Mutated by: {}", func.name),
                "Variable type: mutable container".to_string(),
            ],
        });
    }
}
