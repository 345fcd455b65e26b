//! Structural patch validation — seven AST-level checks comparing original
//! and patched source. All seven must pass; the validator never accepts a
//! patch on partial success.

use codemend_analysis::parser::ast_util::{
    call_target, dotted_name, line_of, node_text, parse_python_fragment, visit,
};
use codemend_analysis::rules::tables::{
    BLOCKING_CALLS, FORBIDDEN_IMPORTS, ROUTE_DECORATOR_KEYWORDS,
};
use codemend_core::FxHashSet;
use tree_sitter::{Node, Tree};

/// Result of structural validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationVerdict {
    fn pass() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }
}

/// Validate a patch against the original source.
///
/// Checks, in order: patched source parses; no function renamed or removed;
/// route decorators preserved on the target; no new `global` statements; no
/// forbidden imports introduced; no blocking calls in an async target; no
/// reduction in return statements or exception handlers.
pub fn validate_patch(
    original_source: &str,
    patched_source: &str,
    target_function: &str,
    is_async: bool,
    original_decorators: &[String],
) -> ValidationVerdict {
    let mut verdict = ValidationVerdict::pass();

    // Check 1: patched source parses.
    let patched_tree = match parse_python_fragment(patched_source) {
        Some(tree) if !tree.root_node().has_error() => tree,
        Some(tree) => {
            let line = first_error_line(&tree).unwrap_or(1);
            verdict.add_error(format!("Patched code has syntax error near line {line}"));
            return verdict;
        }
        None => {
            verdict.add_error("Patched code could not be parsed".to_string());
            return verdict;
        }
    };

    // Without a parseable original there is nothing to compare against.
    let original_tree = match parse_python_fragment(original_source) {
        Some(tree) if !tree.root_node().has_error() => tree,
        _ => return verdict,
    };

    let original_root = original_tree.root_node();
    let patched_root = patched_tree.root_node();

    // Check 2: every original function name survives.
    let original_funcs = function_names(original_root, original_source);
    let patched_funcs = function_names(patched_root, patched_source);
    if original_funcs.contains(target_function) && !patched_funcs.contains(target_function) {
        verdict.add_error(format!(
            "Function '{target_function}' was renamed or removed in patch"
        ));
    }
    for name in &original_funcs {
        if name != target_function && !patched_funcs.contains(name) {
            verdict.add_error(format!("Function '{name}' was removed in patch"));
        }
    }

    // Check 3: route decorators still attached to the target.
    if !original_decorators.is_empty() {
        let patched_decorators = find_function(patched_root, target_function, patched_source)
            .map(|(_, decorated)| decorator_names(decorated, patched_source))
            .unwrap_or_default();
        for orig_dec in original_decorators {
            if is_route_decorator(orig_dec) && !patched_decorators.contains(orig_dec) {
                verdict.add_error(format!(
                    "Route decorator '{orig_dec}' was modified or removed"
                ));
            }
        }
    }

    // Check 4: no new top-level `global` statements.
    let original_globals = count_kind(original_root, "global_statement");
    let patched_globals = count_kind(patched_root, "global_statement");
    if patched_globals > original_globals {
        verdict.add_error(format!(
            "Patch introduces {} new global statement(s)",
            patched_globals - original_globals
        ));
    }

    // Check 5: no newly-introduced forbidden imports.
    let original_imports = import_modules(original_root, original_source);
    let patched_imports = import_modules(patched_root, patched_source);
    for import in patched_imports.difference(&original_imports) {
        if FORBIDDEN_IMPORTS
            .iter()
            .any(|forbidden| import.contains(forbidden))
        {
            verdict.add_error(format!("Patch adds forbidden import: '{import}'"));
        }
    }

    // Check 6: no blocking calls inside an async target.
    if is_async {
        if let Some((func_node, _)) = find_function(patched_root, target_function, patched_source)
        {
            let blocking = blocking_calls(func_node, patched_source);
            if !blocking.is_empty() {
                verdict.add_error(format!(
                    "Patch introduces blocking calls in async function: {}",
                    blocking.join(", ")
                ));
            }
        }
    }

    // Check 7: return statements and exception handlers never decrease.
    let original_target = find_function(original_root, target_function, original_source);
    let patched_target = find_function(patched_root, target_function, patched_source);
    if let (Some((orig_node, _)), Some((patched_node, _))) = (original_target, patched_target) {
        let orig_returns = count_kind(orig_node, "return_statement");
        let patched_returns = count_kind(patched_node, "return_statement");
        if patched_returns < orig_returns {
            verdict.add_error(format!(
                "Patch removes {} return statement(s)",
                orig_returns - patched_returns
            ));
        }

        let orig_handlers = count_handlers(orig_node);
        let patched_handlers = count_handlers(patched_node);
        if patched_handlers < orig_handlers {
            verdict.add_error(format!(
                "Patch removes {} exception handler(s)",
                orig_handlers - patched_handlers
            ));
        }
    }

    if verdict.valid {
        tracing::info!(target_function, "structural validation passed");
    } else {
        tracing::warn!(target_function, errors = ?verdict.errors, "structural validation failed");
    }

    verdict
}

/// All function and method names, at any nesting level.
fn function_names(root: Node<'_>, source: &str) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    visit(root, &mut |node| {
        if node.kind() == "function_definition" {
            if let Some(name) = node.child_by_field_name("name") {
                names.insert(node_text(name, source).to_string());
            }
        }
    });
    names
}

/// Find a function definition by name, returning the node and its wrapping
/// `decorated_definition` when present.
fn find_function<'t>(
    root: Node<'t>,
    name: &str,
    source: &str,
) -> Option<(Node<'t>, Node<'t>)> {
    let mut found = None;
    visit(root, &mut |node| {
        if found.is_some() || node.kind() != "function_definition" {
            return;
        }
        let matches = node
            .child_by_field_name("name")
            .map(|n| node_text(n, source) == name)
            .unwrap_or(false);
        if matches {
            let wrapper = node
                .parent()
                .filter(|p| p.kind() == "decorated_definition")
                .unwrap_or(node);
            found = Some((node, wrapper));
        }
    });
    found
}

/// Decorator spellings attached to a (possibly decorated) definition.
fn decorator_names(decorated: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    if decorated.kind() != "decorated_definition" {
        return names;
    }
    let mut cursor = decorated.walk();
    for child in decorated.named_children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let Some(expr) = child.named_child(0) else {
            continue;
        };
        let name = if expr.kind() == "call" {
            expr.child_by_field_name("function")
                .and_then(|f| dotted_name(f, source))
        } else {
            dotted_name(expr, source)
        };
        if let Some(name) = name {
            names.push(name);
        }
    }
    names
}

/// A decorator is routing when any dotted segment is a route keyword.
fn is_route_decorator(name: &str) -> bool {
    name.to_lowercase()
        .split('.')
        .any(|part| ROUTE_DECORATOR_KEYWORDS.contains(&part))
}

fn count_kind(node: Node<'_>, kind: &str) -> usize {
    let mut count = 0;
    visit(node, &mut |child| {
        if child.kind() == kind {
            count += 1;
        }
    });
    count
}

fn count_handlers(node: Node<'_>) -> usize {
    count_kind(node, "except_clause") + count_kind(node, "except_group_clause")
}

/// Module strings of every import in the tree.
fn import_modules(root: Node<'_>, source: &str) -> FxHashSet<String> {
    let mut modules = FxHashSet::default();
    visit(root, &mut |node| match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "dotted_name" => {
                        modules.insert(node_text(child, source).to_string());
                    }
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            modules.insert(node_text(name, source).to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                modules.insert(node_text(module, source).to_string());
            }
        }
        _ => {}
    });
    modules
}

/// Blocking call names inside a function node.
fn blocking_calls(func: Node<'_>, source: &str) -> Vec<String> {
    let mut found = Vec::new();
    visit(func, &mut |node| {
        if node.kind() == "call" {
            if let Some(name) = call_target(node, source) {
                if BLOCKING_CALLS.contains_key(name.as_str()) {
                    found.push(name);
                }
            }
        }
    });
    found
}

fn first_error_line(tree: &Tree) -> Option<u32> {
    let mut line = None;
    visit(tree.root_node(), &mut |node| {
        if line.is_none() && (node.is_error() || node.is_missing()) {
            line = Some(line_of(node));
        }
    });
    line
}
