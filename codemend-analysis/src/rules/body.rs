//! Isolated re-parse of one function body.
//!
//! `FunctionDef::body_source` carries the exact source span of a function so
//! rule checks can re-parse it without the rest of the module. The body is
//! dedented first so method bodies parse standalone. A body that still fails
//! to parse yields `None` and the rule skips the function.

use codemend_core::textutil::dedent;
use tree_sitter::Node;

use crate::parser::ast_util::{
    call_target, has_child_kind, line_of, node_text, parse_python_fragment, visit,
};
use crate::parser::FunctionDef;

/// One call site inside a function body.
#[derive(Debug, Clone)]
pub struct BodyCall {
    /// Dotted call target.
    pub name: String,
    /// 1-based line relative to the body span.
    pub line: u32,
    /// Identifier names appearing anywhere in the arguments.
    pub arg_identifiers: Vec<String>,
    /// Keyword-argument names.
    pub keyword_names: Vec<String>,
    /// Count of positional arguments.
    pub positional_args: usize,
    /// True when every positional argument is a string literal.
    pub all_positional_string_literals: bool,
}

/// Loop flavor, spelled the way evidence strings report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    AsyncFor,
}

impl LoopKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::For => "For",
            Self::While => "While",
            Self::AsyncFor => "AsyncFor",
        }
    }
}

/// One loop inside a function body, with every call it contains.
#[derive(Debug, Clone)]
pub struct BodyLoop {
    pub kind: LoopKind,
    pub line: u32,
    pub calls: Vec<String>,
}

/// One return statement.
#[derive(Debug, Clone)]
pub struct BodyReturn {
    pub line: u32,
    pub has_value: bool,
}

/// Structured facts about a single function body.
#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub calls: Vec<BodyCall>,
    pub loops: Vec<BodyLoop>,
    pub returns: Vec<BodyReturn>,
    /// Calls appearing inside any except-handler.
    pub handler_calls: Vec<String>,
    pub handler_count: usize,
    pub has_with_block: bool,
    /// Dedented body text, for keyword searches.
    pub text: String,
}

impl FunctionBody {
    /// Re-parse a function in isolation. `None` when the body is empty or
    /// does not parse cleanly.
    pub fn parse(func: &FunctionDef) -> Option<Self> {
        Self::parse_source(&func.body_source)
    }

    /// Re-parse an arbitrary function-shaped source fragment.
    pub fn parse_source(body_source: &str) -> Option<Self> {
        let text = dedent(body_source);
        if text.trim().is_empty() {
            return None;
        }
        let tree = parse_python_fragment(&text)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let mut body = FunctionBody {
            calls: Vec::new(),
            loops: Vec::new(),
            returns: Vec::new(),
            handler_calls: Vec::new(),
            handler_count: 0,
            has_with_block: false,
            text: text.clone(),
        };

        visit(root, &mut |node| match node.kind() {
            "call" => {
                if let Some(call) = extract_call(node, &text) {
                    body.calls.push(call);
                }
            }
            "for_statement" => {
                let kind = if has_child_kind(node, "async") {
                    LoopKind::AsyncFor
                } else {
                    LoopKind::For
                };
                body.loops.push(extract_loop(node, kind, &text));
            }
            "while_statement" => {
                body.loops.push(extract_loop(node, LoopKind::While, &text));
            }
            "with_statement" => body.has_with_block = true,
            "except_clause" | "except_group_clause" => {
                body.handler_count += 1;
                visit(node, &mut |inner| {
                    if inner.kind() == "call" {
                        if let Some(name) = call_target(inner, &text) {
                            body.handler_calls.push(name);
                        }
                    }
                });
            }
            "return_statement" => body.returns.push(BodyReturn {
                line: line_of(node),
                has_value: node.named_child(0).is_some(),
            }),
            _ => {}
        });

        Some(body)
    }

    /// All call names, in body order.
    pub fn call_names(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(|c| c.name.as_str())
    }
}

fn extract_call(node: Node<'_>, source: &str) -> Option<BodyCall> {
    let name = call_target(node, source)?;

    let mut arg_identifiers = Vec::new();
    let mut keyword_names = Vec::new();
    let mut positional_args = 0usize;
    let mut all_positional_string_literals = true;

    if let Some(arguments) = node.child_by_field_name("arguments") {
        let mut cursor = arguments.walk();
        for arg in arguments.named_children(&mut cursor) {
            match arg.kind() {
                "keyword_argument" => {
                    if let Some(kw_name) = arg.child_by_field_name("name") {
                        keyword_names.push(node_text(kw_name, source).to_string());
                    }
                    if let Some(value) = arg.child_by_field_name("value") {
                        collect_identifiers(value, source, &mut arg_identifiers);
                    }
                }
                "comment" => {}
                _ => {
                    positional_args += 1;
                    if arg.kind() != "string" {
                        all_positional_string_literals = false;
                    }
                    collect_identifiers(arg, source, &mut arg_identifiers);
                }
            }
        }
    }

    Some(BodyCall {
        name,
        line: line_of(node),
        arg_identifiers,
        keyword_names,
        positional_args,
        all_positional_string_literals,
    })
}

fn extract_loop(node: Node<'_>, kind: LoopKind, source: &str) -> BodyLoop {
    let mut calls = Vec::new();
    visit(node, &mut |inner| {
        if inner.kind() == "call" {
            if let Some(name) = call_target(inner, source) {
                calls.push(name);
            }
        }
    });
    BodyLoop {
        kind,
        line: line_of(node),
        calls,
    }
}

/// Identifier names within an expression, excluding attribute members and
/// keyword names — the positions Python treats as plain name loads.
fn collect_identifiers(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => out.push(node_text(node, source).to_string()),
        "attribute" => {
            if let Some(object) = node.child_by_field_name("object") {
                collect_identifiers(object, source, out);
            }
        }
        "keyword_argument" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_identifiers(value, source, out);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_identifiers(child, source, out);
            }
        }
    }
}
