//! Shared tree-sitter helpers used by the extractor, the body re-parser,
//! and the structural patch checks.

use tree_sitter::{Node, Parser, Tree};

/// Parse a Python fragment, returning the tree even when it contains error
/// nodes. Callers that need a clean tree check `root_node().has_error()`.
pub fn parse_python_fragment(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    parser.parse(source, None)
}

/// Dotted-name extraction for expressions.
///
/// Identifiers yield their text, attributes their dotted spelling
/// (`a.b.c`), subscripts the name of their base. Calls and anything else
/// yield `None` and are ignored downstream.
pub fn dotted_name(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => {
            let attr = node
                .child_by_field_name("attribute")
                .map(|n| node_text(n, source).to_string())?;
            match node
                .child_by_field_name("object")
                .and_then(|obj| dotted_name(obj, source))
            {
                Some(value) => Some(format!("{value}.{attr}")),
                None => Some(attr),
            }
        }
        "subscript" => node
            .child_by_field_name("value")
            .and_then(|v| dotted_name(v, source)),
        "none" => Some("None".to_string()),
        "true" => Some("True".to_string()),
        "false" => Some("False".to_string()),
        _ => None,
    }
}

/// The dotted target of a `call` node.
pub fn call_target(call: Node<'_>, source: &str) -> Option<String> {
    let func = call.child_by_field_name("function")?;
    dotted_name(func, source)
}

/// Node text, empty on (impossible) invalid UTF-8 boundaries.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Depth-first traversal over all children.
pub fn visit<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            f(child);
            visit(child, f);
        }
    }
}

/// Whether any direct child has the given kind (e.g. the `async` keyword).
pub fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return true;
            }
        }
    }
    false
}

/// 1-based start line.
pub fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based end line.
pub fn end_line_of(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}
