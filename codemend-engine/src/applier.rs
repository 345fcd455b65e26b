//! Patch applier — replaces a named function (or an arbitrary line range)
//! in source text, preserving the surrounding indentation.
//!
//! Operates on in-memory source strings; the engine receives code over the
//! wire and returns patched sources in the response.

use codemend_analysis::parser::ast_util::{
    end_line_of, line_of, node_text, parse_python_fragment, visit,
};
use codemend_core::textutil::{dedent, indent, leading_whitespace};
use tree_sitter::Node;

/// Replace a function in source with new code.
///
/// The replaced range includes any decorators above the `def`. The new code
/// is dedented, then re-indented to the width of the first replaced line.
/// Returns `None` when the target is missing or the result does not parse.
pub fn apply_function_patch(
    source: &str,
    target_function: &str,
    new_function_code: &str,
) -> Option<String> {
    let tree = parse_python_fragment(source)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::error!("cannot parse source for patching");
        return None;
    }

    let (start_line, end_line) = function_range(root, target_function, source)?;
    let patched = splice_lines(source, start_line, end_line, new_function_code)?;

    match parse_python_fragment(&patched) {
        Some(tree) if !tree.root_node().has_error() => {
            tracing::info!(
                target_function,
                start_line,
                end_line,
                "applied function patch"
            );
            Some(patched)
        }
        _ => {
            tracing::error!(target_function, "patched source has syntax error");
            None
        }
    }
}

/// Replace an arbitrary inclusive line range with supplied code, applying
/// the same indent normalization as the function form.
pub fn apply_line_range_patch(
    source: &str,
    start_line: u32,
    end_line: u32,
    new_code: &str,
) -> Option<String> {
    let line_count = source.lines().count() as u32;
    if start_line < 1 || end_line > line_count || start_line > end_line {
        tracing::error!(start_line, end_line, line_count, "invalid line range");
        return None;
    }

    let patched = splice_lines(source, start_line, end_line, new_code)?;
    match parse_python_fragment(&patched) {
        Some(tree) if !tree.root_node().has_error() => Some(patched),
        _ => {
            tracing::error!("line range patch produced syntax error");
            None
        }
    }
}

/// Extract a single function's source, decorators included.
pub fn extract_function_source(source: &str, function_name: &str) -> Option<String> {
    if function_name.is_empty() {
        return None;
    }
    let tree = parse_python_fragment(source)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }

    let (start_line, end_line) = function_range(root, function_name, source)?;
    let lines: Vec<&str> = source.lines().collect();
    let start = (start_line - 1) as usize;
    let end = (end_line as usize).min(lines.len());
    if start >= end {
        return None;
    }
    Some(lines[start..end].join("\n"))
}

/// The decorator-inclusive 1-based line range of a named function.
fn function_range(root: Node<'_>, target: &str, source: &str) -> Option<(u32, u32)> {
    let mut range = None;
    visit(root, &mut |node| {
        if range.is_some() || node.kind() != "function_definition" {
            return;
        }
        let matches = node
            .child_by_field_name("name")
            .map(|n| node_text(n, source) == target)
            .unwrap_or(false);
        if !matches {
            return;
        }
        let start = match node.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => line_of(parent),
            _ => line_of(node),
        };
        range = Some((start, end_line_of(node)));
    });
    range
}

/// Substitute `new_code` for the inclusive line range, matching the first
/// replaced line's indentation.
fn splice_lines(source: &str, start_line: u32, end_line: u32, new_code: &str) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let start = (start_line.max(1) - 1) as usize;
    let end = (end_line as usize).min(lines.len());
    if start >= lines.len() || start >= end {
        return None;
    }

    let original_indent = leading_whitespace(lines[start]).to_string();
    let dedented = dedent(new_code);
    let replacement = if original_indent.is_empty() {
        dedented.trim().to_string()
    } else {
        indent(dedented.trim(), &original_indent)
    };

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start]);
    out.push(&replacement);
    out.extend_from_slice(&lines[end..]);

    let mut patched = out.join("\n");
    if source.ends_with('\n') && !patched.ends_with('\n') {
        patched.push('\n');
    }
    Some(patched)
}
