//! Source parsing — routes files by extension to the Python extractor.

pub mod ast_util;
pub mod python;
pub mod types;

pub use types::{
    AsyncBoundary, AsyncBoundaryKind, ClassDef, ExceptionFlow, FunctionDef, ImportKind,
    ImportRecord, ModuleAst, ModuleCall, MutationScope, Parameter, TargetType, VariableMutation,
};

/// Parse a source file based on its extension.
///
/// Only Python is supported. Extensions naming another language yield an
/// empty `ModuleAst` with a single parse-error note and the rest of the
/// pipeline skips them. Paths with no extension (the legacy `"unknown"`
/// synthesized file) default to Python.
pub fn parse_file(source: &str, file_path: &str) -> ModuleAst {
    let total_lines = source.lines().count() as u32;
    match extension(file_path) {
        Some("py") | None => python::parse_python(source, file_path),
        Some(ext @ ("js" | "ts" | "jsx" | "tsx")) => ModuleAst::empty(
            file_path,
            "javascript",
            total_lines,
            vec![format!("unsupported language (.{ext}) — file skipped")],
        ),
        Some(ext) => ModuleAst::empty(
            file_path,
            "unknown",
            total_lines,
            vec![format!("unsupported file extension (.{ext}) — file skipped")],
        ),
    }
}

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_extension_routes_to_parser() {
        let ast = parse_file("def f():\n    return 1\n", "a.py");
        assert_eq!(ast.language, "python");
        assert_eq!(ast.functions.len(), 1);
    }

    #[test]
    fn unsupported_extension_is_skipped_with_note() {
        let ast = parse_file("function f() {}", "a.ts");
        assert_eq!(ast.language, "javascript");
        assert!(ast.functions.is_empty());
        assert_eq!(ast.parse_errors.len(), 1);
    }

    #[test]
    fn extensionless_path_defaults_to_python() {
        let ast = parse_file("x = 1\n", "unknown");
        assert_eq!(ast.language, "python");
        assert!(ast.parse_errors.is_empty());
        assert_eq!(ast.module_level_names, vec!["x"]);
    }

    #[test]
    fn foreign_extension_is_skipped() {
        let ast = parse_file("body { color: red }", "style.css");
        assert_eq!(ast.language, "unknown");
        assert_eq!(ast.parse_errors.len(), 1);
    }
}
