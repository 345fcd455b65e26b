//! Parser tests — extraction fidelity, error handling, globals tracking,
//! and body spans.

use codemend_analysis::parser::{
    parse_file, AsyncBoundaryKind, ImportKind, MutationScope, TargetType,
};

const SAMPLE: &str = r#"import os
import json as j
from collections import OrderedDict

CACHE = {}

def top(a, b: int) -> str:
    return str(a)

class Service:
    retries = 3

    def fetch(self, url):
        return url

async def poll():
    await top(1, 2)
"#;

#[test]
fn extracts_functions_classes_and_imports() {
    let ast = parse_file(SAMPLE, "sample.py");
    assert!(ast.parse_errors.is_empty());
    assert_eq!(ast.language, "python");

    let names: Vec<&str> = ast.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["top", "poll"]);

    assert_eq!(ast.classes.len(), 1);
    let service = &ast.classes[0];
    assert_eq!(service.name, "Service");
    assert_eq!(service.class_variables, vec!["retries"]);
    assert_eq!(service.methods.len(), 1);
    assert_eq!(service.methods[0].qualified_name, "Service.fetch");

    assert_eq!(ast.imports.len(), 3);
    assert_eq!(ast.imports[0].module, "os");
    assert_eq!(ast.imports[0].kind, ImportKind::Plain);
    assert_eq!(ast.imports[1].module, "json");
    assert_eq!(ast.imports[1].alias.as_deref(), Some("j"));
    assert_eq!(ast.imports[2].kind, ImportKind::From);
    assert_eq!(ast.imports[2].module, "collections");
    assert_eq!(ast.imports[2].imported_names, vec!["OrderedDict"]);
}

#[test]
fn module_level_names_cover_bindings() {
    let ast = parse_file(SAMPLE, "sample.py");
    for expected in ["CACHE", "top", "Service", "poll"] {
        assert!(
            ast.module_level_names.iter().any(|n| n == expected),
            "missing module-level name {expected}"
        );
    }
    // Locals inside functions never leak to module scope.
    assert!(!ast.module_level_names.iter().any(|n| n == "url"));
}

#[test]
fn signature_extraction() {
    let ast = parse_file(SAMPLE, "sample.py");
    let top = &ast.functions[0];
    assert_eq!(top.parameters.len(), 2);
    assert_eq!(top.parameters[0].name, "a");
    assert_eq!(top.parameters[0].annotation, None);
    assert_eq!(top.parameters[1].annotation.as_deref(), Some("int"));
    assert_eq!(top.return_annotation.as_deref(), Some("str"));
}

#[test]
fn module_assignment_records_target_type() {
    let ast = parse_file(SAMPLE, "sample.py");
    let cache = ast
        .variable_mutations
        .iter()
        .find(|vm| vm.name == "CACHE")
        .expect("CACHE mutation recorded");
    assert_eq!(cache.scope, MutationScope::Module);
    assert_eq!(cache.target_type, Some(TargetType::Dict));
    assert!(!cache.is_augmented);
}

#[test]
fn awaited_calls_are_subset_of_calls() {
    let ast = parse_file(SAMPLE, "sample.py");
    let poll = ast.functions.iter().find(|f| f.name == "poll").unwrap();
    assert!(poll.is_async);
    assert!(poll.calls.iter().any(|c| c == "top"));
    assert_eq!(poll.awaits, vec!["top"]);

    let async_def = ast
        .async_boundaries
        .iter()
        .find(|b| b.kind == AsyncBoundaryKind::AsyncDef)
        .expect("async def boundary recorded");
    assert_eq!(async_def.name, "poll");
    let awaited = ast
        .async_boundaries
        .iter()
        .find(|b| b.kind == AsyncBoundaryKind::Await)
        .expect("await boundary recorded");
    assert_eq!(awaited.name, "top");
    assert_eq!(awaited.enclosing_function, "poll");
}

#[test]
fn body_source_spans_exact_lines() {
    let ast = parse_file(SAMPLE, "sample.py");
    let top = &ast.functions[0];
    assert_eq!(top.body_source, "def top(a, b: int) -> str:\n    return str(a)");
}

#[test]
fn syntax_error_empties_all_collections() {
    let ast = parse_file("def broken(:\n    pass\n", "broken.py");
    assert!(!ast.parse_errors.is_empty());
    assert!(ast.functions.is_empty());
    assert!(ast.classes.is_empty());
    assert!(ast.imports.is_empty());
    assert!(ast.module_level_names.is_empty());
}

#[test]
fn globals_read_write_sets() {
    let source = r#"counter = 0
items = []

def bump():
    global counter
    counter += 1

def shadowed(items):
    return items

def push(x):
    items.append(x)
"#;
    let ast = parse_file(source, "globals.py");

    let bump = ast.functions.iter().find(|f| f.name == "bump").unwrap();
    assert!(bump.writes_globals.iter().any(|n| n == "counter"));

    // Parameters shadow module-level names.
    let shadowed = ast.functions.iter().find(|f| f.name == "shadowed").unwrap();
    assert!(shadowed.reads_globals.is_empty());
    assert!(shadowed.writes_globals.is_empty());

    // Method-call receivers are reads, not writes.
    let push = ast.functions.iter().find(|f| f.name == "push").unwrap();
    assert!(push.reads_globals.iter().any(|n| n == "items"));
    assert!(!push.writes_globals.iter().any(|n| n == "items"));
}

#[test]
fn global_declaration_forces_write() {
    let source = r#"shared_data = []

async def writer(x):
    global shared_data
    shared_data.append(x)
"#;
    let ast = parse_file(source, "writer.py");
    let writer = &ast.functions[0];
    assert!(writer.writes_globals.iter().any(|n| n == "shared_data"));
}

#[test]
fn call_form_decorators_record_callee() {
    let source = r#"@app.get("/users")
def handler(req):
    return req
"#;
    let ast = parse_file(source, "routes.py");
    let handler = &ast.functions[0];
    assert_eq!(handler.decorators, vec!["app.get"]);
    // Decorator invocations surface in the call list too.
    assert!(handler.calls.iter().any(|c| c == "app.get"));
}

#[test]
fn dotted_calls_preserved() {
    let source = r#"def fire():
    a.b.c()
    plain()
"#;
    let ast = parse_file(source, "dotted.py");
    let fire = &ast.functions[0];
    assert!(fire.calls.iter().any(|c| c == "a.b.c"));
    assert!(fire.calls.iter().any(|c| c == "plain"));
}

#[test]
fn exception_flows_recorded() {
    let source = r#"def guarded():
    try:
        risky()
    except ValueError:
        raise
    except Exception:
        pass
"#;
    let ast = parse_file(source, "exc.py");
    assert_eq!(ast.exception_flows.len(), 2);
    assert!(ast.exception_flows[0].has_reraise);
    assert_eq!(ast.exception_flows[0].exception_types, vec!["ValueError"]);
    let guarded = &ast.functions[0];
    assert!(guarded.has_try_except);
    assert!(!guarded.has_bare_except);
}

#[test]
fn bare_except_flagged() {
    let source = r#"def swallow():
    try:
        risky()
    except:
        pass
"#;
    let ast = parse_file(source, "bare.py");
    let swallow = &ast.functions[0];
    assert!(swallow.has_bare_except);
    assert!(ast.exception_flows[0].is_bare);
}

#[test]
fn nested_functions_are_not_extracted() {
    let source = r#"def outer():
    def inner():
        return 1
    return inner
"#;
    let ast = parse_file(source, "nested.py");
    let names: Vec<&str> = ast.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["outer"]);
}

#[test]
fn parse_is_deterministic() {
    let first = parse_file(SAMPLE, "sample.py");
    let second = parse_file(SAMPLE, "sample.py");
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
