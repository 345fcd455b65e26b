//! Applier tests — round-trip identity, decorator-inclusive ranges,
//! indentation normalization, and the line-range form.

use codemend_engine::applier::{
    apply_function_patch, apply_line_range_patch, extract_function_source,
};

const SOURCE: &str = "def first():\n    return 1\n\n\ndef second():\n    return 2\n";

#[test]
fn replacing_a_function_with_itself_round_trips() {
    let original = extract_function_source(SOURCE, "first").expect("function found");
    let patched = apply_function_patch(SOURCE, "first", &original).expect("patch applies");
    assert_eq!(patched, SOURCE);
}

#[test]
fn replaces_only_the_target_function() {
    let new_code = "def first():\n    return 10\n";
    let patched = apply_function_patch(SOURCE, "first", new_code).expect("patch applies");
    assert!(patched.contains("return 10"));
    assert!(!patched.contains("return 1\n\n"));
    assert!(patched.contains("def second():\n    return 2"));
}

#[test]
fn decorators_are_part_of_the_replaced_range() {
    let source = "@app.get(\"/x\")\ndef handler():\n    return 1\n";
    let new_code = "@app.get(\"/x\")\ndef handler():\n    return 2\n";
    let patched = apply_function_patch(source, "handler", new_code).expect("patch applies");
    assert_eq!(patched.matches("@app.get").count(), 1);
    assert!(patched.contains("return 2"));
}

#[test]
fn extraction_includes_decorators() {
    let source = "@app.get(\"/x\")\ndef handler():\n    return 1\n";
    let extracted = extract_function_source(source, "handler").expect("function found");
    assert!(extracted.starts_with("@app.get"));
    assert!(extracted.ends_with("return 1"));
}

#[test]
fn method_replacement_keeps_class_indentation() {
    let source = "class Api:\n    def handle(self):\n        return 1\n";
    let new_code = "def handle(self):\n    return 99\n";
    let patched = apply_function_patch(source, "handle", new_code).expect("patch applies");
    assert!(patched.contains("    def handle(self):"));
    assert!(patched.contains("        return 99"));
}

#[test]
fn missing_function_returns_none() {
    assert!(apply_function_patch(SOURCE, "absent", "def absent():\n    pass\n").is_none());
}

#[test]
fn syntax_breaking_patch_returns_none() {
    assert!(apply_function_patch(SOURCE, "first", "def first(:\n    pass\n").is_none());
}

#[test]
fn line_range_patch_replaces_inclusive_span() {
    let source = "a = 1\nb = 2\nc = 3\n";
    let patched = apply_line_range_patch(source, 2, 2, "b = 20").expect("patch applies");
    assert_eq!(patched, "a = 1\nb = 20\nc = 3\n");
}

#[test]
fn line_range_patch_reindents_to_first_line() {
    let source = "def f():\n    x = 1\n    return x\n";
    let patched = apply_line_range_patch(source, 2, 2, "x = 2").expect("patch applies");
    assert!(patched.contains("    x = 2"));
}

#[test]
fn invalid_line_ranges_return_none() {
    let source = "a = 1\nb = 2\n";
    assert!(apply_line_range_patch(source, 0, 1, "x = 1").is_none());
    assert!(apply_line_range_patch(source, 2, 1, "x = 1").is_none());
    assert!(apply_line_range_patch(source, 1, 9, "x = 1").is_none());
}
