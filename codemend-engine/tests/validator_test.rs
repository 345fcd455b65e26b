//! Validator tests — one patch per check that fails exactly that check,
//! plus an all-green patch.

use codemend_engine::validator::validate_patch;

fn errors_of(verdict: &codemend_engine::validator::ValidationVerdict) -> String {
    verdict.errors.join(" | ")
}

#[test]
fn valid_patch_passes_all_checks() {
    let original = "def f():\n    return 1\n";
    let patched = "def f():\n    return 2\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(verdict.valid, "unexpected errors: {}", errors_of(&verdict));
    assert!(verdict.errors.is_empty());
}

#[test]
fn check1_syntax_error_rejected() {
    let original = "def f():\n    return 1\n";
    let patched = "def f(:\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("syntax"));
}

#[test]
fn check2_renamed_function_rejected() {
    let original = "def f():\n    return 1\n";
    let patched = "def g():\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("renamed or removed"));
}

#[test]
fn check3_dropped_route_decorator_rejected() {
    let original = "@app.get(\"/x\")\ndef handler():\n    return 1\n";
    let patched = "def handler():\n    return 1\n";
    let verdict = validate_patch(
        original,
        patched,
        "handler",
        false,
        &["app.get".to_string()],
    );
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("Route decorator"));
}

#[test]
fn check3_preserved_route_decorator_accepted() {
    let original = "@app.get(\"/x\")\ndef handler():\n    return 1\n";
    let patched = "@app.get(\"/x\")\ndef handler():\n    return 2\n";
    let verdict = validate_patch(
        original,
        patched,
        "handler",
        false,
        &["app.get".to_string()],
    );
    assert!(verdict.valid, "unexpected errors: {}", errors_of(&verdict));
}

#[test]
fn check4_new_global_statement_rejected() {
    let original = "def f():\n    return 1\n";
    let patched = "def f():\n    global state\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("global statement"));
}

#[test]
fn check5_forbidden_import_rejected() {
    let original = "def f():\n    return 1\n";
    let patched = "import subprocess\n\ndef f():\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("forbidden import"));
}

#[test]
fn check5_benign_import_accepted() {
    let original = "def f():\n    return 1\n";
    let patched = "import logging\n\ndef f():\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(verdict.valid, "unexpected errors: {}", errors_of(&verdict));
}

#[test]
fn check6_blocking_call_in_async_rejected() {
    let original = "async def f():\n    return 1\n";
    let patched = "async def f():\n    time.sleep(1)\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", true, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("blocking"));
}

#[test]
fn check6_only_applies_to_async_targets() {
    let original = "def f():\n    return 1\n";
    let patched = "def f():\n    time.sleep(1)\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(verdict.valid, "unexpected errors: {}", errors_of(&verdict));
}

#[test]
fn check7_removed_return_rejected() {
    let original = "def f(x):\n    if x:\n        return 1\n    return 2\n";
    let patched = "def f(x):\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("return statement"));
}

#[test]
fn check7_removed_handler_rejected() {
    let original =
        "def f():\n    try:\n        return work()\n    except Exception:\n        return None\n";
    let patched = "def f():\n    if True:\n        return work()\n    return None\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(!verdict.valid);
    assert!(errors_of(&verdict).contains("exception handler"));
    // Same return count, so only the handler check fires.
    assert_eq!(verdict.errors.len(), 1);
}

#[test]
fn unparseable_original_compares_nothing() {
    let original = "def f(:\n    pass\n";
    let patched = "def f():\n    return 1\n";
    let verdict = validate_patch(original, patched, "f", false, &[]);
    assert!(verdict.valid);
}
