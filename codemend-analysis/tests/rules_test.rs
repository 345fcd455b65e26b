//! Rule catalog tests — the clean corpus stays silent, every rule fires on
//! its canonical example, and rule failures are isolated.

use codemend_analysis::call_graph::CallGraph;
use codemend_analysis::engine::RuleEngine;
use codemend_analysis::parser::{parse_file, ModuleAst};
use codemend_analysis::rules::{default_registry, Rule, RuleRegistry, Violation};
use codemend_core::Severity;

const CLEAN: &str = r#"def add(a, b):
    return a + b

def greet(name):
    return "Hello, " + name
"#;

fn single_rule(rule_id: &str, source: &str) -> Vec<Violation> {
    let module = parse_file(source, "test.py");
    RuleEngine::new().run_single_rule(rule_id, &module, None)
}

#[test]
fn registry_holds_twelve_rules() {
    let registry = default_registry();
    assert_eq!(registry.count(), 12);
    let ids = registry.rule_ids();
    for expected in [
        "race_condition",
        "missing_await",
        "unsanitized_io",
        "dangerous_eval",
        "shared_mutable_state",
        "missing_exception_boundary",
        "retry_without_backoff",
        "blocking_io_in_async",
        "db_conn_per_request",
        "missing_idempotency",
        "partial_txn_no_rollback",
        "missing_http_timeout",
    ] {
        assert!(ids.contains(&expected), "missing rule {expected}");
    }
}

#[test]
fn clean_corpus_is_silent() {
    let module = parse_file(CLEAN, "clean.py");
    let result = RuleEngine::new().run(&[("clean.py".to_string(), module)], None);
    assert!(
        result.violations.is_empty(),
        "clean corpus fired: {:?}",
        result.violations
    );
    assert_eq!(result.rules_executed.len(), 12);
    assert_eq!(result.total_files_scanned, 1);
}

#[test]
fn race_condition_names_both_writers() {
    let source = r#"shared_data = []

async def writer_a(x):
    global shared_data
    shared_data.append(x)

async def writer_b():
    global shared_data
    shared_data.clear()
"#;
    let violations = single_rule("race_condition", source);
    assert_eq!(violations.len(), 1);
    let violation = &violations[0];
    assert_eq!(violation.severity, Severity::Critical);
    let evidence = violation.evidence.join(" ");
    assert!(evidence.contains("writer_a"));
    assert!(evidence.contains("writer_b"));
    assert!(evidence.contains("shared_data"));
    assert!(violation.evidence.len() >= 3);
}

#[test]
fn race_condition_requires_two_async_writers() {
    let source = r#"shared_data = []

async def only_writer(x):
    global shared_data
    shared_data.append(x)
"#;
    assert!(single_rule("race_condition", source).is_empty());
}

#[test]
fn missing_await_critical_from_sync_caller() {
    let source = r#"async def fetch_data():
    return 1

def runner():
    fetch_data()
"#;
    let violations = single_rule("missing_await", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Critical);
    assert!(violations[0].title.contains("fetch_data"));
}

#[test]
fn missing_await_high_from_async_caller() {
    let source = r#"async def fetch_data():
    return 1

async def runner():
    fetch_data()
"#;
    let violations = single_rule("missing_await", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
}

#[test]
fn awaited_call_is_not_flagged() {
    let source = r#"async def fetch_data():
    return 1

async def runner():
    await fetch_data()
"#;
    assert!(single_rule("missing_await", source).is_empty());
}

#[test]
fn unsanitized_io_traces_parameter() {
    let source = r#"def remove(path):
    os.remove(path)
"#;
    let violations = single_rule("unsanitized_io", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Critical);
    let evidence = violations[0].evidence.join(" ");
    assert!(evidence.contains("os.remove"));
    assert!(evidence.contains("path"));
}

#[test]
fn unsanitized_io_ignores_constants() {
    let source = r#"def cleanup(unused):
    os.remove("/tmp/fixed-path")
"#;
    assert!(single_rule("unsanitized_io", source).is_empty());
}

#[test]
fn dangerous_eval_fires_on_dynamic_argument() {
    let source = r#"def run(s):
    return eval(s)
"#;
    let violations = single_rule("dangerous_eval", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Critical);
    assert!(violations[0].evidence.join(" ").contains("eval"));
}

#[test]
fn dangerous_eval_allows_string_literal() {
    let source = r#"def run():
    return eval("1 + 1")
"#;
    assert!(single_rule("dangerous_eval", source).is_empty());
}

#[test]
fn shared_mutable_state_counts_accessors() {
    let source = r#"registry = {}

def add_item(k, v):
    registry[k] = v

def get_item(k):
    return registry.get(k)
"#;
    let violations = single_rule("shared_mutable_state", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
    let evidence = violations[0].evidence.join(" ");
    assert!(evidence.contains("add_item"));
    assert!(evidence.contains("get_item"));
}

#[test]
fn missing_exception_boundary_on_decorated_handler() {
    let source = r#"@app.get("/items")
def list_items():
    return load()
"#;
    let violations = single_rule("missing_exception_boundary", source);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].title.contains("list_items"));
}

#[test]
fn missing_exception_boundary_on_async_handler_prefix() {
    let source = r#"async def handle_message(msg):
    return msg
"#;
    let violations = single_rule("missing_exception_boundary", source);
    assert_eq!(violations.len(), 1);
}

#[test]
fn exception_boundary_satisfied_by_try() {
    let source = r#"@app.get("/items")
def list_items():
    try:
        return load()
    except Exception:
        return []
"#;
    assert!(single_rule("missing_exception_boundary", source).is_empty());
}

#[test]
fn retry_without_backoff_flags_tight_loop() {
    let source = r#"def poll(url):
    while True:
        requests.get(url, timeout=5)
"#;
    let violations = single_rule("retry_without_backoff", source);
    assert_eq!(violations.len(), 1);
    let evidence = violations[0].evidence.join(" ");
    assert!(evidence.contains("While"));
    assert!(evidence.contains("requests.get"));
}

#[test]
fn sleep_in_loop_counts_as_backoff() {
    let source = r#"def poll(url):
    while True:
        requests.get(url, timeout=5)
        time.sleep(1)
"#;
    assert!(single_rule("retry_without_backoff", source).is_empty());
}

#[test]
fn blocking_io_in_async_flags_sleep() {
    let source = r#"async def f():
    time.sleep(1)
"#;
    let violations = single_rule("blocking_io_in_async", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
    assert!(violations[0].evidence.join(" ").contains("time.sleep"));
}

#[test]
fn blocking_calls_allowed_in_sync_functions() {
    let source = r#"def f():
    time.sleep(1)
"#;
    assert!(single_rule("blocking_io_in_async", source).is_empty());
}

#[test]
fn db_conn_per_request_in_handler() {
    let source = r#"@app.get("/data")
def data():
    conn = sqlite3.connect("db.sqlite")
    return conn
"#;
    let violations = single_rule("db_conn_per_request", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Critical);
    assert_eq!(
        violations[0].metadata.get("failure_class").map(String::as_str),
        Some("resource_exhaustion")
    );
}

#[test]
fn db_conn_outside_handler_is_fine() {
    let source = r#"def startup():
    conn = sqlite3.connect("db.sqlite")
    return conn
"#;
    assert!(single_rule("db_conn_per_request", source).is_empty());
}

#[test]
fn missing_idempotency_on_mutating_handler() {
    let source = r#"@app.post("/orders")
def create_order(payload):
    cursor.execute("INSERT INTO orders VALUES (?)", payload)
    return {"ok": True}
"#;
    let violations = single_rule("missing_idempotency", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
}

#[test]
fn idempotency_keyword_suppresses() {
    let source = r#"@app.post("/orders")
def create_order(payload, idempotency_key):
    if idempotency_key:
        cursor.execute("INSERT INTO orders VALUES (?)", payload)
    return {"ok": True}
"#;
    assert!(single_rule("missing_idempotency", source).is_empty());
}

#[test]
fn partial_txn_without_commit_is_critical() {
    let source = r#"def save(data):
    cursor.execute("INSERT INTO t VALUES (?)", data)
"#;
    let violations = single_rule("partial_txn_no_rollback", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Critical);
}

#[test]
fn partial_txn_with_commit_is_high() {
    let source = r#"def save(data):
    cursor.execute("INSERT INTO t VALUES (?)", data)
    conn.commit()
"#;
    let violations = single_rule("partial_txn_no_rollback", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
}

#[test]
fn rollback_handler_satisfies_txn_rule() {
    let source = r#"def save(data):
    try:
        cursor.execute("INSERT INTO t VALUES (?)", data)
        conn.commit()
    except Exception:
        conn.rollback()
        raise
"#;
    assert!(single_rule("partial_txn_no_rollback", source).is_empty());
}

#[test]
fn missing_http_timeout_flags_bare_get() {
    let source = r#"def f():
    return requests.get("https://x")
"#;
    let violations = single_rule("missing_http_timeout", source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::High);
    assert!(violations[0].evidence.join(" ").contains("timeout"));
}

#[test]
fn timeout_keyword_suppresses() {
    let source = r#"def f():
    return requests.get("https://x", timeout=10)
"#;
    assert!(single_rule("missing_http_timeout", source).is_empty());
}

struct PanickingRule;

impl Rule for PanickingRule {
    fn id(&self) -> &'static str {
        "panicking_rule"
    }

    fn check(&self, _module: &ModuleAst, _graph: Option<&CallGraph>) -> Vec<Violation> {
        panic!("rule blew up");
    }
}

#[test]
fn panicking_rule_becomes_low_severity_violation() {
    let mut registry = RuleRegistry::new();
    registry.register(Box::new(PanickingRule));
    let engine = RuleEngine::with_registry(registry);

    let module = parse_file(CLEAN, "clean.py");
    let result = engine.run(&[("clean.py".to_string(), module)], None);

    assert_eq!(result.violations.len(), 1);
    let violation = &result.violations[0];
    assert_eq!(violation.severity, Severity::Low);
    assert!(violation.title.contains("internal error"));
    assert!(violation.evidence.len() >= 3);
}

#[test]
fn every_violation_carries_three_evidence_strings() {
    let source = r#"shared_data = []

async def writer_a(x):
    global shared_data
    shared_data.append(x)

async def writer_b():
    global shared_data
    shared_data.clear()

def run(s):
    return eval(s)

async def f():
    time.sleep(1)
"#;
    let module = parse_file(source, "mixed.py");
    let result = RuleEngine::new().run(&[("mixed.py".to_string(), module)], None);
    assert!(!result.violations.is_empty());
    for violation in &result.violations {
        assert!(
            violation.evidence.len() >= 3,
            "rule {} produced thin evidence",
            violation.rule_id
        );
    }
}
