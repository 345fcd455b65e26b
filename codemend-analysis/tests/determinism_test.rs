//! Determinism — identical inputs produce byte-identical serialized
//! analysis output (timing fields excluded by construction).

use codemend_analysis::call_graph::build_call_graph;
use codemend_analysis::engine::RuleEngine;
use codemend_analysis::parser::{parse_file, ModuleAst};
use codemend_analysis::scorer::compute_risk_score;
use codemend_core::FxHashSet;

const SOURCE_A: &str = r#"shared_data = []

async def writer_a(x):
    global shared_data
    shared_data.append(x)

async def writer_b():
    global shared_data
    shared_data.clear()

def run(s):
    return eval(s)
"#;

const SOURCE_B: &str = r#"from a import run

def caller(payload):
    run(payload)
    return requests.get("https://example.com")
"#;

fn analyze() -> (String, String) {
    let modules: Vec<(String, ModuleAst)> = vec![
        ("a.py".to_string(), parse_file(SOURCE_A, "a.py")),
        ("b.py".to_string(), parse_file(SOURCE_B, "b.py")),
    ];
    let graph = build_call_graph(&modules);
    let result = RuleEngine::new().run(&modules, Some(&graph));
    let risk = compute_risk_score(&result, Some(&graph), &FxHashSet::default());

    let violations_json = serde_json::to_string(&result.violations).expect("serializable");
    let risk_json = serde_json::to_string(&risk).expect("serializable");
    (violations_json, risk_json)
}

#[test]
fn repeated_scans_serialize_identically() {
    let (violations_first, risk_first) = analyze();
    for _ in 0..3 {
        let (violations, risk) = analyze();
        assert_eq!(violations, violations_first);
        assert_eq!(risk, risk_first);
    }
}

#[test]
fn graph_snapshot_is_deterministic() {
    let modules: Vec<(String, ModuleAst)> = vec![
        ("a.py".to_string(), parse_file(SOURCE_A, "a.py")),
        ("b.py".to_string(), parse_file(SOURCE_B, "b.py")),
    ];
    let first = serde_json::to_string(&build_call_graph(&modules).snapshot()).unwrap();
    let second = serde_json::to_string(&build_call_graph(&modules).snapshot()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn violation_order_follows_registry_then_module_order() {
    let modules: Vec<(String, ModuleAst)> = vec![
        ("a.py".to_string(), parse_file(SOURCE_A, "a.py")),
        ("b.py".to_string(), parse_file(SOURCE_B, "b.py")),
    ];
    let result = RuleEngine::new().run(&modules, None);

    // race_condition registers before dangerous_eval, which registers
    // before missing_http_timeout.
    let order: Vec<&str> = result
        .violations
        .iter()
        .map(|v| v.rule_id.as_str())
        .collect();
    let race_pos = order.iter().position(|id| *id == "race_condition");
    let eval_pos = order.iter().position(|id| *id == "dangerous_eval");
    let timeout_pos = order.iter().position(|id| *id == "missing_http_timeout");
    assert!(race_pos.is_some() && eval_pos.is_some() && timeout_pos.is_some());
    assert!(race_pos < eval_pos);
    assert!(eval_pos < timeout_pos);
}
