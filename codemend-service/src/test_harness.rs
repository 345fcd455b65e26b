//! Subprocess test harness — behind a feature flag.
//!
//! Generates boundary-value cases from function signatures and runs each in
//! an isolated `python3` subprocess with a wall-clock timeout. A case that
//! exceeds the timeout is recorded as timeout-failed; the enclosing scan is
//! never aborted.

use std::process::Stdio;
use std::time::{Duration, Instant};

use codemend_analysis::parser::FunctionDef;
use codemend_core::textutil::dedent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A generated edge-case test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub function_name: String,
    pub args: serde_json::Map<String, Value>,
    pub description: String,
}

/// Result of running a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestResult {
    pub function_name: String,
    pub test_description: String,
    pub passed: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: f64,
    pub return_value: Option<String>,
}

/// Generate boundary-value cases from a function signature: None, empty
/// and oversized strings, injection payloads, numeric extremes, empty
/// containers.
pub fn generate_edge_cases(func: &FunctionDef) -> Vec<TestCase> {
    let params: Vec<&str> = func
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .filter(|name| *name != "self")
        .collect();

    if params.is_empty() {
        return vec![TestCase {
            function_name: func.name.clone(),
            args: serde_json::Map::new(),
            description: "Call with no arguments".to_string(),
        }];
    }

    let mut cases = Vec::new();
    for param in &func.parameters {
        if param.name == "self" {
            continue;
        }
        let annotation = param.annotation.as_deref().unwrap_or("").to_lowercase();

        let mut boundary_values: Vec<(Value, &str)> = vec![(Value::Null, "None input")];

        if annotation.is_empty() || matches!(annotation.as_str(), "str" | "string") {
            boundary_values.extend([
                (json!(""), "empty string"),
                (json!("a".repeat(10_000)), "very long string"),
                (json!("<script>alert(1)</script>"), "XSS payload"),
                (json!("'; DROP TABLE users; --"), "SQL injection"),
                (json!("../../../etc/passwd"), "path traversal"),
            ]);
        }
        if annotation.is_empty() || matches!(annotation.as_str(), "int" | "float" | "number") {
            boundary_values.extend([
                (json!(0), "zero"),
                (json!(-1), "negative"),
                (json!(2_u64.pow(31)), "MAX_INT overflow"),
            ]);
        }
        if annotation.is_empty() || matches!(annotation.as_str(), "list" | "array") {
            boundary_values.extend([
                (json!([]), "empty list"),
                (json!(vec![Value::Null; 100]), "list of Nones"),
            ]);
        }
        if annotation.is_empty() || matches!(annotation.as_str(), "dict" | "mapping") {
            boundary_values.push((json!({}), "empty dict"));
        }

        for (value, description) in boundary_values {
            let mut args = serde_json::Map::new();
            for name in &params {
                args.insert((*name).to_string(), Value::Null);
            }
            args.insert(param.name.clone(), value);
            cases.push(TestCase {
                function_name: func.name.clone(),
                args,
                description: format!("{}={description}", param.name),
            });
        }
    }

    cases
}

/// Run all cases sequentially, each in its own subprocess.
pub async fn run_tests(
    test_cases: &[TestCase],
    source: &str,
    timeout_secs: u64,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(test_cases.len());
    for case in test_cases {
        results.push(run_single_test(case, source, timeout_secs).await);
    }
    results
}

async fn run_single_test(case: &TestCase, source: &str, timeout_secs: u64) -> TestResult {
    let script = build_test_script(case, source);
    let start = Instant::now();

    let mut result = TestResult {
        function_name: case.function_name.clone(),
        test_description: case.description.clone(),
        ..TestResult::default()
    };

    let spawned = Command::new("python3")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            result.error_type = Some("ProcessError".to_string());
            result.error_message = Some(e.to_string());
            return result;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(script.as_bytes()).await;
    }

    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await;
    result.duration_ms = round2(start.elapsed().as_secs_f64() * 1000.0);

    let output = match output {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            result.error_type = Some("ProcessError".to_string());
            result.error_message = Some(e.to_string());
            return result;
        }
        Err(_) => {
            result.error_type = Some("TimeoutError".to_string());
            result.error_message = Some(format!(
                "Test exceeded {timeout_secs}s timeout — possible infinite loop"
            ));
            return result;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !output.status.success() || stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        result.error_type = Some("ProcessError".to_string());
        result.error_message = Some(if stderr.is_empty() {
            "No output".to_string()
        } else {
            stderr.chars().take(500).collect()
        });
        return result;
    }

    let Ok(parsed) = serde_json::from_str::<Value>(stdout) else {
        result.error_type = Some("OutputParseError".to_string());
        result.error_message = Some(stdout.chars().take(500).collect());
        return result;
    };

    result.passed = parsed
        .get("passed")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    result.error_type = parsed
        .get("error_type")
        .and_then(Value::as_str)
        .map(str::to_string);
    result.error_message = parsed
        .get("error_message")
        .and_then(Value::as_str)
        .map(str::to_string);
    result.return_value = parsed
        .get("return_value")
        .and_then(Value::as_str)
        .map(str::to_string);
    result
}

fn build_test_script(case: &TestCase, source: &str) -> String {
    let args_json = serde_json::to_string(&Value::Object(case.args.clone())).unwrap_or_default();
    let body = dedent(source);
    format!(
        r#"import json
import sys
import traceback

{body}

try:
    args = json.loads('''{args_json}''')
    result = {function}(**args)
    print(json.dumps({{"passed": True, "return_value": repr(result)}}))
except Exception as e:
    print(json.dumps({{
        "passed": False,
        "error_type": type(e).__name__,
        "error_message": str(e),
    }}))
"#,
        function = case.function_name,
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
