//! Scan service tests — end-to-end scan scenarios, legacy `combined`
//! handling, size filtering, and audit records.

use codemend_core::config::EngineConfig;
use codemend_core::Severity;
use codemend_service::audit::AuditLog;
use codemend_service::models::{AuditEntry, FileInput, ScanMode, ScanRequest};
use codemend_service::service::ScanService;
use codemend_service::worker::ScanWorker;

fn config_with_audit(dir: &tempfile::TempDir) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.audit_log_path = Some(
        dir.path()
            .join("audit.jsonl")
            .to_string_lossy()
            .into_owned(),
    );
    config
}

fn request(files: Vec<FileInput>) -> ScanRequest {
    ScanRequest {
        files,
        scan_mode: ScanMode::Full,
        combined: None,
    }
}

fn file(path: &str, content: &str) -> FileInput {
    FileInput {
        path: path.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn dangerous_eval_scan_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));

    let response = service
        .submit_scan(request(vec![file(
            "app.py",
            "def run(s):\n    return eval(s)\n",
        )]))
        .await;

    assert_eq!(response.message, "scan_complete");
    let report = response.report.expect("report present");
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.rule_id, "dangerous_eval");
    assert_eq!(issue.severity, Severity::Critical);
    assert!(issue.evidence.join(" ").contains("eval"));
    assert!(report.risk_score > 0);
    assert!(report.deterministic_only);
    assert!(!report.llm_used);

    let audit = report.audit.expect("audit present");
    assert_eq!(audit.files_scanned, 1);
    assert_eq!(audit.violations_found, 1);
    assert!(audit.deterministic_only);
    assert!(!audit.llm_invoked);
}

#[tokio::test]
async fn legacy_combined_field_scans_as_unknown_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));

    let response = service
        .submit_scan(ScanRequest {
            files: Vec::new(),
            scan_mode: ScanMode::Full,
            combined: Some("x = eval(input())".to_string()),
        })
        .await;

    assert_eq!(response.message, "scan_complete");
    let report = response.report.expect("report present");
    assert!(!report.issues.is_empty());
    assert!(report.issues.iter().all(|i| i.file == "unknown"));
}

#[tokio::test]
async fn race_condition_scan_names_both_writers() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));

    let source = r#"shared_data = []

async def writer_a(x):
    global shared_data
    shared_data.append(x)

async def writer_b():
    global shared_data
    shared_data.clear()
"#;
    let response = service
        .submit_scan(request(vec![file("state.py", source)]))
        .await;

    let report = response.report.expect("report present");
    let race: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.rule_id == "race_condition")
        .collect();
    assert_eq!(race.len(), 1);
    let evidence = race[0].evidence.join(" ");
    assert!(evidence.contains("writer_a"));
    assert!(evidence.contains("writer_b"));
}

#[tokio::test]
async fn empty_request_is_error_shaped() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));

    let response = service.submit_scan(request(Vec::new())).await;
    assert_eq!(response.message, "error");
    assert!(response.report.is_none());
}

#[tokio::test]
async fn oversized_files_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_audit(&dir);
    config.scan.max_file_size_bytes = Some(64);
    let service = ScanService::new(config);

    let big = "x = 1\n".repeat(100);
    let response = service
        .submit_scan(request(vec![file("big.py", &big)]))
        .await;
    assert_eq!(response.message, "error");

    let response = service
        .submit_scan(request(vec![
            file("big.py", &big),
            file("small.py", "def run(s):\n    return eval(s)\n"),
        ]))
        .await;
    assert_eq!(response.message, "scan_complete");
    let report = response.report.expect("report present");
    assert_eq!(report.audit.as_ref().unwrap().files_scanned, 1);
}

#[tokio::test]
async fn background_dispatch_above_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_audit(&dir);
    config.scan.background_file_threshold = Some(1);
    let service = ScanService::new(config);

    let response = service
        .submit_scan(request(vec![
            file("a.py", "def a():\n    return 1\n"),
            file("b.py", "def b():\n    return 2\n"),
        ]))
        .await;

    assert_eq!(response.message, "scan_queued");
    assert!(response.scan_id.starts_with("bg-"));
    assert!(response.report.is_none());

    // Poll until the background task completes.
    let mut report = None;
    for _ in 0..50 {
        let status = service.scan_status(&response.scan_id);
        if let Some(found) = status.report {
            report = Some(found);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let report = report.expect("background scan completed");
    assert_eq!(report.audit.as_ref().unwrap().files_scanned, 2);
}

#[tokio::test]
async fn unknown_scan_id_reports_failed() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));
    let status = service.scan_status("bg-missing");
    assert_eq!(
        status.error.as_deref(),
        Some("Scan not found"),
    );
}

#[tokio::test]
async fn pr_mode_prefixes_summary() {
    let dir = tempfile::tempdir().unwrap();
    let worker = ScanWorker::new(config_with_audit(&dir));

    let response = worker
        .run_scan(
            &[file("app.py", "def run(s):\n    return eval(s)\n")],
            ScanMode::Pr,
        )
        .await;

    let report = response.report.expect("report present");
    assert!(report.summary.starts_with("PR Analysis:"));
}

#[tokio::test]
async fn clean_code_scores_zero() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScanService::new(config_with_audit(&dir));

    let response = service
        .submit_scan(request(vec![file(
            "clean.py",
            "def add(a, b):\n    return a + b\n",
        )]))
        .await;

    let report = response.report.expect("report present");
    assert!(report.issues.is_empty());
    assert_eq!(report.risk_score, 0);
}

#[tokio::test]
async fn audit_log_appends_timestamped_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_audit(&dir);
    let log = AuditLog::new(config.effective_audit_log_path());

    let entry = AuditEntry {
        scan_id: "abc12345".to_string(),
        files_scanned: 2,
        violations_found: 3,
        risk_score: 40,
        llm_invoked: false,
        llm_tokens_used: 0,
        duration_ms: 12.5,
        deterministic_only: true,
    };
    log.log(&entry);
    log.log(&entry);

    let records = log.read_recent(10);
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.get("timestamp").is_some());
        assert_eq!(record["scan_id"], "abc12345");
        assert_eq!(record["risk_score"], 40);
    }

    assert_eq!(log.read_recent(1).len(), 1);
}

#[tokio::test]
async fn scan_results_are_cached_and_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let worker = ScanWorker::new(config_with_audit(&dir));
    let files = [file("app.py", "def run(s):\n    return eval(s)\n")];

    let first = worker.run_scan(&files, ScanMode::Full).await;
    let second = worker.run_scan(&files, ScanMode::Full).await;

    let report_a = first.report.unwrap();
    let report_b = second.report.unwrap();
    assert_eq!(report_a.risk_score, report_b.risk_score);
    assert_eq!(report_a.issues.len(), report_b.issues.len());
    assert_eq!(report_a.issues[0].evidence, report_b.issues[0].evidence);
}
