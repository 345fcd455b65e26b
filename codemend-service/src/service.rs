//! Scan and patch dispatch — the functions an HTTP surface would call.
//!
//! Small requests run inline; requests above the background file threshold
//! are queued to a tokio task and polled by scan id. The status store is
//! the only state shared across scans.

use std::sync::Arc;

use codemend_core::config::EngineConfig;
use codemend_engine::completion::CompletionClient;
use codemend_engine::pipeline::{PatchPipeline, PatchResponse};
use dashmap::DashMap;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::models::{
    FileInput, PatchRequest, ScanRequest, ScanResponse, ScanStatus, ScanStatusResponse,
};
use crate::worker::ScanWorker;

struct BackgroundScan {
    status: ScanStatus,
    response: Option<ScanResponse>,
}

/// Front door for scan and patch requests.
pub struct ScanService {
    worker: Arc<ScanWorker>,
    audit: AuditLog,
    config: EngineConfig,
    background: Arc<DashMap<String, BackgroundScan>>,
}

impl ScanService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            worker: Arc::new(ScanWorker::new(config.clone())),
            audit: AuditLog::new(config.effective_audit_log_path()),
            background: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Handle a scan request.
    ///
    /// Accepts the legacy `combined` field as a single file named
    /// `"unknown"`. Oversized files are silently dropped; a request left
    /// with no files returns an error-shaped response. Requests above the
    /// background threshold return `scan_queued` plus a poll id.
    pub async fn submit_scan(&self, request: ScanRequest) -> ScanResponse {
        let mut files = request.files;
        if files.is_empty() {
            if let Some(combined) = request.combined {
                files.push(FileInput {
                    path: "unknown".to_string(),
                    content: combined,
                });
            }
        }
        if files.is_empty() {
            return ScanResponse::error();
        }

        let max_bytes = self.config.scan.effective_max_file_size_bytes();
        files.retain(|f| f.content.len() <= max_bytes);
        if files.is_empty() {
            return ScanResponse::error();
        }

        if files.len() > self.config.scan.effective_background_file_threshold() {
            return self.queue_background_scan(files, request.scan_mode);
        }

        let response = self.worker.run_scan(&files, request.scan_mode).await;
        self.log_audit(&response);
        response
    }

    fn queue_background_scan(
        &self,
        files: Vec<FileInput>,
        scan_mode: crate::models::ScanMode,
    ) -> ScanResponse {
        let scan_id = format!("bg-{}", &Uuid::new_v4().to_string()[..8]);
        self.background.insert(
            scan_id.clone(),
            BackgroundScan {
                status: ScanStatus::Running,
                response: None,
            },
        );

        let worker = Arc::clone(&self.worker);
        let background = Arc::clone(&self.background);
        let audit_path = self.config.effective_audit_log_path().to_string();
        let task_scan_id = scan_id.clone();
        tokio::spawn(async move {
            let mut response = worker.run_scan(&files, scan_mode).await;
            response.scan_id = task_scan_id.clone();
            if let Some(report) = &response.report {
                if let Some(audit) = &report.audit {
                    AuditLog::new(&audit_path).log(audit);
                }
            }
            background.insert(
                task_scan_id,
                BackgroundScan {
                    status: ScanStatus::Complete,
                    response: Some(response),
                },
            );
        });

        ScanResponse {
            message: "scan_queued".to_string(),
            scan_id,
            report: None,
        }
    }

    /// Poll the status of a background scan.
    pub fn scan_status(&self, scan_id: &str) -> ScanStatusResponse {
        match self.background.get(scan_id) {
            Some(entry) => ScanStatusResponse {
                scan_id: scan_id.to_string(),
                status: entry.status,
                progress: if entry.status == ScanStatus::Complete {
                    1.0
                } else {
                    0.5
                },
                report: entry
                    .response
                    .as_ref()
                    .and_then(|r| r.report.clone()),
                error: None,
            },
            None => ScanStatusResponse {
                scan_id: scan_id.to_string(),
                status: ScanStatus::Failed,
                progress: 0.0,
                report: None,
                error: Some("Scan not found".to_string()),
            },
        }
    }

    /// Handle a patch request: detect, then repair through the pipeline.
    pub async fn submit_patch(&self, request: PatchRequest) -> PatchResponse {
        let max_bytes = self.config.scan.effective_max_file_size_bytes();
        let files: Vec<_> = request
            .files
            .into_iter()
            .filter(|f| f.content.len() <= max_bytes)
            .collect();
        if files.is_empty() {
            return PatchResponse::error("error: no files within size limit");
        }

        let completion = CompletionClient::from_config(&self.config.completion);
        let mut pipeline = PatchPipeline::new(completion, &self.config);
        if let Some(max_retries) = request.max_retries {
            pipeline.set_max_retries(max_retries);
        }

        pipeline
            .run(
                &files,
                request.target_rule_ids.as_deref(),
                request.use_fallback,
            )
            .await
    }

    fn log_audit(&self, response: &ScanResponse) {
        if let Some(report) = &response.report {
            if let Some(audit) = &report.audit {
                self.audit.log(audit);
            }
        }
    }
}
