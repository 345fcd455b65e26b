//! # codemend-service
//!
//! Orchestration surface of the codemend engine: the scan worker, the
//! request/response contracts an HTTP front-end would speak, the audit
//! log, deterministic explanation fallbacks, the completion-response
//! validator, the subprocess test harness, and background-scan dispatch.

pub mod audit;
pub mod explain;
pub mod models;
pub mod response_validator;
pub mod scan_prompt;
pub mod service;
pub mod test_harness;
pub mod worker;
