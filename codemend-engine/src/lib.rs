//! # codemend-engine
//!
//! Repair side of the codemend engine: patch sources (deterministic
//! templates and the completion-service client), the structural validator,
//! the patch applier, the rescanner, the rollback store, and the pipeline
//! orchestrator that sequences detect → generate → validate → apply →
//! rescan → rollback.

pub mod applier;
pub mod completion;
pub mod patch_source;
pub mod pipeline;
pub mod rescan;
pub mod rollback;
pub mod templates;
pub mod validator;
