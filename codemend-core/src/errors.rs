//! Error types for the engine boundaries.
//!
//! Parse failures and rule failures are data, not errors: they surface as
//! `parse_errors` entries and low-severity violations. The enums here cover
//! the places where an operation genuinely cannot produce a result.

/// Trait for stable, machine-readable error codes at response boundaries.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// Errors raised while turning source text into a module AST.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported file extension: {extension}")]
    UnsupportedExtension { extension: String },

    #[error("grammar initialization failed: {message}")]
    Grammar { message: String },
}

impl ErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension { .. } => "PARSE_UNSUPPORTED_EXTENSION",
            Self::Grammar { .. } => "PARSE_GRAMMAR_ERROR",
        }
    }
}

/// Errors from the external completion service client.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {message}")]
    Request { message: String },

    #[error("completion timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("completion reply was not valid JSON")]
    MalformedReply,

    #[error("token budget exhausted: {used} used of {budget}")]
    TokenBudgetExhausted { used: u64, budget: u64 },

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ErrorCode for CompletionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request { .. } => "COMPLETION_REQUEST_FAILED",
            Self::Timeout { .. } => "COMPLETION_TIMEOUT",
            Self::MalformedReply => "COMPLETION_MALFORMED_REPLY",
            Self::TokenBudgetExhausted { .. } => "COMPLETION_TOKEN_BUDGET",
            Self::RetriesExhausted { .. } => "COMPLETION_RETRIES_EXHAUSTED",
        }
    }
}

/// Errors from the patch pipeline orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("empty file list")]
    EmptyInput,

    #[error("all files exceeded the size limit")]
    AllFilesDropped,

    #[error("completion service unavailable: {0}")]
    Completion(#[from] CompletionError),
}

impl ErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "PIPELINE_EMPTY_INPUT",
            Self::AllFilesDropped => "PIPELINE_ALL_FILES_DROPPED",
            Self::Completion(e) => e.error_code(),
        }
    }
}
