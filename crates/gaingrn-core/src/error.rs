//! Structured error type shared by the gaingrn crates.

use thiserror::Error;

/// Unified error type for all indexing operations.
#[derive(Debug, Error)]
pub enum GrnError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input file (STRIDE, GESAMT, table)
    #[error("parse error: {0}")]
    Parse(String),

    /// Bad arguments or out-of-range configuration values
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Structure data contradicting its own boundaries. Excludes the structure.
    #[error("inconsistent structure data: {0}")]
    Inconsistent(String),

    /// Template definition failed validation
    #[error("template error: {0}")]
    Template(String),

    /// The external superposition produced no usable correspondence
    #[error("superposition failed: {0}")]
    Superposition(String),

    /// An external invocation exceeded its time budget
    #[error("timed out after {seconds}s: {context}")]
    Timeout { context: String, seconds: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tabular export or import failure
    #[error("table error: {0}")]
    Table(String),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl GrnError {
    pub fn parse(message: impl Into<String>) -> Self {
        GrnError::Parse(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GrnError::InvalidInput(message.into())
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        GrnError::Inconsistent(message.into())
    }

    pub fn template(message: impl Into<String>) -> Self {
        GrnError::Template(message.into())
    }

    pub fn superposition(message: impl Into<String>) -> Self {
        GrnError::Superposition(message.into())
    }

    pub fn timeout(context: impl Into<String>, seconds: u64) -> Self {
        GrnError::Timeout {
            context: context.into(),
            seconds,
        }
    }

    pub fn table(message: impl Into<String>) -> Self {
        GrnError::Table(message.into())
    }

    /// Errors that fail one subdomain pipeline but leave the structure in the batch.
    ///
    /// A superposer reports unreadable or garbled tool output as [`GrnError::Superposition`];
    /// any other error from it excludes the structure.
    pub fn is_structure_scoped(&self) -> bool {
        matches!(self, GrnError::Superposition(_) | GrnError::Timeout { .. })
    }
}

/// Convenience alias used throughout the gaingrn crates.
pub type Result<T> = std::result::Result<T, GrnError>;
