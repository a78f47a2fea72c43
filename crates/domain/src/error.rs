//! Shared error taxonomy used across all nxclaw crates.
//!
//! Each variant corresponds to a row of the error taxonomy table in the
//! runtime specification (validation, auth, queue overflow, prompt/context
//! overflow, task/browser/memory/event failures).

/// Shared error type used across all nxclaw crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation: {0}")]
    Validation(String),

    #[error("authentication required: {0}")]
    AuthMissing(String),

    #[error("queue overflow: depth {depth} >= limit {limit}")]
    QueueOverflow { depth: usize, limit: usize },

    #[error("prompt timed out after {0}ms")]
    PromptTimeout(u64),

    #[error("context window overflow: {0}")]
    ContextOverflow(String),

    #[error("task launch failed: {0}")]
    TaskLaunchError(String),

    #[error("task timed out: {0}")]
    TaskTimeout(String),

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("memory index error: {0}")]
    MemoryIndexError(String),

    #[error("event flush error: {0}")]
    EventFlushError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the error text matches a known context-overflow signature
    /// from an upstream LLM client (e.g. "maximum context length").
    pub fn looks_like_context_overflow(text: &str) -> bool {
        let lower = text.to_lowercase();
        const SIGNATURES: &[&str] = &[
            "maximum context",
            "context_length_exceeded",
            "context window",
            "too many tokens",
            "prompt is too long",
        ];
        SIGNATURES.iter().any(|s| lower.contains(s))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
