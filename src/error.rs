//! Error taxonomy for the answer pipeline.
//!
//! Only the extractor and the context cache produce structured errors; both
//! degrade gracefully. [`AnswerError`] never escapes the answer service; it
//! rides along on an [`AnswerResult`](crate::models::AnswerResult) as a
//! diagnostic.

use serde::Serialize;
use thiserror::Error;

/// Failure to read or parse one source document.
///
/// Recorded on the [`ExtractedDocument`](crate::models::ExtractedDocument);
/// the rest of the corpus keeps extracting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("failed to read source: {0}")]
    Io(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document is {size} bytes, exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("extraction aborted: {0}")]
    Aborted(String),
}

/// Failure reported by a generative-model adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model not configured: {0}")]
    Unavailable(String),

    #[error("model request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("rate limited by model provider: {0}")]
    RateLimited(String),

    #[error("model API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("prompt is {chars} chars, exceeds model input limit of {limit}")]
    ContextTooLarge { chars: usize, limit: usize },
}

impl ModelError {
    /// Whether a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::RateLimited(_) | ModelError::Network(_) => true,
            ModelError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Failure to produce a [`Context`](crate::models::Context).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("cannot enumerate document corpus: {0}")]
    Corpus(String),
}

/// Why an answer did not come from the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("model adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("model adapter failed: {0}")]
    AdapterFailure(#[from] ModelError),

    #[error("context unavailable: {0}")]
    ContextUnavailable(#[from] ContextError),

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl AnswerError {
    /// Machine-readable kind, used in JSON diagnostics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerError::AdapterUnavailable(_) => "adapter_unavailable",
            AnswerError::AdapterFailure(ModelError::Timeout { .. }) => "timeout",
            AnswerError::AdapterFailure(ModelError::ContextTooLarge { .. }) => "context_too_large",
            AnswerError::AdapterFailure(_) => "adapter_failure",
            AnswerError::ContextUnavailable(_) => "context_unavailable",
            AnswerError::EmptyResponse => "empty_response",
        }
    }
}

/// Serializable form of an [`AnswerError`], attached to answer results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: String,
    pub detail: String,
}

impl From<&AnswerError> for Diagnostic {
    fn from(err: &AnswerError) -> Self {
        Self {
            kind: err.kind().to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(ModelError::RateLimited("quota".into()).is_transient());
        assert!(ModelError::Network("reset".into()).is_transient());
        assert!(ModelError::Api {
            status: 503,
            message: "busy".into()
        }
        .is_transient());
        assert!(!ModelError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_transient());
        assert!(!ModelError::Timeout { millis: 5_000 }.is_transient());
    }

    #[test]
    fn answer_error_kinds() {
        let timeout = AnswerError::from(ModelError::Timeout { millis: 3_000 });
        assert_eq!(timeout.kind(), "timeout");

        let too_large = AnswerError::from(ModelError::ContextTooLarge {
            chars: 10,
            limit: 5,
        });
        assert_eq!(too_large.kind(), "context_too_large");

        let ctx = AnswerError::from(ContextError::Corpus("gone".into()));
        assert_eq!(ctx.kind(), "context_unavailable");

        let diag = Diagnostic::from(&timeout);
        assert_eq!(diag.kind, "timeout");
        assert!(diag.detail.contains("timed out after 3000ms"));
    }
}
