//! Core data models used throughout the answer pipeline.
//!
//! These types represent the source documents, their extracted text, the
//! assembled context, and the answers handed back to the presentation layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AnswerError, Diagnostic, ExtractError};

/// Document format, derived from the file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Text,
    Other(String),
}

impl DocumentFormat {
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            "pptx" => DocumentFormat::Pptx,
            "xlsx" => DocumentFormat::Xlsx,
            "txt" | "md" | "markdown" | "csv" => DocumentFormat::Text,
            other => DocumentFormat::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Text => "text",
            DocumentFormat::Other(ext) => ext,
        }
    }
}

/// Where the bytes of a source live.
#[derive(Debug, Clone)]
pub enum SourceHandle {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// A document discovered in the corpus. Immutable once discovered.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Identifier unique within the corpus (relative path for files).
    pub name: String,
    pub handle: SourceHandle,
    pub format: DocumentFormat,
    /// Modification marker: `<size>:<mtime>` for files, content hash for memory.
    pub revision: String,
    pub size: u64,
}

/// Text extracted from one [`DocumentSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source_name: String,
    pub text: String,
    pub extraction_error: Option<ExtractError>,
}

impl ExtractedDocument {
    pub fn ok(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            text: text.into(),
            extraction_error: None,
        }
    }

    pub fn failed(source_name: impl Into<String>, error: ExtractError) -> Self {
        Self {
            source_name: source_name.into(),
            text: String::new(),
            extraction_error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.extraction_error.is_some()
    }
}

/// The assembled, cached grounding context for one corpus state.
#[derive(Debug, Clone)]
pub struct Context {
    /// Documents in enumeration order.
    pub documents: Vec<ExtractedDocument>,
    /// Assembled, provenance-labeled text.
    pub text: String,
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
}

impl Context {
    /// The "no grounding available" sentinel for an empty corpus.
    pub fn empty(fingerprint: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            text: String::new(),
            fingerprint: fingerprint.into(),
            built_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// True when at least one document yielded non-blank text.
    pub fn has_grounding(&self) -> bool {
        self.documents.iter().any(|d| !d.text.trim().is_empty())
    }

    pub fn failed_count(&self) -> usize {
        self.documents.iter().filter(|d| d.is_failed()).count()
    }

    pub fn status(&self) -> ContextStatus {
        ContextStatus {
            has_context: self.has_grounding(),
            documents: self.documents.len(),
            failed_documents: self.failed_count(),
            fingerprint: Some(self.fingerprint.clone()),
            built_at: Some(self.built_at),
        }
    }

    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents
            .iter()
            .map(|d| DocumentSummary {
                name: d.source_name.clone(),
                chars: d.text.chars().count(),
                error: d.extraction_error.as_ref().map(|e| e.to_string()),
            })
            .collect()
    }
}

/// UI-facing indicator of whether grounding is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextStatus {
    pub has_context: bool,
    pub documents: usize,
    pub failed_documents: usize,
    pub fingerprint: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}

impl ContextStatus {
    /// Status reported when no context could be built at all.
    pub fn unavailable() -> Self {
        Self {
            has_context: false,
            documents: 0,
            failed_documents: 0,
            fingerprint: None,
            built_at: None,
        }
    }
}

/// One line of the `/documents` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    pub chars: usize,
    pub error: Option<String>,
}

/// Speaker of a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a conversation. Conversations belong to the presentation
/// layer; the answer service is stateless per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The fully composed instruction sent to the model. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload(pub String);

impl PromptPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where the text of an [`AnswerResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    ModelGenerated,
    Fallback,
    Error,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::ModelGenerated => "model_generated",
            AnswerSource::Fallback => "fallback",
            AnswerSource::Error => "error",
        }
    }
}

/// What the presentation layer receives for every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub text: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Diagnostic>,
}

impl AnswerResult {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: AnswerSource::ModelGenerated,
            error: None,
        }
    }

    pub fn fallback(text: impl Into<String>, cause: Option<&AnswerError>) -> Self {
        Self {
            text: text.into(),
            source: AnswerSource::Fallback,
            error: cause.map(Diagnostic::from),
        }
    }

    pub fn error(text: impl Into<String>, cause: &AnswerError) -> Self {
        Self {
            text: text.into(),
            source: AnswerSource::Error,
            error: Some(Diagnostic::from(cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_name("reports/2024.PDF"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_name("a.docx"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_name("notes.md"), DocumentFormat::Text);
        assert_eq!(
            DocumentFormat::from_name("image.png"),
            DocumentFormat::Other("png".to_string())
        );
        assert_eq!(
            DocumentFormat::from_name("Makefile"),
            DocumentFormat::Other(String::new())
        );
    }

    #[test]
    fn grounding_requires_non_blank_text() {
        let mut ctx = Context::empty("fp");
        assert!(ctx.is_empty());
        assert!(!ctx.has_grounding());

        ctx.documents.push(ExtractedDocument::failed(
            "bad.pdf",
            ExtractError::Pdf("truncated".into()),
        ));
        ctx.documents.push(ExtractedDocument::ok("blank.txt", "  \n"));
        assert!(!ctx.is_empty());
        assert!(!ctx.has_grounding());

        ctx.documents.push(ExtractedDocument::ok("good.txt", "Revenue grew"));
        let status = ctx.status();
        assert!(status.has_context);
        assert_eq!(status.documents, 3);
        assert_eq!(status.failed_documents, 1);
    }

    #[test]
    fn answer_result_serializes_source_tag() {
        let json = serde_json::to_value(AnswerResult::generated("hi")).unwrap();
        assert_eq!(json["source"], "model_generated");
        assert!(json.get("error").is_none());

        let cause = AnswerError::EmptyResponse;
        let json = serde_json::to_value(AnswerResult::fallback("fb", Some(&cause))).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["error"]["kind"], "empty_response");
    }
}
