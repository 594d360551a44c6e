//! Context assembly.
//!
//! Concatenates extracted documents into one provenance-labeled string:
//!
//! ```text
//! DOCUMENT: A.pdf
//! <text of A>
//!
//! DOCUMENT: B.pdf
//! <text of B>
//! ```
//!
//! Blocks keep the order they are given in (the corpus enumeration order), so
//! an unchanged corpus always assembles to byte-identical text.

use crate::config::FailedDocumentPolicy;
use crate::models::ExtractedDocument;

/// Header line that labels each document block.
pub const DOCUMENT_HEADER: &str = "DOCUMENT: ";

/// Assembles documents into a single context string.
///
/// Failed documents are kept as empty-text blocks under
/// [`FailedDocumentPolicy::Include`] and dropped under
/// [`FailedDocumentPolicy::Omit`].
pub fn assemble(documents: &[ExtractedDocument], policy: FailedDocumentPolicy) -> String {
    documents
        .iter()
        .filter(|d| policy == FailedDocumentPolicy::Include || !d.is_failed())
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(doc: &ExtractedDocument) -> String {
    format!("{}{}\n{}\n", DOCUMENT_HEADER, doc.source_name, doc.text)
}
