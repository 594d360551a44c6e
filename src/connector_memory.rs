//! In-memory corpus.
//!
//! Useful for embedding the pipeline with documents that do not live on disk,
//! and for tests. The format comes from the name unless declared with
//! [`MemoryCorpus::with_document_as`]; the revision is a SHA-256 of the
//! format tag and the bytes.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::models::{DocumentFormat, DocumentSource, SourceHandle};
use crate::traits::DocumentCorpus;

struct MemoryDocument {
    format: DocumentFormat,
    bytes: Arc<[u8]>,
}

#[derive(Default)]
pub struct MemoryCorpus {
    documents: RwLock<BTreeMap<String, MemoryDocument>>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document whose format is taken from the name's extension.
    pub fn with_document(self, name: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Adds a document with an explicit format, whatever its name.
    pub fn with_document_as(
        self,
        name: impl Into<String>,
        bytes: impl AsRef<[u8]>,
        format: DocumentFormat,
    ) -> Self {
        self.insert_as(name, bytes, format);
        self
    }

    /// Add or replace a document.
    pub fn insert(&self, name: impl Into<String>, bytes: impl AsRef<[u8]>) {
        let name = name.into();
        let format = DocumentFormat::from_name(&name);
        self.insert_as(name, bytes, format);
    }

    pub fn insert_as(
        &self,
        name: impl Into<String>,
        bytes: impl AsRef<[u8]>,
        format: DocumentFormat,
    ) {
        let mut docs = self.documents.write().unwrap_or_else(|e| e.into_inner());
        docs.insert(
            name.into(),
            MemoryDocument {
                format,
                bytes: Arc::from(bytes.as_ref()),
            },
        );
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut docs = self.documents.write().unwrap_or_else(|e| e.into_inner());
        docs.remove(name).is_some()
    }
}

impl DocumentCorpus for MemoryCorpus {
    fn label(&self) -> &str {
        "memory"
    }

    fn list(&self) -> Result<Vec<DocumentSource>> {
        let docs = self.documents.read().unwrap_or_else(|e| e.into_inner());
        // BTreeMap iteration is already sorted by name.
        Ok(docs
            .iter()
            .map(|(name, doc)| DocumentSource {
                name: name.clone(),
                format: doc.format.clone(),
                revision: revision(&doc.format, &doc.bytes),
                size: doc.bytes.len() as u64,
                handle: SourceHandle::Memory(doc.bytes.clone()),
            })
            .collect())
    }
}

/// Content hash; the format is folded in so re-tagging a document is a change.
fn revision(format: &DocumentFormat, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
