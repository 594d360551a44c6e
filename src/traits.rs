//! Extension trait for document corpora.
//!
//! A corpus enumerates the documents available for grounding. Built-in
//! implementations are [`FilesystemCorpus`](crate::connector_fs::FilesystemCorpus)
//! and [`MemoryCorpus`](crate::connector_memory::MemoryCorpus); embedders can
//! implement [`DocumentCorpus`] for any other enumerable store.
//!
//! # Usage
//!
//! ```rust
//! use report_analyst::connector_memory::MemoryCorpus;
//! use report_analyst::traits::DocumentCorpus;
//!
//! let corpus = MemoryCorpus::new()
//!     .with_document("A.txt", "Revenue grew 5%")
//!     .with_document("B.txt", "Orange holds 23% share");
//! let names: Vec<String> = corpus.list().unwrap().into_iter().map(|s| s.name).collect();
//! assert_eq!(names, vec!["A.txt", "B.txt"]);
//! ```

use anyhow::Result;

use crate::models::DocumentSource;

/// An enumerable set of source documents.
///
/// # Contract
///
/// - [`list`](DocumentCorpus::list) returns metadata only; it must not read
///   document contents.
/// - Names are unique and the returned order is reproducible (sorted by
///   name) so two listings of an unchanged corpus are identical.
/// - Each source carries a `revision` that changes whenever its content may
///   have changed; the context cache keys on it.
pub trait DocumentCorpus: Send + Sync {
    /// Short label for logs and `status` output (e.g. `"filesystem"`).
    fn label(&self) -> &str;

    /// Enumerate the sources currently in the corpus.
    fn list(&self) -> Result<Vec<DocumentSource>>;
}
