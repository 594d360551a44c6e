//! Fingerprint-keyed context cache.
//!
//! Holds the assembled [`Context`] for the current corpus state and rebuilds
//! it when the corpus fingerprint changes or after [`ContextCache::invalidate`].
//!
//! # Consistency
//!
//! - A rebuild is published with a single swap after every document has been
//!   extracted and assembled. A rebuild that is dropped part-way (cancelled
//!   caller) never publishes, so readers see either the old or the new
//!   context, never a mix.
//! - Rebuilds are serialized by an async mutex. A caller that waited on an
//!   in-flight rebuild re-checks freshness and reuses its result instead of
//!   extracting the same fingerprint again.
//! - Invalidation bumps a generation counter. A context built before the
//!   bump is stale even if its fingerprint still matches.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::assemble::assemble;
use crate::config::FailedDocumentPolicy;
use crate::error::{ContextError, ExtractError};
use crate::extract::TextExtractor;
use crate::models::{Context, DocumentSource, ExtractedDocument};
use crate::traits::DocumentCorpus;

struct Cached {
    context: Arc<Context>,
    generation: u64,
}

pub struct ContextCache {
    corpus: Arc<dyn DocumentCorpus>,
    extractor: Arc<dyn TextExtractor>,
    policy: FailedDocumentPolicy,
    current: RwLock<Option<Cached>>,
    rebuild: Mutex<()>,
    generation: AtomicU64,
}

impl ContextCache {
    pub fn new(
        corpus: Arc<dyn DocumentCorpus>,
        extractor: Arc<dyn TextExtractor>,
        policy: FailedDocumentPolicy,
    ) -> Self {
        Self {
            corpus,
            extractor,
            policy,
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the context for the current corpus, rebuilding if stale.
    ///
    /// An empty corpus yields the empty sentinel context. Enumeration
    /// failures fall back to the last published context when there is one.
    pub async fn get_or_build(&self) -> Result<Arc<Context>, ContextError> {
        let mut sources = match self.corpus.list() {
            Ok(sources) => sources,
            Err(e) => {
                let detail = format!("{:#}", e);
                if let Some(previous) = self.peek().await {
                    tracing::warn!(
                        corpus = self.corpus.label(),
                        error = %detail,
                        "corpus enumeration failed, serving previous context"
                    );
                    return Ok(previous);
                }
                return Err(ContextError::Corpus(detail));
            }
        };
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        let fingerprint = corpus_fingerprint(&sources);

        if let Some(context) = self.fresh(&fingerprint).await {
            tracing::debug!(fingerprint = %short(&fingerprint), "context cache hit");
            return Ok(context);
        }

        let _guard = self.rebuild.lock().await;
        // Another caller may have rebuilt while we waited.
        if let Some(context) = self.fresh(&fingerprint).await {
            tracing::debug!(fingerprint = %short(&fingerprint), "context rebuilt by another caller");
            return Ok(context);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let context = Arc::new(self.build(sources, fingerprint).await);
        *self.current.write().await = Some(Cached {
            context: context.clone(),
            generation,
        });
        Ok(context)
    }

    /// Forces the next [`get_or_build`](Self::get_or_build) to rebuild.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "context cache invalidated");
    }

    /// The last published context, without checking freshness.
    pub async fn peek(&self) -> Option<Arc<Context>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|cached| cached.context.clone())
    }

    async fn fresh(&self, fingerprint: &str) -> Option<Arc<Context>> {
        let current = self.current.read().await;
        let cached = current.as_ref()?;
        let generation = self.generation.load(Ordering::SeqCst);
        (cached.generation == generation && cached.context.fingerprint == fingerprint)
            .then(|| cached.context.clone())
    }

    async fn build(&self, sources: Vec<DocumentSource>, fingerprint: String) -> Context {
        if sources.is_empty() {
            tracing::info!(corpus = self.corpus.label(), "corpus is empty, no grounding available");
            return Context::empty(fingerprint);
        }

        let started = Instant::now();

        // Extraction runs in parallel; joining in spawn order keeps the
        // documents in enumeration order.
        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let extractor = self.extractor.clone();
                let name = source.name.clone();
                let handle = tokio::task::spawn_blocking(move || extractor.extract(&source));
                (name, handle)
            })
            .collect();

        let mut documents = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let doc = match handle.await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(document = %name, error = %e, "extraction task failed");
                    ExtractedDocument::failed(name, ExtractError::Aborted(e.to_string()))
                }
            };
            documents.push(doc);
        }

        let text = assemble(&documents, self.policy);
        let context = Context {
            documents,
            text,
            fingerprint,
            built_at: chrono::Utc::now(),
        };

        tracing::info!(
            corpus = self.corpus.label(),
            documents = context.documents.len(),
            failed = context.failed_count(),
            chars = context.text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            fingerprint = %short(&context.fingerprint),
            "context rebuilt"
        );

        context
    }
}

/// SHA-256 over the sorted `(name, revision)` pairs of a corpus listing.
pub fn corpus_fingerprint(sources: &[DocumentSource]) -> String {
    let mut pairs: Vec<(&str, &str)> = sources
        .iter()
        .map(|s| (s.name.as_str(), s.revision.as_str()))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for (name, revision) in pairs {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(revision.as_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}

fn short(fingerprint: &str) -> &str {
    &fingerprint[..fingerprint.len().min(12)]
}
