//! Answer orchestration.
//!
//! [`AnswerService::answer`] never fails. Each call walks a short state
//! machine: check the model adapter, look up the cached context, compose the
//! prompt, invoke the model under a deadline, and fall back to a fixed
//! market overview whenever grounding or generation is unavailable. Failure
//! detail travels on the [`AnswerResult`] as a diagnostic, never as an error.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::ContextCache;
use crate::config::Config;
use crate::connector_fs::FilesystemCorpus;
use crate::error::{AnswerError, ContextError, ModelError};
use crate::extract::FormatExtractor;
use crate::model::{create_model, GenerativeModel};
use crate::models::{AnswerResult, ContextStatus, DocumentSummary, PromptPayload};
use crate::prompt::PromptComposer;

/// Fixed answer served when no grounded, generated answer is available.
pub const FALLBACK_ANSWER: &str = "\
**Telecom Market Overview** (Based on typical INTT data):
- **Total Market Revenue (2024)**: ~3,989 M.TND
- **Major Operators**: Orange (23%), Ooredoo (38%), Tunisie Telecom (32%)
- **Key Services**: Mobile Data, Fixed Telephony, Broadband
- **Market Trends**: Data service growth (+22.7%), Voice service decline (-3.2%)

*For precise, cited data, please ensure PDF documents are in the 'pdf' folder.*";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

enum ModelSlot {
    Ready(Arc<dyn GenerativeModel>),
    Unavailable(String),
}

/// Answers questions from the cached document context.
pub struct AnswerService {
    cache: Arc<ContextCache>,
    model: ModelSlot,
    composer: PromptComposer,
    timeout: Duration,
    context_limit_chars: Option<usize>,
}

impl AnswerService {
    /// `model` is usually the output of [`create_model`]; an error puts the
    /// service in its no-model state, where every answer is the fallback.
    pub fn new(
        cache: Arc<ContextCache>,
        model: Result<Arc<dyn GenerativeModel>, ModelError>,
        composer: PromptComposer,
    ) -> Self {
        let model = match model {
            Ok(model) => ModelSlot::Ready(model),
            Err(ModelError::Unavailable(reason)) => ModelSlot::Unavailable(reason),
            Err(e) => ModelSlot::Unavailable(e.to_string()),
        };
        Self {
            cache,
            model,
            composer,
            timeout: DEFAULT_TIMEOUT,
            context_limit_chars: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_context_limit(mut self, limit: Option<usize>) -> Self {
        self.context_limit_chars = limit;
        self
    }

    /// Wires the filesystem corpus, extractor, cache and model adapter
    /// described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let corpus = Arc::new(FilesystemCorpus::new(&config.documents)?);
        let extractor = Arc::new(FormatExtractor::new(config.documents.max_extract_bytes));
        let cache = Arc::new(ContextCache::new(
            corpus,
            extractor,
            config.context.failed_documents,
        ));

        let model = create_model(&config.model);
        match &model {
            Ok(model) => tracing::info!(
                provider = %config.model.provider,
                model = model.name(),
                "model adapter ready"
            ),
            Err(e) => tracing::warn!(error = %e, "no model adapter, answers will use the fallback"),
        }

        Ok(Self::new(cache, model, PromptComposer::from_config(&config.prompt))
            .with_timeout(Duration::from_secs(config.model.timeout_secs))
            .with_context_limit(config.model.context_limit_chars))
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn model_name(&self) -> Option<&str> {
        match &self.model {
            ModelSlot::Ready(model) => Some(model.name()),
            ModelSlot::Unavailable(_) => None,
        }
    }

    /// Answers `query`. Always returns user-facing text.
    pub async fn answer(&self, query: &str) -> AnswerResult {
        let started = Instant::now();
        let result = self.run(query).await;
        tracing::info!(
            source = result.source.as_str(),
            error = result.error.as_ref().map(|d| d.kind.as_str()).unwrap_or("none"),
            query_chars = query.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered query"
        );
        result
    }

    async fn run(&self, query: &str) -> AnswerResult {
        let model = match &self.model {
            ModelSlot::Ready(model) => model.clone(),
            ModelSlot::Unavailable(reason) => {
                let cause = AnswerError::AdapterUnavailable(reason.clone());
                return AnswerResult::fallback(FALLBACK_ANSWER, Some(&cause));
            }
        };

        let context = match self.cache.get_or_build().await {
            Ok(context) => context,
            Err(e) => {
                let cause = AnswerError::from(e);
                tracing::warn!(error = %cause, "context lookup failed");
                return AnswerResult::error(FALLBACK_ANSWER, &cause);
            }
        };
        if !context.has_grounding() {
            tracing::debug!(documents = context.documents.len(), "no grounding available");
            return AnswerResult::fallback(FALLBACK_ANSWER, None);
        }

        let prompt = self.composer.compose(&context.text, query);
        drop(context);

        match self.invoke(model.as_ref(), &prompt).await {
            Ok(text) if !text.trim().is_empty() => AnswerResult::generated(text),
            Ok(_) => AnswerResult::fallback(FALLBACK_ANSWER, Some(&AnswerError::EmptyResponse)),
            Err(e) => {
                tracing::warn!(model = model.name(), error = %e, "model invocation failed");
                AnswerResult::fallback(FALLBACK_ANSWER, Some(&AnswerError::from(e)))
            }
        }
    }

    async fn invoke(
        &self,
        model: &dyn GenerativeModel,
        prompt: &PromptPayload,
    ) -> Result<String, ModelError> {
        if let Some(limit) = self.context_limit_chars {
            let chars = prompt.len();
            if chars > limit {
                return Err(ModelError::ContextTooLarge { chars, limit });
            }
        }

        match tokio::time::timeout(self.timeout, model.generate(prompt.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Drops the cached context; the next call re-extracts every document.
    pub fn reload(&self) {
        self.cache.invalidate();
    }

    /// Whether grounding is available. Builds the context if needed.
    pub async fn status(&self) -> ContextStatus {
        match self.cache.get_or_build().await {
            Ok(context) => context.status(),
            Err(e) => {
                tracing::warn!(error = %e, "context unavailable for status");
                ContextStatus::unavailable()
            }
        }
    }

    /// Per-document extraction summary for the current context.
    pub async fn documents(&self) -> Result<Vec<DocumentSummary>, ContextError> {
        Ok(self.cache.get_or_build().await?.summaries())
    }
}
