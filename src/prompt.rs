//! Grounded prompt composition.
//!
//! The prompt is laid out in a fixed order: role and domain framing, the
//! assembled context verbatim, answering instructions (including citation by
//! document name), the user's question, and an `ANSWER:` cue. Composition is
//! a pure function of its inputs.

use crate::config::PromptConfig;
use crate::models::PromptPayload;

/// Builds [`PromptPayload`]s from a context and a query.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    role: String,
    focus: Vec<String>,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

impl PromptComposer {
    pub fn new(role: impl Into<String>, focus: Vec<String>) -> Self {
        Self {
            role: role.into(),
            focus,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.role.clone(), config.focus.clone())
    }

    /// Composes the full instruction prompt.
    ///
    /// The context is embedded untouched; size limits are the caller's
    /// concern.
    pub fn compose(&self, context: &str, query: &str) -> PromptPayload {
        let mut out = String::with_capacity(context.len() + query.len() + 512);

        out.push_str(self.role.trim());
        out.push_str("\n\nCONTEXT:\n");
        out.push_str(context);
        if !context.ends_with('\n') {
            out.push('\n');
        }

        out.push_str("\nINSTRUCTIONS:\n");
        out.push_str("- Answer using ONLY the provided context\n");
        out.push_str("- Cite source documents by name: [document name]\n");
        if !self.focus.is_empty() {
            out.push_str("- Focus on: ");
            out.push_str(&self.focus.join(", "));
            out.push('\n');
        }
        out.push_str("- Be precise and professional\n");
        out.push_str("- Use bullet points for lists\n");

        out.push_str("\nQUESTION: ");
        out.push_str(query);
        out.push_str("\n\nANSWER:\n");

        PromptPayload(out)
    }
}
