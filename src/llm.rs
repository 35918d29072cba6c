//! The LLM backend boundary: two async methods, each returning `None` on
//! failure so callers can handle a null decision/artifact deterministically.
//!
//! Modeled as a trait rather than a concrete struct, following the
//! trait-bounded backend pattern used for agentic tool loops elsewhere in
//! the ecosystem, callers bring their own model integration; this crate
//! only needs the two-method contract.

use async_trait::async_trait;

use crate::types::{Action, ElementRef, TestArtifact};

/// The LLM's decision for one Navigation Loop step.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Decision {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    pub reasoning: String,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Decide the next action for `prompt` (a rendered Navigation Decision
    /// Prompt). Returns `None` on failure (malformed output, timeout,
    /// provider error) rather than propagating an error, `LLM_NULL_DECISION`
    /// is recoverable, and the caller defaults to `observe`.
    async fn decide_next_action(&self, prompt: &str) -> Option<Decision>;

    /// Synthesize the final test artifact from `prompt` (a rendered Test
    /// Generation Prompt). Returns `None` on failure; the caller falls back
    /// to the deterministic artifact construction.
    async fn synthesize_artifact(&self, prompt: &str) -> Option<TestArtifact>;
}

/// A deterministic test double that always returns `None`, exercising the
/// fallback paths of the Navigation Loop and Artifact Synthesizer without a
/// live model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLlm;

#[async_trait]
impl LlmBackend for NullLlm {
    async fn decide_next_action(&self, _prompt: &str) -> Option<Decision> {
        None
    }

    async fn synthesize_artifact(&self, _prompt: &str) -> Option<TestArtifact> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_llm_always_returns_none() {
        let llm = NullLlm;
        assert!(llm.decide_next_action("anything").await.is_none());
        assert!(llm.synthesize_artifact("anything").await.is_none());
    }
}
