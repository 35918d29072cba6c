//! Artifact Synthesizer (§4.G): turns a completed `ExplorationResult` into a
//! `TestArtifact`, a page object plus an ordered test step sequence.
//!
//! The LLM is given first refusal via `LlmBackend::synthesize_artifact`; if
//! it declines or returns something malformed, a deterministic fallback is
//! built straight from the exploration trace so the pipeline always
//! terminates with a usable artifact.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::NavigationConfig;
use crate::error::{ArtifactError, ArtifactResult};
use crate::llm::LlmBackend;
use crate::navigation::build_test_generation_prompt;
use crate::types::{Action, ExplorationResult, HybridElement, Locator, PageObject, TestArtifact, TestStep};

const CONSOLE_TAIL_LEN: usize = 10;
const NETWORK_TAIL_LEN: usize = 10;

/// Builds the Test Generation Prompt from an `ExplorationResult` and asks
/// the LLM to synthesize an artifact, falling back to a deterministic one
/// derived straight from the trace when the LLM declines or times out.
pub struct ArtifactSynthesizer {
    llm: Arc<dyn LlmBackend>,
    config: NavigationConfig,
}

impl ArtifactSynthesizer {
    pub fn new(llm: Arc<dyn LlmBackend>, config: NavigationConfig) -> Self {
        Self { llm, config }
    }

    pub async fn synthesize(&self, user_story: &[String], exploration: &ExplorationResult) -> ArtifactResult<TestArtifact> {
        let console_tail = tail_strings(&exploration.final_context.console_messages, CONSOLE_TAIL_LEN, |m| {
            format!("[{}] {}", m.level, m.message)
        });
        let network_tail = tail_strings(&exploration.final_context.network_requests, NETWORK_TAIL_LEN, |n| {
            format!("{} {} => {}", n.method, n.url, n.status)
        });

        let prompt = build_test_generation_prompt(
            user_story,
            &exploration.final_context.page_info.url,
            &exploration.generated_selectors,
            &exploration.learnings,
            &console_tail,
            &network_tail,
        );

        let artifact = match tokio::time::timeout(self.config.synthesis_timeout, self.llm.synthesize_artifact(&prompt)).await {
            Ok(Some(artifact)) if is_valid(&artifact) => artifact,
            Ok(Some(_)) => {
                warn!("LLM artifact failed validation, falling back to deterministic synthesis");
                fallback_artifact(exploration)
            }
            Ok(None) => {
                warn!("LLM returned no artifact, falling back to deterministic synthesis");
                fallback_artifact(exploration)
            }
            Err(_) => {
                warn!("LLM artifact synthesis timed out, falling back to deterministic synthesis");
                fallback_artifact(exploration)
            }
        };

        if !is_valid(&artifact) {
            return Err(ArtifactError::LlmInvalidArtifact(
                "fallback artifact failed validation, this is a synthesizer bug".to_string(),
            ));
        }

        Ok(artifact)
    }
}

fn is_valid(artifact: &TestArtifact) -> bool {
    !artifact.page_object.locators.is_empty() && !artifact.test_steps.is_empty()
}

fn tail_strings<T>(items: &[T], max: usize, render: impl Fn(&T) -> String) -> Vec<String> {
    let start = items.len().saturating_sub(max);
    items[start..].iter().map(render).collect()
}

const PAGE_CLASS_NAME: &str = "ExploredPage";

/// Build the deterministic artifact directly from the trace: one locator
/// per interacted element, one test step per recorded interaction.
fn fallback_artifact(exploration: &ExplorationResult) -> TestArtifact {
    let locators = exploration
        .generated_selectors
        .iter()
        .map(locator_from_hybrid)
        .collect();

    let test_steps = exploration.steps.iter().map(test_step_from_interaction).collect();

    TestArtifact {
        page_object: PageObject {
            class_name: PAGE_CLASS_NAME.to_string(),
            locators,
        },
        test_steps,
    }
}

fn locator_from_hybrid(h: &HybridElement) -> Locator {
    Locator {
        name: locator_name(h),
        element_type: h.role.clone(),
        actions: locator_actions(&h.role),
        selectors: h.selectors.clone(),
    }
}

fn locator_name(h: &HybridElement) -> String {
    let base = if h.name.is_empty() { h.role.as_str() } else { h.name.as_str() };
    base.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if i > 0 => first.to_uppercase().collect::<String>() + chars.as_str(),
                _ => word.to_lowercase(),
            }
        })
        .collect::<String>()
}

fn locator_actions(role: &str) -> Vec<String> {
    match role {
        "textbox" | "combobox" => vec!["fill".to_string(), "click".to_string()],
        "checkbox" | "radio" => vec!["check".to_string(), "click".to_string()],
        _ => vec!["click".to_string()],
    }
}

fn test_step_from_interaction(step: &crate::types::InteractionStep) -> TestStep {
    let action = match step.action {
        Action::Navigate => "navigate".to_string(),
        Action::Click => "clickElement".to_string(),
        Action::Type => "typeElement".to_string(),
        Action::Wait => "waitElement".to_string(),
        Action::Observe => "observeElement".to_string(),
    };

    TestStep {
        page: PAGE_CLASS_NAME.to_string(),
        action,
        params: step.params.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::NullLlm;
    use crate::types::{Action, CorrelationMethod, ElementRef, InteractionStep, PageContext, PageInfo, SnapshotId, StepResult};
    use std::collections::HashMap;

    fn sample_hybrid() -> HybridElement {
        HybridElement {
            ref_id: "e1".into(),
            snapshot: SnapshotId(1),
            role: "button".into(),
            name: "Sign In".into(),
            text: "Sign In".into(),
            disabled: false,
            checked: false,
            expanded: false,
            html_attributes: HashMap::new(),
            correlation_score: 1.0,
            correlation_method: CorrelationMethod::ExactTextMatch,
            correlation_index: 0,
            selectors: Vec::new(),
        }
    }

    fn sample_exploration() -> ExplorationResult {
        ExplorationResult {
            steps: vec![
                InteractionStep {
                    user_step_text: "go to login".into(),
                    action: Action::Navigate,
                    element: None,
                    params: Vec::new(),
                    result: StepResult {
                        success: true,
                        new_url: Some("https://example.com/login".into()),
                        new_elements_count: 3,
                        error: None,
                    },
                },
                InteractionStep {
                    user_step_text: "click sign in".into(),
                    action: Action::Click,
                    element: Some(ElementRef {
                        role: "button".into(),
                        name: "Sign In".into(),
                        ref_id: "e1".into(),
                    }),
                    params: Vec::new(),
                    result: StepResult {
                        success: true,
                        new_url: Some("https://example.com/home".into()),
                        new_elements_count: 5,
                        error: None,
                    },
                },
            ],
            final_context: PageContext {
                page_info: PageInfo {
                    url: "https://example.com/home".into(),
                    title: "Home".into(),
                    timestamp: chrono::Utc::now(),
                },
                accessibility_elements: Vec::new(),
                dom_elements: Vec::new(),
                hybrid_elements: Vec::new(),
                console_messages: Vec::new(),
                network_requests: Vec::new(),
                screenshot: None,
            },
            generated_selectors: vec![sample_hybrid()],
            learnings: vec!["✅ Click on Sign In succeeded".into()],
        }
    }

    #[tokio::test]
    async fn falls_back_to_deterministic_artifact_when_llm_declines() {
        let synthesizer = ArtifactSynthesizer::new(Arc::new(NullLlm), NavigationConfig::default());
        let exploration = sample_exploration();
        let artifact = synthesizer
            .synthesize(&["go to login".to_string(), "click sign in".to_string()], &exploration)
            .await
            .unwrap();

        assert_eq!(artifact.page_object.locators.len(), 1);
        assert_eq!(artifact.page_object.locators[0].name, "signIn");
        assert_eq!(artifact.test_steps.len(), 2);
        assert_eq!(artifact.test_steps[0].action, "navigate");
        assert_eq!(artifact.test_steps[1].action, "clickElement");
    }

    #[test]
    fn locator_name_camel_cases_multi_word_names() {
        let h = HybridElement {
            name: "Remember Me".into(),
            ..sample_hybrid()
        };
        assert_eq!(locator_name(&h), "rememberMe");
    }

    #[test]
    fn tail_strings_keeps_only_last_n_entries() {
        let items = vec![1, 2, 3, 4, 5];
        let tail = tail_strings(&items, 2, |n| n.to_string());
        assert_eq!(tail, vec!["4", "5"]);
    }
}
