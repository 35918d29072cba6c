//! Shared state owned by the Navigator's background processor task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::NavigationConfig;
use crate::context::ContextAcquirer;
use crate::error::{AgentError, SupervisorError};
use crate::llm::{Decision, LlmBackend};
use crate::types::{Action, ElementRef, HybridElement, InteractionStep, StepResult};

use super::prompts::build_navigation_decision_prompt;

struct ActionOutcome {
    success: bool,
    error: Option<String>,
}

pub struct NavigatorInner {
    pub acquirer: ContextAcquirer,
    llm: Arc<dyn LlmBackend>,
    base_url: String,
    test_path: String,
    config: NavigationConfig,
    history: Mutex<Vec<String>>,
    interacted_elements: Mutex<Vec<HybridElement>>,
}

impl NavigatorInner {
    pub fn new(acquirer: ContextAcquirer, llm: Arc<dyn LlmBackend>, base_url: String, test_path: String, config: NavigationConfig) -> Self {
        Self {
            acquirer,
            llm,
            base_url,
            test_path,
            config,
            history: Mutex::new(Vec::new()),
            interacted_elements: Mutex::new(Vec::new()),
        }
    }

    pub async fn process_step(&self, index: usize, user_step_text: &str) -> Result<InteractionStep, AgentError> {
        if index == 0 {
            self.run_navigation_step(user_step_text).await
        } else {
            self.run_decision_step(user_step_text).await
        }
    }

    async fn run_navigation_step(&self, user_step_text: &str) -> Result<InteractionStep, AgentError> {
        let target = format!("{}{}", self.base_url, self.test_path);
        let did_navigate = match self.acquirer.navigate_if_needed(&target).await {
            Ok(did_navigate) => did_navigate,
            Err(e) => return self.record_context_failure(user_step_text, Action::Navigate, e),
        };
        if did_navigate {
            // The Acquirer already settled 2s; §4.F step 0 wants ~3s total.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        let context = match self.acquirer.get_complete_context(None).await {
            Ok(context) => context,
            Err(e) => return self.record_context_failure(user_step_text, Action::Navigate, e),
        };

        self.history
            .lock()
            .await
            .push(format!("navigate -> {} ({} elements)", context.page_info.url, context.hybrid_elements.len()));

        Ok(InteractionStep {
            user_step_text: user_step_text.to_string(),
            action: Action::Navigate,
            element: None,
            params: Vec::new(),
            result: StepResult {
                success: true,
                new_url: Some(context.page_info.url),
                new_elements_count: context.hybrid_elements.len(),
                error: None,
            },
        })
    }

    /// A recoverable MCP error (a tool timeout, a transient tool failure)
    /// degrades to a failed step so the loop proceeds to the next one, per
    /// `MCP_TOOL_TIMEOUT`'s recoverable classification. A hard disconnect is
    /// fatal to the loop and propagates instead.
    fn record_context_failure(&self, user_step_text: &str, action: Action, error: SupervisorError) -> Result<InteractionStep, AgentError> {
        if !error.is_recoverable() {
            return Err(AgentError::from(error));
        }
        warn!(error = %error, "recoverable MCP error acquiring context, recording failed step");
        Ok(InteractionStep {
            user_step_text: user_step_text.to_string(),
            action,
            element: None,
            params: Vec::new(),
            result: StepResult {
                success: false,
                new_url: None,
                new_elements_count: 0,
                error: Some(error.to_string()),
            },
        })
    }

    async fn run_decision_step(&self, user_step_text: &str) -> Result<InteractionStep, AgentError> {
        let context = match self.acquirer.get_complete_context(None).await {
            Ok(context) => context,
            Err(e) => return self.record_context_failure(user_step_text, Action::Observe, e),
        };
        let history_snapshot = self.history.lock().await.clone();
        let prompt = build_navigation_decision_prompt(user_step_text, &context, &history_snapshot);

        let decision = match tokio::time::timeout(self.config.decision_timeout, self.llm.decide_next_action(&prompt)).await {
            Ok(Some(decision)) => decision,
            Ok(None) => {
                warn!("LLM returned no decision, defaulting to observe");
                default_observe_decision()
            }
            Err(_) => {
                warn!("LLM decision timed out, defaulting to observe");
                default_observe_decision()
            }
        };

        let outcome = self.execute_decision(&decision).await;

        if decision.action == Action::Click && outcome.success {
            if let Err(e) = self.acquirer.capture_post_click().await {
                warn!(error = %e, "post-click dynamic capture failed");
            }
        }

        if outcome.success && matches!(decision.action, Action::Click | Action::Type) {
            if let Some(element) = &decision.element {
                self.remember_interacted_element(&context, &element.ref_id).await;
            }
        }

        tokio::time::sleep(Duration::from_millis(800)).await;
        let post_context = match self.acquirer.get_complete_context(None).await {
            Ok(post_context) => post_context,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "recoverable MCP error acquiring post-step context");
                self.history.lock().await.push(format!(
                    "{:?} on {:?}: {} (post-step context unavailable: {e})",
                    decision.action,
                    decision.element.as_ref().map(|el| el.name.as_str()),
                    if outcome.success { "succeeded" } else { "failed" }
                ));
                return Ok(InteractionStep {
                    user_step_text: user_step_text.to_string(),
                    action: decision.action,
                    element: decision.element,
                    params: decision.params,
                    result: StepResult {
                        success: outcome.success,
                        new_url: None,
                        new_elements_count: 0,
                        error: outcome.error.or(Some(e.to_string())),
                    },
                });
            }
            Err(e) => return Err(AgentError::from(e)),
        };

        self.history.lock().await.push(format!(
            "{:?} on {:?}: {}",
            decision.action,
            decision.element.as_ref().map(|e| e.name.as_str()),
            if outcome.success { "succeeded" } else { "failed" }
        ));

        Ok(InteractionStep {
            user_step_text: user_step_text.to_string(),
            action: decision.action,
            element: decision.element,
            params: decision.params,
            result: StepResult {
                success: outcome.success,
                new_url: Some(post_context.page_info.url),
                new_elements_count: post_context.hybrid_elements.len(),
                error: outcome.error,
            },
        })
    }

    async fn remember_interacted_element(&self, context: &crate::types::PageContext, ref_id: &str) {
        if let Some(hybrid) = context.hybrid_elements.iter().find(|h| h.ref_id == ref_id) {
            let mut interacted = self.interacted_elements.lock().await;
            if !interacted.iter().any(|h| h.ref_id == hybrid.ref_id) {
                interacted.push(hybrid.clone());
            }
        }
    }

    /// §4.F step 4: translate a `Decision` into an MCP tool call, following
    /// the teacher's action-name-to-tool-name dispatch.
    async fn execute_decision(&self, decision: &Decision) -> ActionOutcome {
        match decision.action {
            Action::Click => self.execute_click(&decision.element).await,
            Action::Type => self.execute_type(&decision.element, &decision.params).await,
            Action::Wait => self.execute_wait(&decision.params).await,
            Action::Observe => ActionOutcome { success: true, error: None },
            Action::Navigate => ActionOutcome {
                success: false,
                error: Some("navigate is only valid as step 0".to_string()),
            },
        }
    }

    async fn execute_click(&self, element: &Option<ElementRef>) -> ActionOutcome {
        let Some(element) = element else {
            return missing_ref("click");
        };
        match self
            .acquirer
            .call_tool("browser_click", serde_json::json!({ "element": element.name, "ref": element.ref_id }))
            .await
        {
            Ok(_) => ActionOutcome { success: true, error: None },
            Err(e) => ActionOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    async fn execute_type(&self, element: &Option<ElementRef>, params: &[serde_json::Value]) -> ActionOutcome {
        let Some(element) = element else {
            return missing_ref("type");
        };
        let Some(text) = params.first().and_then(|v| v.as_str()) else {
            return missing_ref("type (text param)");
        };
        match self
            .acquirer
            .call_tool(
                "browser_type",
                serde_json::json!({ "element": element.name, "ref": element.ref_id, "text": text }),
            )
            .await
        {
            Ok(_) => ActionOutcome { success: true, error: None },
            Err(e) => ActionOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    async fn execute_wait(&self, params: &[serde_json::Value]) -> ActionOutcome {
        let millis = params.first().and_then(|v| v.as_u64()).unwrap_or(2000);
        match self
            .acquirer
            .call_tool("browser_wait_for", serde_json::json!({ "time": millis }))
            .await
        {
            Ok(_) => ActionOutcome { success: true, error: None },
            Err(e) => ActionOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn history_snapshot(&self) -> Vec<String> {
        self.history.lock().await.clone()
    }

    pub async fn interacted_elements_snapshot(&self) -> Vec<HybridElement> {
        self.interacted_elements.lock().await.clone()
    }
}

fn missing_ref(action: &str) -> ActionOutcome {
    warn!(action, "action is missing a required ref");
    ActionOutcome {
        success: false,
        error: Some(format!("{action} requires an element ref")),
    }
}

fn default_observe_decision() -> Decision {
    Decision {
        action: Action::Observe,
        element: None,
        params: Vec::new(),
        reasoning: "LLM returned no decision, defaulting to observe".to_string(),
    }
}
