//! AI Navigation Loop: turns user-story steps into LLM decisions executed
//! through the MCP Client, accumulating an exploration trace.
//!
//! The actor pattern (a thin handle around `mpsc` command/response channels,
//! with a background task owning the real mutable state) follows the
//! teacher's `Agent`/`AgentInner` split, guaranteeing the loop is never
//! re-entered while a call is in flight, satisfying §5's ordering guarantee.

mod inner;
mod messaging;
mod prompts;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::NavigationConfig;
use crate::context::ContextAcquirer;
use crate::error::{AgentError, AgentResult};
use crate::llm::LlmBackend;
use crate::types::{ExplorationResult, HybridElement, InteractionStep};

use inner::NavigatorInner;
use messaging::{NavCommand, NavResponse};

pub use prompts::{build_navigation_decision_prompt, build_test_generation_prompt};

/// Handle for driving the Navigation Loop. Not `Clone`: the command/response
/// channel pair is single-owner by construction.
pub struct Navigator {
    inner: Arc<NavigatorInner>,
    command_channel: mpsc::Sender<NavCommand>,
    response_channel: Mutex<mpsc::Receiver<NavResponse>>,
    processor_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Navigator {
    pub fn new(acquirer: ContextAcquirer, llm: Arc<dyn LlmBackend>, base_url: impl Into<String>, test_path: impl Into<String>, config: NavigationConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (resp_tx, resp_rx) = mpsc::channel(32);

        let inner = Arc::new(NavigatorInner::new(acquirer, llm, base_url.into(), test_path.into(), config));
        let processor_handle = Self::spawn_processor(Arc::clone(&inner), cmd_rx, resp_tx);

        Self {
            inner,
            command_channel: cmd_tx,
            response_channel: Mutex::new(resp_rx),
            processor_handle: Some(processor_handle),
        }
    }

    /// Run every step of `user_story_steps` (index 0 is always treated as
    /// the navigation step, per §4.F) and return the accumulated trace.
    pub async fn run(&self, user_story_steps: &[String]) -> AgentResult<ExplorationResult> {
        let mut trace: Vec<InteractionStep> = Vec::with_capacity(user_story_steps.len());

        for (index, step_text) in user_story_steps.iter().enumerate() {
            let step = self.run_step(index, step_text.clone()).await?;
            trace.push(step);
        }

        let final_context = self.inner.acquirer.get_complete_context(None).await?;
        let generated_selectors: Vec<HybridElement> = self.inner.interacted_elements_snapshot().await;
        let learnings = build_learnings(&trace);

        Ok(ExplorationResult {
            steps: trace,
            final_context,
            generated_selectors,
            learnings,
        })
    }

    async fn run_step(&self, index: usize, user_step_text: String) -> AgentResult<InteractionStep> {
        self.command_channel
            .send(NavCommand::RunStep { index, user_step_text })
            .await
            .map_err(|_| AgentError::Stopped)?;

        let mut receiver = self.response_channel.lock().await;
        match receiver.recv().await {
            Some(NavResponse::StepComplete(step)) => Ok(*step),
            Some(NavResponse::Error(msg)) => Err(AgentError::StepFailed(msg)),
            Some(NavResponse::Stopped) => Err(AgentError::Stopped),
            None => Err(AgentError::Stopped),
        }
    }

    /// Gracefully stop the background processor. Waits up to 5s for
    /// confirmation, mirroring the teacher's `Agent::stop`.
    pub async fn stop(&self) -> AgentResult<()> {
        if self.command_channel.send(NavCommand::Stop).await.is_err() {
            return Ok(());
        }

        let mut receiver = self.response_channel.lock().await;
        match tokio::time::timeout(Duration::from_secs(5), receiver.recv()).await {
            Ok(Some(NavResponse::Stopped)) => {
                info!("navigation loop stopped gracefully");
                Ok(())
            }
            Ok(Some(other)) => {
                warn!(?other, "expected Stopped response to Stop command");
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(_) => Err(AgentError::StepFailed("navigation loop did not stop within 5s".to_string())),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.command_channel.is_closed()
    }

    pub async fn history(&self) -> Vec<String> {
        self.inner.history_snapshot().await
    }

    fn spawn_processor(
        inner: Arc<NavigatorInner>,
        mut cmd_rx: mpsc::Receiver<NavCommand>,
        resp_tx: mpsc::Sender<NavResponse>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    NavCommand::RunStep { index, user_step_text } => {
                        let response = match inner.process_step(index, &user_step_text).await {
                            Ok(step) => NavResponse::StepComplete(Box::new(step)),
                            Err(e) => NavResponse::Error(e.to_string()),
                        };
                        if resp_tx.send(response).await.is_err() {
                            error!("navigation response channel closed, stopping processor");
                            break;
                        }
                    }
                    NavCommand::Stop => {
                        let _ = resp_tx.send(NavResponse::Stopped).await;
                        break;
                    }
                }
            }
            debug!("navigation processor shutting down");
        })
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        if let Some(handle) = self.processor_handle.take() {
            handle.abort();
        }
    }
}

/// §4.F termination: one sentence per step.
fn build_learnings(trace: &[InteractionStep]) -> Vec<String> {
    trace
        .iter()
        .map(|step| {
            let target = step.element.as_ref().map(|e| e.name.as_str()).unwrap_or("the page");
            if step.result.success {
                format!("✅ {:?} on {target} succeeded", step.action)
            } else {
                format!(
                    "❌ {:?} on {target} failed: {}",
                    step.action,
                    step.result.error.as_deref().unwrap_or("unknown error")
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, StepResult};

    #[test]
    fn learnings_render_success_and_failure_sentences() {
        let trace = vec![
            InteractionStep {
                user_step_text: "click sign in".to_string(),
                action: Action::Click,
                element: Some(crate::types::ElementRef {
                    role: "button".to_string(),
                    name: "Sign In".to_string(),
                    ref_id: "e1".to_string(),
                }),
                params: Vec::new(),
                result: StepResult {
                    success: true,
                    new_url: None,
                    new_elements_count: 0,
                    error: None,
                },
            },
            InteractionStep {
                user_step_text: "click missing".to_string(),
                action: Action::Click,
                element: None,
                params: Vec::new(),
                result: StepResult {
                    success: false,
                    new_url: None,
                    new_elements_count: 0,
                    error: Some("no ref".to_string()),
                },
            },
        ];
        let learnings = build_learnings(&trace);
        assert!(learnings[0].starts_with('✅'));
        assert!(learnings[0].contains("Sign In"));
        assert!(learnings[1].starts_with('❌'));
        assert!(learnings[1].contains("no ref"));
    }
}
