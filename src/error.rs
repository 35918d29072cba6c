//! Error taxonomy for the exploration pipeline.
//!
//! One enum per failure domain, following the kinds enumerated in the
//! design's error-handling table rather than a single catch-all error type.

use thiserror::Error;

/// Errors raised by the MCP Process Supervisor (process lifecycle, transport).
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("browser binaries are not installed and could not be installed automatically: {0}")]
    EnvBrowsersMissing(String),

    #[error("MCP server is unavailable: {0}")]
    McpUnavailable(String),

    #[error("timed out waiting for MCP server to become ready after {0:?}")]
    McpConnectTimeout(std::time::Duration),

    #[error("MCP server disconnected: {0}")]
    McpDisconnected(String),

    #[error("MCP tool call '{tool}' timed out after {timeout:?}")]
    McpToolTimeout {
        tool: String,
        timeout: std::time::Duration,
    },

    #[error("MCP tool call '{tool}' failed: {reason}")]
    ToolCallFailed { tool: String, reason: String },
}

impl SupervisorError {
    /// Whether the navigation loop should record this as a failed step and
    /// continue (`MCP_TOOL_TIMEOUT`, transient `ToolCallFailed`), as opposed
    /// to a hard disconnect or startup failure, which is fatal to the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SupervisorError::McpToolTimeout { .. } | SupervisorError::ToolCallFailed { .. })
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors raised while running a single step of the AI Navigation Loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("MCP supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("action is missing a required field: {0}")]
    ActionMissingRef(String),

    #[error("LLM returned no decision, defaulting to observe")]
    LlmNullDecision,

    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("navigation loop stopped")]
    Stopped,
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while synthesizing the final test artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("LLM returned an invalid artifact: {0}")]
    LlmInvalidArtifact(String),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_error_messages_are_stable() {
        let err = SupervisorError::McpToolTimeout {
            tool: "browser_click".into(),
            timeout: std::time::Duration::from_secs(5),
        };
        assert!(err.to_string().contains("browser_click"));
    }

    #[test]
    fn agent_error_wraps_supervisor_error() {
        let sup = SupervisorError::McpDisconnected("eof".into());
        let agent: AgentError = sup.into();
        assert!(matches!(agent, AgentError::Supervisor(_)));
    }
}
