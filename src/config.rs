//! Ambient, code-level tunables for the supervisor and navigation loop.
//!
//! These are plain `Default`-able structs, not a config-loading system: no
//! file parsing, no env layering, no CLI flags. Callers construct one with
//! `Default::default()` and override individual fields as needed.

use std::time::Duration;

/// Tunables for the MCP Process Supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// How long to wait for the MCP child process to become ready.
    pub connect_timeout: Duration,
    /// Per-tool-call timeout.
    pub tool_timeout: Duration,
    /// Grace period given to `close_with_timeout` before the child is killed.
    pub shutdown_timeout: Duration,
    /// Command used to launch the MCP server child process.
    pub server_command: String,
    pub server_args: Vec<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            server_command: "npx".to_string(),
            server_args: vec![
                "-y".to_string(),
                "@playwright/mcp@latest".to_string(),
            ],
        }
    }
}

/// Tunables for the AI Navigation Loop.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Upper bound on steps executed for a single user story.
    pub max_steps: usize,
    /// Timeout applied to each `LlmBackend::decide_next_action` call.
    pub decision_timeout: Duration,
    /// Timeout applied to the final `LlmBackend::synthesize_artifact` call.
    pub synthesis_timeout: Duration,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            decision_timeout: Duration::from_secs(60),
            synthesis_timeout: Duration::from_secs(60),
        }
    }
}

/// Top-level configuration bundling both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub supervisor: SupervisorConfig,
    pub navigation: NavigationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.navigation.max_steps > 0);
        assert!(config.supervisor.connect_timeout > Duration::from_secs(0));
    }
}
