//! The MCP Process Supervisor: owns the child MCP server over stdio.
//!
//! Singleton discipline follows the teacher's `BrowserManager::global()`
//! pattern (`OnceLock<Arc<...>>` + `tokio::sync::Mutex` around the live
//! connection, never a sync lock, since every method here awaits).

use std::sync::{Arc, OnceLock};

use rmcp::model::CallToolRequestParam;
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{ClientHandler, RoleClient, ServiceExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};

use super::browser_check;

static GLOBAL_SUPERVISOR: OnceLock<Arc<McpSupervisor>> = OnceLock::new();

/// Passive client-side handler: this crate never serves roots, sampling, or
/// elicitation requests back to the MCP server, so every capability callback
/// uses the trait's default (no-op) implementation.
#[derive(Debug, Clone, Copy, Default)]
struct PassiveClientHandler;

impl ClientHandler for PassiveClientHandler {}

struct Connection {
    service: RunningService<RoleClient, PassiveClientHandler>,
    tool_names: Vec<String>,
}

/// Owns the single live MCP child process for this host process.
pub struct McpSupervisor {
    config: SupervisorConfig,
    connection: Mutex<Option<Connection>>,
}

impl McpSupervisor {
    /// Process-wide singleton. A second call to `start()` on the returned
    /// handle is a no-op if a connection is already live.
    #[must_use]
    pub fn global() -> Arc<McpSupervisor> {
        GLOBAL_SUPERVISOR
            .get_or_init(|| Arc::new(McpSupervisor::new(SupervisorConfig::default())))
            .clone()
    }

    /// Construct a standalone supervisor (for tests, or callers that inject
    /// their own handle instead of using the process-wide singleton).
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Verify browser binaries, launch the MCP child, connect, and list its
    /// tools. No-op if already connected.
    pub async fn start(&self) -> SupervisorResult<()> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        if browser_check::find_browser_executable().is_none() {
            info!("no browser binary found, attempting a one-shot install");
            self.install_browser_once().await?;
        }

        let mut cmd = Command::new(&self.config.server_command);
        cmd.args(&self.config.server_args);
        cmd.kill_on_drop(true);

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| SupervisorError::McpUnavailable(e.to_string()))?;

        let service = tokio::time::timeout(
            self.config.connect_timeout,
            PassiveClientHandler.serve(transport),
        )
        .await
        .map_err(|_| SupervisorError::McpConnectTimeout(self.config.connect_timeout))?
        .map_err(|e| SupervisorError::McpUnavailable(e.to_string()))?;

        let tools = service
            .list_all_tools()
            .await
            .map_err(|e| SupervisorError::McpUnavailable(e.to_string()))?;
        let tool_names: Vec<String> = tools.into_iter().map(|t| t.name.to_string()).collect();
        info!(tools = ?tool_names, "MCP server ready");

        *guard = Some(Connection {
            service,
            tool_names,
        });
        Ok(())
    }

    /// Close the client session, then the transport (terminating the child).
    /// Idempotent: calling `stop()` with no live connection is a no-op.
    pub async fn stop(&self) -> SupervisorResult<()> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.take() {
            match conn.service.close_with_timeout(self.config.shutdown_timeout).await {
                Ok(Some(reason)) => info!(?reason, "MCP server closed"),
                Ok(None) => warn!("MCP server close timed out; child process will be killed"),
                Err(e) => warn!(error = %e, "error while closing MCP server session"),
            }
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Thin pass-through: invoke `name` with `args`, returning the raw
    /// (unparsed) text payload for `Parser::safe_parse` to interpret.
    pub async fn call_tool(&self, name: &str, args: serde_json::Value) -> SupervisorResult<String> {
        let guard = self.connection.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| SupervisorError::McpUnavailable("supervisor not started".into()))?;

        if !conn.tool_names.iter().any(|t| t == name) {
            warn!(tool = name, "calling a tool absent from the last list_all_tools() response");
        }

        let params = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        };

        let result = tokio::time::timeout(self.config.tool_timeout, conn.service.peer().call_tool(params))
            .await
            .map_err(|_| SupervisorError::McpToolTimeout {
                tool: name.to_string(),
                timeout: self.config.tool_timeout,
            })?
            .map_err(|e| classify_call_error(name, e))?;

        Ok(stringify_tool_result(result))
    }

    async fn install_browser_once(&self) -> SupervisorResult<()> {
        let output = Command::new("npx")
            .args(["-y", "playwright", "install", "chromium"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SupervisorError::EnvBrowsersMissing(e.to_string()))?;

        if !output.status.success() {
            return Err(SupervisorError::EnvBrowsersMissing(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}

fn stringify_tool_result(result: rmcp::model::CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A tool-call error that indicates the transport itself is gone (the child
/// process exited, the pipe closed) is fatal and must surface as
/// `McpDisconnected`, not the recoverable `ToolCallFailed`. There is no
/// stable error-variant match for this across transports, so the error's
/// own message is inspected for the usual disconnect wording.
fn classify_call_error(tool: &str, error: impl std::fmt::Display) -> SupervisorError {
    let reason = error.to_string();
    if is_disconnect_message(&reason) {
        SupervisorError::McpDisconnected(reason)
    } else {
        SupervisorError::ToolCallFailed {
            tool: tool.to_string(),
            reason,
        }
    }
}

fn is_disconnect_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "disconnected",
        "connection closed",
        "channel closed",
        "transport closed",
        "broken pipe",
        "peer closed",
        "eof",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_supervisor_is_not_connected() {
        let supervisor = McpSupervisor::new(SupervisorConfig::default());
        assert!(!supervisor.is_connected().await);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let supervisor = McpSupervisor::new(SupervisorConfig::default());
        assert!(supervisor.stop().await.is_ok());
    }

    #[tokio::test]
    async fn call_tool_before_start_fails_with_mcp_unavailable() {
        let supervisor = McpSupervisor::new(SupervisorConfig::default());
        let err = supervisor
            .call_tool("browser_snapshot", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::McpUnavailable(_)));
    }

    #[test]
    fn transport_closed_messages_classify_as_disconnected() {
        let err = classify_call_error("browser_click", "connection closed by peer");
        assert!(matches!(err, SupervisorError::McpDisconnected(_)));
    }

    #[test]
    fn ordinary_tool_errors_classify_as_tool_call_failed() {
        let err = classify_call_error("browser_click", "element not found");
        assert!(matches!(err, SupervisorError::ToolCallFailed { .. }));
    }
}
