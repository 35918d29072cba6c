//! AI-driven web exploration and test-artifact synthesis over MCP.
//!
//! Drives a browser through an MCP stdio server (the Playwright MCP server
//! by default), fuses accessibility-tree and DOM snapshots into ranked
//! "hybrid elements", runs an LLM-directed navigation loop over a user
//! story's steps, and synthesizes a Page Object plus test-step sequence
//! from the resulting exploration trace.

pub mod artifact;
pub mod config;
pub mod context;
pub mod correlation;
pub mod error;
pub mod llm;
pub mod navigation;
pub mod parser;
pub mod selectors;
pub mod supervisor;
pub mod types;

pub use artifact::ArtifactSynthesizer;
pub use config::Config;
pub use context::ContextAcquirer;
pub use error::{AgentError, AgentResult, ArtifactError, ArtifactResult, SupervisorError, SupervisorResult};
pub use llm::{Decision, LlmBackend, NullLlm};
pub use navigation::Navigator;
pub use supervisor::McpSupervisor;
pub use types::{ExplorationResult, HybridElement, PageContext, TestArtifact};
