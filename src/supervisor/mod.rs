//! MCP Process Supervisor: process lifecycle + protocol transport.

mod browser_check;
mod client;

pub use client::McpSupervisor;
