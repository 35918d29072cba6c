//! Context Acquirer: composes parallel MCP tool calls into one `PageContext`.

mod dom_walk;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::correlation;
use crate::error::SupervisorResult;
use crate::parser;
use crate::selectors;
use crate::supervisor::McpSupervisor;
use crate::types::{DomElement, PageContext, SnapshotId};

pub use dom_walk::{DOM_WALK_SCRIPT, PAGE_INFO_SCRIPT};

/// Monotonic generator for `SnapshotId`s, one per `McpSupervisor` lifetime.
#[derive(Default)]
pub struct SnapshotIdGenerator(AtomicU64);

impl SnapshotIdGenerator {
    pub fn next(&self) -> SnapshotId {
        SnapshotId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

fn dom_element_key(d: &DomElement) -> String {
    format!(
        "{}|{}|{}",
        d.tag_name,
        d.id.as_deref().unwrap_or(""),
        d.text_content.as_deref().unwrap_or("")
    )
}

/// Assembles complete page contexts from an `McpSupervisor`'s tool calls.
pub struct ContextAcquirer {
    supervisor: Arc<McpSupervisor>,
    snapshot_ids: SnapshotIdGenerator,
    pending_dynamic: AsyncMutex<Vec<DomElement>>,
    capture_screenshot: bool,
}

impl ContextAcquirer {
    pub fn new(supervisor: Arc<McpSupervisor>) -> Self {
        Self {
            supervisor,
            snapshot_ids: SnapshotIdGenerator::default(),
            pending_dynamic: AsyncMutex::new(Vec::new()),
            capture_screenshot: false,
        }
    }

    pub fn with_screenshots(mut self, capture: bool) -> Self {
        self.capture_screenshot = capture;
        self
    }

    /// Thin pass-through to the underlying supervisor, for callers (the
    /// Navigation Loop's action executor) that need to invoke a tool
    /// directly rather than acquiring a full context.
    pub async fn call_tool(&self, name: &str, args: serde_json::Value) -> SupervisorResult<String> {
        self.supervisor.call_tool(name, args).await
    }

    /// §4.C: navigate if needed, acquire snapshot/console/network/DOM-walk
    /// in parallel, correlate, and synthesize selectors.
    pub async fn get_complete_context(&self, url: Option<&str>) -> SupervisorResult<PageContext> {
        if let Some(url) = url {
            self.navigate_if_needed(url).await?;
        }

        let snapshot_id = self.snapshot_ids.next();
        let want_screenshot = self.capture_screenshot;

        let (snapshot_text, console_text, network_text, dom_text, screenshot_text) = tokio::try_join!(
            self.supervisor.call_tool("browser_snapshot", serde_json::json!({})),
            self.supervisor
                .call_tool("browser_console_messages", serde_json::json!({})),
            self.supervisor
                .call_tool("browser_network_requests", serde_json::json!({})),
            self.supervisor.call_tool(
                "browser_evaluate",
                serde_json::json!({ "function": DOM_WALK_SCRIPT })
            ),
            async {
                if want_screenshot {
                    self.supervisor
                        .call_tool("browser_take_screenshot", serde_json::json!({ "raw": true, "fullPage": true }))
                        .await
                } else {
                    Ok(String::new())
                }
            },
        )?;

        let accessibility_elements = parser::parse_accessibility_snapshot(&snapshot_text, snapshot_id);
        let console_messages = parser::parse_console_messages(&console_text);
        let network_requests = parser::parse_network_requests(&network_text);

        let mut dom_elements = dom_walk::parse_dom_elements(&dom_text);
        self.merge_pending_dynamic(&mut dom_elements).await;

        let mut hybrid_elements = correlation::correlate(&accessibility_elements, &dom_elements);
        selectors::enrich_all(&mut hybrid_elements);

        let page_info_text = self
            .supervisor
            .call_tool("browser_evaluate", serde_json::json!({ "function": PAGE_INFO_SCRIPT }))
            .await?;
        let page_info = dom_walk::parse_page_info(&page_info_text);

        let screenshot = want_screenshot
            .then(|| base64::Engine::decode(&base64::engine::general_purpose::STANDARD, screenshot_text.trim()).ok())
            .flatten();

        Ok(PageContext {
            page_info,
            accessibility_elements,
            dom_elements,
            hybrid_elements,
            console_messages,
            network_requests,
            screenshot,
        })
    }

    /// Navigate to `url` unless the current page URL already contains it.
    /// Returns whether a navigation was actually issued, so callers that
    /// need extra settle time (the Navigation Loop's step 0) know whether
    /// to wait further.
    pub async fn navigate_if_needed(&self, url: &str) -> SupervisorResult<bool> {
        let current = self
            .supervisor
            .call_tool("browser_evaluate", serde_json::json!({ "function": PAGE_INFO_SCRIPT }))
            .await?;
        let page_info = dom_walk::parse_page_info(&current);

        if page_info.url.contains(url) {
            debug!(url, "already on target page, skipping navigation");
            return Ok(false);
        }

        self.supervisor
            .call_tool("browser_navigate", serde_json::json!({ "url": url }))
            .await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(true)
    }

    /// §4.C's post-click dynamic capture: re-run only the DOM-walk after
    /// 200ms and buffer the result for the next full context.
    pub async fn capture_post_click(&self) -> SupervisorResult<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let dom_text = self
            .supervisor
            .call_tool("browser_evaluate", serde_json::json!({ "function": DOM_WALK_SCRIPT }))
            .await?;
        let elements = dom_walk::parse_dom_elements(&dom_text);
        let mut pending = self.pending_dynamic.lock().await;
        pending.extend(elements);
        Ok(())
    }

    async fn merge_pending_dynamic(&self, dom_elements: &mut Vec<DomElement>) {
        let mut pending = self.pending_dynamic.lock().await;
        if pending.is_empty() {
            return;
        }
        let mut seen: HashSet<String> = dom_elements.iter().map(dom_element_key).collect();
        for element in pending.drain(..) {
            let key = dom_element_key(&element);
            if seen.insert(key) {
                dom_elements.push(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_ids_are_monotonic() {
        let gen = SnapshotIdGenerator::default();
        let a = gen.next();
        let b = gen.next();
        assert!(b.0 > a.0);
    }

    #[test]
    fn dom_element_key_distinguishes_distinct_elements() {
        let a = DomElement {
            tag_name: "div".to_string(),
            id: Some("toast".to_string()),
            ..Default::default()
        };
        let b = DomElement {
            tag_name: "div".to_string(),
            id: Some("other".to_string()),
            ..Default::default()
        };
        assert_ne!(dom_element_key(&a), dom_element_key(&b));
    }
}
