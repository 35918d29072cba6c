//! Response Parser: turns heterogeneous MCP tool output (JSON, Markdown-
//! wrapped JSON, YAML-like accessibility snapshots, tagged console/network
//! lines) into typed values.
//!
//! This module never panics and never returns an `Err`: malformed input
//! degrades to an empty collection or the caller-supplied fallback, matching
//! `PARSE_DEGRADED`'s "silent, returns fallback" propagation in the error
//! taxonomy.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{AccessibilityElement, ConsoleMessage, DynamicType, NetworkRequest, SnapshotId};

static RESULT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)### Result\s*\n(.*)").unwrap());
static OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[ref=([^\]]+)\]").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("\"([^\"]*)\"").unwrap());
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([a-zA-Z_-]+)=([^\]]+)\]").unwrap());

static CONSOLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(WARNING|ERROR|LOG)\]\s*(.*)").unwrap());
static NETWORK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\w+)\]\s+(\S+)\s*=>\s*\[(\d+)\]").unwrap());

const BOOLEAN_FLAGS: [&str; 5] = ["disabled", "checked", "expanded", "required", "readonly"];

/// Step 1–4 of the safe-parse cascade: already-structured input, strict
/// JSON, then JSON extracted from a `### Result` block or bare `{…}`/`[…]`
/// body. Returns `None` (not the fallback) when nothing parses, callers
/// supply the format-specific fallback themselves.
pub(crate) fn try_parse_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(caps) = RESULT_BLOCK_RE.captures(trimmed) {
        let body = caps.get(1)?.as_str().trim();
        if let Ok(value) = serde_json::from_str(body) {
            return Some(value);
        }
    }
    if let Some(m) = OBJECT_RE.find(trimmed) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Some(value);
        }
    }
    if let Some(m) = ARRAY_RE.find(trimmed) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Some(value);
        }
    }
    None
}

/// Generic entry point: an already-structured value passes through
/// unchanged; otherwise the JSON cascade runs; otherwise `fallback`.
pub fn safe_parse(value: Option<serde_json::Value>, text: &str, fallback: serde_json::Value) -> serde_json::Value {
    if let Some(value) = value {
        return value;
    }
    try_parse_json(text).unwrap_or(fallback)
}

/// Parse a `browser_snapshot` payload into accessibility elements.
///
/// Tries the JSON cascade first (a conforming MCP server may return an
/// array of elements directly); on failure, falls back to the YAML-like
/// `[ref=…]`-annotated tree format.
pub fn parse_accessibility_snapshot(text: &str, snapshot: SnapshotId) -> Vec<AccessibilityElement> {
    if let Some(value) = try_parse_json(text) {
        if let Ok(elements) = serde_json::from_value::<Vec<AccessibilityElement>>(value) {
            return elements;
        }
    }
    parse_yaml_snapshot(text, snapshot)
}

fn parse_yaml_snapshot(text: &str, snapshot: SnapshotId) -> Vec<AccessibilityElement> {
    let mut elements = Vec::new();
    for line in text.lines() {
        let Some(ref_caps) = REF_RE.captures(line) else {
            continue;
        };
        let ref_id = ref_caps[1].to_string();

        let role = line
            .trim_start()
            .trim_start_matches('-')
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or("generic")
            .to_string();

        let name = NAME_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let mut attributes = std::collections::HashMap::new();
        for caps in ATTR_RE.captures_iter(line) {
            let key = &caps[1];
            if key == "ref" {
                continue;
            }
            attributes.insert(key.to_string(), caps[2].to_string());
        }

        let has_flag = |flag: &str| -> bool {
            line.contains(&format!("[{flag}]"))
        };

        elements.push(AccessibilityElement {
            role,
            name,
            ref_id,
            snapshot,
            disabled: has_flag(BOOLEAN_FLAGS[0]),
            checked: has_flag(BOOLEAN_FLAGS[1]),
            expanded: has_flag(BOOLEAN_FLAGS[2]),
            attributes,
        });
    }
    elements
}

/// Parse a `browser_console_messages` payload.
pub fn parse_console_messages(text: &str) -> Vec<ConsoleMessage> {
    if let Some(value) = try_parse_json(text) {
        if let Ok(messages) = serde_json::from_value::<Vec<ConsoleMessage>>(value) {
            return messages;
        }
    }
    let now = chrono::Utc::now();
    text.lines()
        .filter_map(|line| {
            let caps = CONSOLE_RE.captures(line)?;
            Some(ConsoleMessage {
                level: caps[1].to_string(),
                message: caps[2].trim().to_string(),
                timestamp: now,
            })
        })
        .collect()
}

/// Parse a `browser_network_requests` payload.
pub fn parse_network_requests(text: &str) -> Vec<NetworkRequest> {
    if let Some(value) = try_parse_json(text) {
        if let Ok(requests) = serde_json::from_value::<Vec<NetworkRequest>>(value) {
            return requests;
        }
    }
    let now = chrono::Utc::now();
    text.lines()
        .filter_map(|line| {
            let caps = NETWORK_RE.captures(line)?;
            Some(NetworkRequest {
                method: caps[1].to_string(),
                url: caps[2].to_string(),
                status: caps[3].parse().ok()?,
                timestamp: now,
            })
        })
        .collect()
}

/// Classify a DOM element already flagged dynamic (per §4.C.1) by which
/// marker attribute tripped the flag.
pub fn classify_dynamic_type(is_live_region: bool, is_interactive_marker: bool, has_test_id: bool) -> DynamicType {
    if is_live_region {
        DynamicType::LiveRegion
    } else if has_test_id {
        DynamicType::TestTarget
    } else if is_interactive_marker {
        DynamicType::Interactive
    } else {
        DynamicType::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_degrades_to_empty_collection() {
        assert!(parse_accessibility_snapshot("", SnapshotId(1)).is_empty());
        assert!(parse_console_messages("").is_empty());
        assert!(parse_network_requests("").is_empty());
    }

    #[test]
    fn not_json_degrades_without_panicking() {
        assert!(parse_accessibility_snapshot("not json", SnapshotId(1)).is_empty());
    }

    #[test]
    fn yaml_snapshot_extracts_role_name_and_ref() {
        let snapshot = "- textbox \"Username\" [ref=e3] [required]\n- button \"Sign In\" [ref=e5]";
        let elements = parse_accessibility_snapshot(snapshot, SnapshotId(7));
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].role, "textbox");
        assert_eq!(elements[0].name.as_deref(), Some("Username"));
        assert_eq!(elements[0].ref_id, "e3");
        assert!(elements[0].attributes.is_empty());
        assert_eq!(elements[0].snapshot, SnapshotId(7));
        assert_eq!(elements[1].role, "button");
        assert_eq!(elements[1].name.as_deref(), Some("Sign In"));
    }

    #[test]
    fn result_block_json_is_extracted() {
        let text = "### Result\n{\"url\":\"https://app.test\",\"title\":\"Home\"}";
        let value = safe_parse(None, text, serde_json::json!({}));
        assert_eq!(value["url"], "https://app.test");
    }

    #[test]
    fn passthrough_object_short_circuits_text_parsing() {
        let value = serde_json::json!({"already": "structured"});
        let result = safe_parse(Some(value.clone()), "ignored text", serde_json::json!({}));
        assert_eq!(result, value);
    }

    #[test]
    fn console_lines_parse_level_and_message() {
        let text = "[WARNING] Deprecated API used\n[ERROR] Uncaught TypeError\nnot a console line";
        let messages = parse_console_messages(text);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].level, "WARNING");
        assert_eq!(messages[0].message, "Deprecated API used");
        assert_eq!(messages[1].level, "ERROR");
    }

    #[test]
    fn network_lines_parse_method_url_status() {
        let text = "[GET] https://app.test/api/user => [200]\nnoise";
        let requests = parse_network_requests(text);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://app.test/api/user");
        assert_eq!(requests[0].status, 200);
    }

    #[test]
    fn mixed_result_blocks_fall_back_without_throwing() {
        let text = "### Result\nnot actually json at all";
        let value = safe_parse(None, text, serde_json::json!([]));
        assert_eq!(value, serde_json::json!([]));
    }
}
