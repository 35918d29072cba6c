//! Data model shared across the MCP client, correlation engine, and
//! navigation loop: accessibility/DOM elements, the hybrid fusion, selector
//! candidates, page context, and the exploration trace.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies the accessibility snapshot an element or ref was issued in.
///
/// Refs are only valid within the snapshot that produced them (see design
/// notes on "opaque refs bound to snapshots"); this id lets callers check
/// that invariant without caching refs across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub u64);

/// An element surfaced by `browser_snapshot`'s accessibility tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityElement {
    pub role: String,
    pub name: Option<String>,
    /// Opaque handle, valid only within `snapshot`.
    pub ref_id: String,
    pub snapshot: SnapshotId,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Coarse classification of why a DOM element is flagged dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicType {
    LiveRegion,
    Interactive,
    TestTarget,
    Standard,
}

/// An element surfaced by the in-page DOM-walk evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomElement {
    pub tag_name: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub inner_text: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub is_dynamic: bool,
    #[serde(default)]
    pub dynamic_type: Option<DynamicType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Default for DynamicType {
    fn default() -> Self {
        DynamicType::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// How a hybrid element's accessibility and DOM views were fused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelationMethod {
    ExactTextMatch,
    PartialTextMatch,
    PositionBased,
    None,
}

impl CorrelationMethod {
    /// The fixed score associated with each method (spec §8: score ∈
    /// {0, 0.7, 0.8, 1.0} and matches its method).
    pub fn score(self) -> f64 {
        match self {
            CorrelationMethod::ExactTextMatch => 1.0,
            CorrelationMethod::PartialTextMatch => 0.8,
            CorrelationMethod::PositionBased => 0.7,
            CorrelationMethod::None => 0.0,
        }
    }
}

/// The closed set of selector strategies the synthesizer may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorKind {
    ByRole,
    ByLabel,
    ByTestId,
    ByPlaceholder,
    ByText,
    ByTitle,
    ByAltText,
    CssLocator,
    XpathLocator,
}

/// A single ranked selector candidate with its reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub kind: SelectorKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    pub priority: u8,
    pub reason: String,
}

/// The fusion of an accessibility element with its best-matching DOM element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridElement {
    pub ref_id: String,
    pub snapshot: SnapshotId,
    pub role: String,
    pub name: String,
    pub text: String,
    pub disabled: bool,
    pub checked: bool,
    pub expanded: bool,
    pub html_attributes: HashMap<String, String>,
    pub correlation_score: f64,
    pub correlation_method: CorrelationMethod,
    pub correlation_index: usize,
    /// Always exactly 5 entries, priorities 1..=5, descending confidence.
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A fully assembled view of the page at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub page_info: PageInfo,
    pub accessibility_elements: Vec<AccessibilityElement>,
    pub dom_elements: Vec<DomElement>,
    pub hybrid_elements: Vec<HybridElement>,
    pub console_messages: Vec<ConsoleMessage>,
    pub network_requests: Vec<NetworkRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,
}

/// The closed set of actions the navigation loop can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Navigate,
    Click,
    Type,
    Wait,
    Observe,
}

/// A minimal reference to the element targeted by a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRef {
    pub role: String,
    pub name: String,
    pub ref_id: String,
}

/// One completed (or failed) interaction in the exploration trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionStep {
    pub user_step_text: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    pub result: StepResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
    pub new_elements_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The outcome of running the full navigation loop over a user story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationResult {
    pub steps: Vec<InteractionStep>,
    pub final_context: PageContext,
    pub generated_selectors: Vec<HybridElement>,
    pub learnings: Vec<String>,
}

/// One locator entry in the synthesized page object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locator {
    pub name: String,
    pub element_type: String,
    pub actions: Vec<String>,
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageObject {
    pub class_name: String,
    pub locators: Vec<Locator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    pub page: String,
    pub action: String,
    pub params: Vec<serde_json::Value>,
}

/// The emitted artifact: a page object plus the generated test sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestArtifact {
    pub page_object: PageObject,
    pub test_steps: Vec<TestStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_method_scores_match_spec_closed_set() {
        let scores: Vec<f64> = [
            CorrelationMethod::ExactTextMatch,
            CorrelationMethod::PartialTextMatch,
            CorrelationMethod::PositionBased,
            CorrelationMethod::None,
        ]
        .iter()
        .map(|m| m.score())
        .collect();
        assert_eq!(scores, vec![1.0, 0.8, 0.7, 0.0]);
    }

    #[test]
    fn hybrid_element_round_trips_through_json() {
        let hybrid = HybridElement {
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
        };
        let json = serde_json::to_string(&hybrid).unwrap();
        let back: HybridElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hybrid);
    }
}
