//! Selector Synthesizer: ranks candidate Playwright-style locators for a
//! hybrid element and picks the top five.

mod aria_roles;

use crate::types::{HybridElement, Selector, SelectorKind};

struct Candidate {
    kind: SelectorKind,
    value: String,
    confidence: u8,
    reason: &'static str,
}

fn non_empty<'a>(value: Option<&'a String>) -> Option<&'a str> {
    value.map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn generate_candidates(h: &HybridElement) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let role_valid = aria_roles::is_valid(&h.role);
    let has_text = !h.text.trim().is_empty();
    let id = non_empty(h.html_attributes.get("id"));
    let test_id = non_empty(h.html_attributes.get("testId"));
    let placeholder = non_empty(h.html_attributes.get("placeholder"));
    let title = non_empty(h.html_attributes.get("title"));
    let alt = non_empty(h.html_attributes.get("alt"));
    let tag = non_empty(h.html_attributes.get("tagName"));
    let name_attr = non_empty(h.html_attributes.get("name"));
    let type_attr = non_empty(h.html_attributes.get("type"));

    if role_valid && has_text {
        candidates.push(Candidate {
            kind: SelectorKind::ByRole,
            value: h.role.clone(),
            confidence: 95,
            reason: "valid ARIA role with accessible text",
        });
    }
    if let Some(id) = id {
        candidates.push(Candidate {
            kind: SelectorKind::CssLocator,
            value: format!("#{id}"),
            confidence: 92,
            reason: "element has a stable id",
        });
    }
    if has_text {
        candidates.push(Candidate {
            kind: SelectorKind::ByLabel,
            value: h.text.clone(),
            confidence: 90,
            reason: "accessible text usable as a label",
        });
    }
    if let Some(test_id) = test_id {
        candidates.push(Candidate {
            kind: SelectorKind::ByTestId,
            value: test_id.to_string(),
            confidence: 88,
            reason: "element carries a test-id attribute",
        });
    }
    if let Some(placeholder) = placeholder {
        candidates.push(Candidate {
            kind: SelectorKind::ByPlaceholder,
            value: placeholder.to_string(),
            confidence: 85,
            reason: "placeholder text is distinctive",
        });
    }
    if role_valid {
        candidates.push(Candidate {
            kind: SelectorKind::ByRole,
            value: h.role.clone(),
            confidence: 80,
            reason: "valid ARIA role, no accessible text required",
        });
    }
    if has_text {
        candidates.push(Candidate {
            kind: SelectorKind::ByText,
            value: h.text.clone(),
            confidence: 75,
            reason: "element text content",
        });
    }
    if let Some(title) = title {
        candidates.push(Candidate {
            kind: SelectorKind::ByTitle,
            value: title.to_string(),
            confidence: 65,
            reason: "title attribute present",
        });
    }
    if let Some(alt) = alt {
        candidates.push(Candidate {
            kind: SelectorKind::ByAltText,
            value: alt.to_string(),
            confidence: 60,
            reason: "alt attribute present",
        });
    }
    if let (Some(tag), Some(name_attr), Some(type_attr)) = (tag, name_attr, type_attr) {
        candidates.push(Candidate {
            kind: SelectorKind::CssLocator,
            value: format!("{tag}[name=\"{name_attr}\"][type=\"{type_attr}\"]"),
            confidence: 50,
            reason: "tag/name/type combination is specific enough",
        });
    }
    if let (Some(tag), Some(type_attr)) = (tag, type_attr) {
        candidates.push(Candidate {
            kind: SelectorKind::XpathLocator,
            value: format!("//{tag}[@type=\"{type_attr}\"]"),
            confidence: 45,
            reason: "type attribute distinguishes this element",
        });
    }
    if role_valid {
        candidates.push(Candidate {
            kind: SelectorKind::XpathLocator,
            value: format!("//*[@role=\"{}\"]", h.role),
            confidence: 40,
            reason: "last-resort role-based xpath",
        });
    }

    candidates
}

fn fallback_selector(h: &HybridElement, priority: u8) -> Selector {
    let tag = non_empty(h.html_attributes.get("tagName")).unwrap_or("*");
    Selector {
        kind: SelectorKind::CssLocator,
        value: format!("{tag}:nth-of-type({priority})"),
        options: None,
        priority,
        reason: "positional fallback, no stronger candidate available".to_string(),
    }
}

/// Produce exactly 5 priority-ranked, confidence-sorted selectors for a
/// hybrid element. Padded with positional `nth-of-type` fallbacks when
/// fewer than 5 real candidates were generated.
///
/// Deterministic: identical hybrid-element attributes always produce a
/// byte-identical selector list (stable sort breaks ties by generation
/// order, which is itself fixed by `generate_candidates`).
pub fn synthesize(h: &HybridElement) -> Vec<Selector> {
    let mut candidates = generate_candidates(h);
    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut selectors: Vec<Selector> = candidates
        .into_iter()
        .filter(|c| !c.value.is_empty())
        .take(5)
        .enumerate()
        .map(|(i, c)| Selector {
            kind: c.kind,
            value: c.value,
            options: (c.kind == SelectorKind::ByRole && !h.text.trim().is_empty())
                .then(|| serde_json::json!({ "name": h.text })),
            priority: (i + 1) as u8,
            reason: c.reason.to_string(),
        })
        .collect();

    while selectors.len() < 5 {
        let priority = (selectors.len() + 1) as u8;
        selectors.push(fallback_selector(h, priority));
    }

    selectors
}

/// Fill in `selectors` for every hybrid element in place.
pub fn enrich_all(elements: &mut [HybridElement]) {
    for element in elements.iter_mut() {
        element.selectors = synthesize(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CorrelationMethod, SnapshotId};
    use std::collections::HashMap;

    fn button() -> HybridElement {
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), "submit-btn".to_string());
        attrs.insert("tagName".to_string(), "button".to_string());
        HybridElement {
            ref_id: "e1".to_string(),
            snapshot: SnapshotId(1),
            role: "button".to_string(),
            name: "Sign In".to_string(),
            text: "Sign In".to_string(),
            disabled: false,
            checked: false,
            expanded: false,
            html_attributes: attrs,
            correlation_score: 1.0,
            correlation_method: CorrelationMethod::ExactTextMatch,
            correlation_index: 0,
            selectors: Vec::new(),
        }
    }

    #[test]
    fn always_returns_exactly_five_selectors_with_contiguous_priorities() {
        let selectors = synthesize(&button());
        assert_eq!(selectors.len(), 5);
        let priorities: Vec<u8> = selectors.iter().map(|s| s.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn top_selector_for_named_button_is_by_role() {
        let selectors = synthesize(&button());
        assert_eq!(selectors[0].kind, SelectorKind::ByRole);
        assert_eq!(selectors[0].value, "button");
    }

    #[test]
    fn selectors_are_sorted_by_descending_confidence_via_stable_order() {
        let selectors = synthesize(&button());
        // byRole(95) > cssLocator(#id)(92) > byLabel(90) ...
        assert_eq!(selectors[1].kind, SelectorKind::CssLocator);
        assert_eq!(selectors[1].value, "#submit-btn");
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesize(&button());
        let b = synthesize(&button());
        assert_eq!(a, b);
    }

    #[test]
    fn sparse_element_is_padded_with_fallbacks() {
        let h = HybridElement {
            ref_id: "e2".to_string(),
            snapshot: SnapshotId(1),
            role: "nonsense-role".to_string(),
            name: String::new(),
            text: String::new(),
            disabled: false,
            checked: false,
            expanded: false,
            html_attributes: HashMap::new(),
            correlation_score: 0.0,
            correlation_method: CorrelationMethod::None,
            correlation_index: 0,
            selectors: Vec::new(),
        };
        let selectors = synthesize(&h);
        assert_eq!(selectors.len(), 5);
        assert!(selectors.iter().all(|s| s.kind == SelectorKind::CssLocator));
    }

    #[test]
    fn invalid_aria_role_never_produces_a_by_role_selector() {
        let mut h = button();
        h.role = "not-a-real-role".to_string();
        let selectors = synthesize(&h);
        assert!(!selectors.iter().any(|s| s.kind == SelectorKind::ByRole));
    }
}
