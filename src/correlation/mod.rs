//! Correlation Engine: fuses accessibility elements (refs, no attributes)
//! with DOM elements (attributes, no refs) into hybrid elements.

use std::collections::HashMap;

use crate::types::{AccessibilityElement, CorrelationMethod, DomElement, HybridElement};

/// `tagName|type` → DOM element indices, built once per correlation pass.
///
/// Kept around (and exercised in tests) as the concrete realization of the
/// `byType` index the matching algorithm is specified against, even though
/// the matching itself filters by role-compatibility rather than walking
/// this map directly.
pub fn build_by_type_index(dom: &[DomElement]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, d) in dom.iter().enumerate() {
        let key = format!("{}|{}", d.tag_name, d.r#type.as_deref().unwrap_or(""));
        index.entry(key).or_default().push(i);
    }
    index
}

/// Lowercase-trimmed `placeholder ∪ textContent ∪ innerText ∪ ariaLabel ∪
/// name` → DOM element indices.
pub fn build_by_text_index(dom: &[DomElement]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, d) in dom.iter().enumerate() {
        for field in dom_text_fields(d) {
            let key = field.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            let bucket = index.entry(key).or_default();
            if !bucket.contains(&i) {
                bucket.push(i);
            }
        }
    }
    index
}

fn dom_text_fields(d: &DomElement) -> impl Iterator<Item = &str> {
    [
        d.placeholder.as_deref(),
        d.text_content.as_deref(),
        d.inner_text.as_deref(),
        d.aria_label.as_deref(),
        d.name.as_deref(),
    ]
    .into_iter()
    .flatten()
}

/// §4.D.1's role-compatibility table, as used by exact/partial text
/// matching. `generic` is permissive here (div/span/section/article/aside);
/// position-based matching below is stricter, see the open question this
/// resolves in DESIGN.md.
fn role_compatible_text(role: &str, dom: &DomElement) -> bool {
    match role {
        "textbox" => matches!(dom.tag_name.as_str(), "input" | "textarea"),
        "button" => {
            dom.tag_name == "button" || (dom.tag_name == "input" && dom.r#type.as_deref() == Some("submit"))
        }
        "link" => dom.tag_name == "a",
        "checkbox" | "radio" => dom.tag_name == "input",
        "combobox" => dom.tag_name == "select",
        "img" => dom.tag_name == "img",
        "heading" => matches!(dom.tag_name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"),
        "generic" => matches!(dom.tag_name.as_str(), "div" | "span" | "section" | "article" | "aside"),
        _ => false,
    }
}

/// Position-based matching is explicitly restricted to bare `div`s per
/// spec §4.D ("For role=\"generic\", restrict to div without a role
/// attribute"), narrower than the text-match table above.
fn role_compatible_position(role: &str, dom: &DomElement) -> bool {
    if role == "generic" {
        return dom.tag_name == "div" && dom.role.is_none();
    }
    role_compatible_text(role, dom)
}

fn is_placeholder_name(name: &str, role: &str) -> bool {
    let trimmed = name.trim();
    trimmed.eq_ignore_ascii_case(role) || trimmed.eq_ignore_ascii_case(&format!("- {role}"))
}

fn exact_text_match(
    a: &AccessibilityElement,
    role: &str,
    dom: &[DomElement],
    by_text: &HashMap<String, Vec<usize>>,
) -> Option<(usize, CorrelationMethod)> {
    let name = a.name.as_ref()?;
    if name.trim().is_empty() || is_placeholder_name(name, role) {
        return None;
    }
    let key = name.trim().to_lowercase();
    let candidates = by_text.get(&key)?;
    let idx = *candidates.iter().find(|&&i| role_compatible_text(role, &dom[i]))?;
    Some((idx, CorrelationMethod::ExactTextMatch))
}

fn partial_text_match(a: &AccessibilityElement, role: &str, dom: &[DomElement]) -> Option<(usize, CorrelationMethod)> {
    let name = a.name.as_ref()?;
    let lname = name.trim().to_lowercase();
    if lname.is_empty() {
        return None;
    }
    for (i, d) in dom.iter().enumerate() {
        if !role_compatible_text(role, d) {
            continue;
        }
        for field in dom_text_fields(d) {
            let ltext = field.trim().to_lowercase();
            if ltext.is_empty() {
                continue;
            }
            if ltext.contains(&lname) || lname.contains(&ltext) {
                return Some((i, CorrelationMethod::PartialTextMatch));
            }
        }
    }
    None
}

fn position_based_match(role: &str, k: usize, dom: &[DomElement]) -> Option<(usize, CorrelationMethod)> {
    let idx = dom
        .iter()
        .enumerate()
        .filter(|(_, d)| role_compatible_position(role, d))
        .nth(k)?
        .0;
    Some((idx, CorrelationMethod::PositionBased))
}

fn dom_attribute_bag(d: &DomElement) -> HashMap<String, String> {
    let mut bag = HashMap::new();
    bag.insert("tagName".to_string(), d.tag_name.clone());
    let mut set = |k: &str, v: &Option<String>| {
        if let Some(v) = v {
            bag.insert(k.to_string(), v.clone());
        }
    };
    set("id", &d.id);
    set("name", &d.name);
    set("className", &d.class_name);
    set("placeholder", &d.placeholder);
    set("value", &d.value);
    set("testId", &d.test_id);
    set("title", &d.title);
    set("alt", &d.alt);
    set("type", &d.r#type);
    set("role", &d.role);
    bag
}

fn build_hybrid(a: &AccessibilityElement, matched: Option<(usize, CorrelationMethod)>, dom: &[DomElement]) -> HybridElement {
    let role = a.role.clone();
    let Some((idx, method)) = matched else {
        let name = a.name.clone().unwrap_or_default();
        return HybridElement {
            ref_id: a.ref_id.clone(),
            snapshot: a.snapshot,
            role,
            name: name.clone(),
            text: name,
            disabled: a.disabled,
            checked: a.checked,
            expanded: a.expanded,
            html_attributes: HashMap::new(),
            correlation_score: CorrelationMethod::None.score(),
            correlation_method: CorrelationMethod::None,
            correlation_index: 0,
            selectors: Vec::new(),
        };
    };

    let d = &dom[idx];
    let placeholder_promoted = a.name.as_deref().is_some_and(|n| is_placeholder_name(n, &role));
    let (name, text) = if placeholder_promoted {
        let promoted = d.placeholder.clone().unwrap_or_else(|| a.name.clone().unwrap_or_default());
        (promoted.clone(), promoted)
    } else {
        let n = a.name.clone().unwrap_or_default();
        (n.clone(), n)
    };

    HybridElement {
        ref_id: a.ref_id.clone(),
        snapshot: a.snapshot,
        role,
        name,
        text,
        disabled: a.disabled || d.disabled,
        checked: a.checked || d.checked,
        expanded: a.expanded,
        html_attributes: dom_attribute_bag(d),
        correlation_score: method.score(),
        correlation_method: method,
        correlation_index: idx,
        selectors: Vec::new(),
    }
}

/// Fuse every accessibility element with its best-matching DOM element.
///
/// Every accessibility element surfaces as exactly one hybrid element, even
/// when unmatched (`correlation_method = None`, `correlation_score = 0.0`),
/// so a deterministic 1:1 trace is preserved.
pub fn correlate(accessibility: &[AccessibilityElement], dom: &[DomElement]) -> Vec<HybridElement> {
    let by_text = build_by_text_index(dom);
    let mut role_counts: HashMap<String, usize> = HashMap::new();

    accessibility
        .iter()
        .map(|a| {
            let role = a.role.to_lowercase();
            let k = *role_counts.get(&role).unwrap_or(&0);

            let matched = exact_text_match(a, &role, dom, &by_text)
                .or_else(|| partial_text_match(a, &role, dom))
                .or_else(|| position_based_match(&role, k, dom));

            *role_counts.entry(role).or_insert(0) += 1;
            build_hybrid(a, matched, dom)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnapshotId;

    fn ax(role: &str, name: &str, ref_id: &str) -> AccessibilityElement {
        AccessibilityElement {
            role: role.to_string(),
            name: Some(name.to_string()),
            ref_id: ref_id.to_string(),
            snapshot: SnapshotId(1),
            disabled: false,
            checked: false,
            expanded: false,
            attributes: HashMap::new(),
        }
    }

    fn dom_input(placeholder: &str) -> DomElement {
        DomElement {
            tag_name: "input".to_string(),
            placeholder: Some(placeholder.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn every_accessibility_element_surfaces_as_hybrid() {
        let accessibility = vec![ax("button", "Sign In", "e1"), ax("textbox", "Nonexistent", "e2")];
        let dom = vec![];
        let hybrids = correlate(&accessibility, &dom);
        assert_eq!(hybrids.len(), accessibility.len());
        assert!(hybrids.iter().all(|h| h.correlation_method == CorrelationMethod::None));
        assert!(hybrids.iter().all(|h| h.correlation_score == 0.0));
    }

    #[test]
    fn exact_text_match_wins_and_scores_one() {
        let accessibility = vec![ax("textbox", "Username", "e1")];
        let dom = vec![dom_input("Username")];
        let hybrids = correlate(&accessibility, &dom);
        assert_eq!(hybrids[0].correlation_method, CorrelationMethod::ExactTextMatch);
        assert_eq!(hybrids[0].correlation_score, 1.0);
        assert_eq!(hybrids[0].html_attributes.get("placeholder").unwrap(), "Username");
    }

    #[test]
    fn partial_text_match_used_when_no_exact_key() {
        let accessibility = vec![ax("textbox", "user", "e1")];
        let dom = vec![dom_input("Enter your username here")];
        let hybrids = correlate(&accessibility, &dom);
        assert_eq!(hybrids[0].correlation_method, CorrelationMethod::PartialTextMatch);
        assert_eq!(hybrids[0].correlation_score, 0.8);
    }

    #[test]
    fn position_based_picks_kth_compatible_role() {
        let accessibility = vec![ax("button", "", "e1"), ax("button", "", "e2")];
        let dom = vec![
            DomElement {
                tag_name: "button".to_string(),
                ..Default::default()
            },
            DomElement {
                tag_name: "button".to_string(),
                ..Default::default()
            },
        ];
        let hybrids = correlate(&accessibility, &dom);
        assert_eq!(hybrids[0].correlation_method, CorrelationMethod::PositionBased);
        assert_eq!(hybrids[0].correlation_index, 0);
        assert_eq!(hybrids[1].correlation_index, 1);
    }

    #[test]
    fn generic_position_match_excludes_divs_with_a_role_attribute() {
        let accessibility = vec![ax("generic", "", "e1")];
        let dom = vec![DomElement {
            tag_name: "div".to_string(),
            role: Some("alert".to_string()),
            ..Default::default()
        }];
        let hybrids = correlate(&accessibility, &dom);
        assert_eq!(hybrids[0].correlation_method, CorrelationMethod::None);
    }

    #[test]
    fn empty_dom_list_yields_accessibility_only_hybrids() {
        let accessibility = vec![ax("link", "Home", "e1")];
        let hybrids = correlate(&accessibility, &[]);
        assert_eq!(hybrids[0].correlation_score, 0.0);
        assert!(hybrids[0].html_attributes.is_empty());
    }
}
