//! The in-page DOM-walk contract (§4.C.1) and its result parsing.

use crate::types::{BoundingBox, DomElement, DynamicType, PageInfo};

/// Evaluated in-page via `browser_evaluate`. Selects elements that have a
/// `role`, are natively interactive, carry an id/test-id, or are a visible
/// container with content, and emits the full attribute bag plus the
/// dynamic-element classification.
pub const DOM_WALK_SCRIPT: &str = r#"(() => {
  const interactive = new Set(['input','button','select','textarea','a','form']);
  const containers = new Set(['div','span','section','article','aside','main','nav','header','footer']);
  const testIdAttrs = ['data-testid','data-cy','data-qa'];
  const dynamicAttrs = ['data-testid','data-cy','data-qa','aria-live','onclick','onchange'];

  const results = [];
  document.querySelectorAll('*').forEach((el) => {
    const tag = el.tagName.toLowerCase();
    const role = el.getAttribute('role');
    const hasId = !!el.id;
    const hasTestId = testIdAttrs.some((a) => el.hasAttribute(a));
    const isContainer = containers.has(tag) && (el.textContent || '').trim().length > 0;
    if (!(role || interactive.has(tag) || hasId || hasTestId || isContainer)) return;

    const rect = el.getBoundingClientRect();
    const isDynamic = dynamicAttrs.some((a) => el.hasAttribute(a));
    let dynamicType = 'standard';
    if (el.hasAttribute('aria-live')) dynamicType = 'live-region';
    else if (hasTestId) dynamicType = 'test-target';
    else if (el.hasAttribute('onclick') || el.hasAttribute('onchange')) dynamicType = 'interactive';

    results.push({
      tagName: tag,
      type: el.getAttribute('type'),
      id: el.id || null,
      name: el.getAttribute('name'),
      className: el.className || null,
      placeholder: el.getAttribute('placeholder'),
      value: el.value !== undefined ? String(el.value) : null,
      textContent: (el.textContent || '').trim().slice(0, 500),
      innerText: (el.innerText || '').trim().slice(0, 500),
      ariaLabel: el.getAttribute('aria-label'),
      role: role,
      testId: el.getAttribute('data-testid') || el.getAttribute('data-cy') || el.getAttribute('data-qa'),
      disabled: !!el.disabled,
      required: !!el.required,
      readonly: !!el.readOnly,
      checked: !!el.checked,
      boundingBox: { x: rect.x, y: rect.y, w: rect.width, h: rect.height },
      isDynamic,
      dynamicType,
      title: el.getAttribute('title'),
      alt: el.getAttribute('alt'),
    });
  });
  return JSON.stringify(results);
})()"#;

/// Evaluated in-page to obtain `{url, title}` for `PageContext::page_info`.
pub const PAGE_INFO_SCRIPT: &str = r#"(() => JSON.stringify({url: location.href, title: document.title}))()"#;

#[derive(Debug, serde::Deserialize)]
struct RawDomElement {
    #[serde(rename = "tagName")]
    tag_name: String,
    r#type: Option<String>,
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "className")]
    class_name: Option<String>,
    placeholder: Option<String>,
    value: Option<String>,
    #[serde(rename = "textContent")]
    text_content: Option<String>,
    #[serde(rename = "innerText")]
    inner_text: Option<String>,
    #[serde(rename = "ariaLabel")]
    aria_label: Option<String>,
    role: Option<String>,
    #[serde(rename = "testId")]
    test_id: Option<String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    checked: bool,
    #[serde(rename = "boundingBox")]
    bounding_box: Option<BoundingBox>,
    #[serde(rename = "isDynamic", default)]
    is_dynamic: bool,
    #[serde(rename = "dynamicType")]
    dynamic_type: Option<String>,
    title: Option<String>,
    alt: Option<String>,
}

fn dynamic_type_from_str(s: Option<&str>) -> Option<DynamicType> {
    match s {
        Some("live-region") => Some(DynamicType::LiveRegion),
        Some("interactive") => Some(DynamicType::Interactive),
        Some("test-target") => Some(DynamicType::TestTarget),
        Some("standard") => Some(DynamicType::Standard),
        _ => None,
    }
}

/// Parse the `browser_evaluate(DOM_WALK_SCRIPT)` result.
///
/// `Error:`-prefixed payloads (a failed in-page evaluation) degrade to an
/// empty list rather than propagating, per §4.C's failure semantics.
pub fn parse_dom_elements(text: &str) -> Vec<DomElement> {
    if text.trim_start().starts_with("Error:") {
        return Vec::new();
    }
    let Some(value) = crate::parser::try_parse_json(text) else {
        return Vec::new();
    };
    let Ok(raw) = serde_json::from_value::<Vec<RawDomElement>>(value) else {
        return Vec::new();
    };
    raw.into_iter()
        .map(|r| DomElement {
            tag_name: r.tag_name,
            r#type: r.r#type,
            id: r.id,
            name: r.name,
            class_name: r.class_name,
            placeholder: r.placeholder,
            value: r.value,
            text_content: r.text_content,
            inner_text: r.inner_text,
            aria_label: r.aria_label,
            role: r.role,
            test_id: r.test_id,
            disabled: r.disabled,
            required: r.required,
            readonly: r.readonly,
            checked: r.checked,
            bounding_box: r.bounding_box,
            is_dynamic: r.is_dynamic,
            dynamic_type: dynamic_type_from_str(r.dynamic_type.as_deref()),
            title: r.title,
            alt: r.alt,
        })
        .collect()
}

/// Parse the `browser_evaluate(PAGE_INFO_SCRIPT)` result.
pub fn parse_page_info(text: &str) -> PageInfo {
    let now = chrono::Utc::now();
    let Some(value) = crate::parser::try_parse_json(text) else {
        return PageInfo {
            url: String::new(),
            title: String::new(),
            timestamp: now,
        };
    };
    PageInfo {
        url: value
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        title: value
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_prefixed_payload_yields_empty_elements() {
        assert!(parse_dom_elements("Error: evaluation failed").is_empty());
    }

    #[test]
    fn malformed_payload_degrades_to_empty_elements() {
        assert!(parse_dom_elements("not json").is_empty());
    }

    #[test]
    fn well_formed_payload_parses_dynamic_type() {
        let payload = r#"[{"tagName":"div","type":null,"id":null,"name":null,"className":null,
            "placeholder":null,"value":null,"textContent":"Invalid credentials","innerText":"Invalid credentials",
            "ariaLabel":null,"role":"alert","testId":null,"disabled":false,"required":false,"readonly":false,
            "checked":false,"boundingBox":{"x":0.0,"y":0.0,"w":10.0,"h":10.0},"isDynamic":true,
            "dynamicType":"live-region","title":null,"alt":null}]"#;
        let elements = parse_dom_elements(payload);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].dynamic_type, Some(DynamicType::LiveRegion));
        assert!(elements[0].is_dynamic);
    }

    #[test]
    fn page_info_parses_url_and_title() {
        let info = parse_page_info(r#"{"url":"https://app.test/login","title":"Sign in"}"#);
        assert_eq!(info.url, "https://app.test/login");
        assert_eq!(info.title, "Sign in");
    }
}
