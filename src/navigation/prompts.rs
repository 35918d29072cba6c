//! Prompt construction for the Navigation Decision Prompt (§4.F step 2).

use crate::types::PageContext;

const MAX_INTERACTIVE_ELEMENTS: usize = 40;

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "textbox", "combobox", "checkbox", "radio", "tab", "menuitem", "option", "slider",
];

fn is_interactive(role: &str) -> bool {
    INTERACTIVE_ROLES.contains(&role)
}

/// Render the current user-story step, the interactive elements available
/// on the page, and navigation history into the prompt handed to
/// `LlmBackend::decide_next_action`.
pub fn build_navigation_decision_prompt(user_step_text: &str, context: &PageContext, history: &[String]) -> String {
    let mut out = String::new();
    out.push_str("## Current step\n");
    out.push_str(user_step_text);
    out.push_str("\n\n## Interactive elements\n");

    for h in context
        .hybrid_elements
        .iter()
        .filter(|h| is_interactive(&h.role) || !h.ref_id.is_empty())
        .take(MAX_INTERACTIVE_ELEMENTS)
    {
        let top_selector = h
            .selectors
            .first()
            .map(|s| format!("{:?}({})", s.kind, s.value))
            .unwrap_or_default();
        out.push_str(&format!(
            "- role={} name={:?} ref={} disabled={} top_selector={}\n",
            h.role, h.name, h.ref_id, h.disabled, top_selector
        ));
    }

    out.push_str("\n## Navigation history\n");
    if history.is_empty() {
        out.push_str("(none yet)\n");
    } else {
        for (i, line) in history.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, line));
        }
    }

    out
}

/// Render the Test Generation Prompt (§4.G) from the completed exploration.
pub fn build_test_generation_prompt(
    user_story: &[String],
    final_url: &str,
    interaction_elements: &[crate::types::HybridElement],
    history: &[String],
    console_tail: &[String],
    network_tail: &[String],
) -> String {
    let mut out = String::new();
    out.push_str("## User story\n");
    for step in user_story {
        out.push_str("- ");
        out.push_str(step);
        out.push('\n');
    }
    out.push_str(&format!("\n## Final URL\n{final_url}\n"));

    out.push_str("\n## Interaction elements\n");
    for h in interaction_elements {
        out.push_str(&format!("- role={} name={:?} selectors={:?}\n", h.role, h.name, h.selectors));
    }

    out.push_str("\n## Navigation history\n");
    for line in history {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("\n## Console tail\n");
    for line in console_tail {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("\n## Network tail\n");
    for line in network_tail {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }

    out
}
