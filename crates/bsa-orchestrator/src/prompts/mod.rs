//! Prompt builders for every pipeline agent
//!
//! Builders are pure string functions so each prompt can be asserted on in
//! tests without a model. One submodule per agent.

pub mod architect;
pub mod estimator;
pub mod expert;
pub mod metacognition;
pub mod researcher;
pub mod visualizer;
pub mod writer;

use bsa_core::{ExpandConfig, ExpandedContent};

/// Diagram syntax rules shared by the architect and diagram refiner
pub(crate) const MERMAID_SAFETY_RULES: &str = "\
**MERMAID SYNTAX RULES (the renderer rejects diagrams that break them):**
1. No parentheses ( ) inside node labels. Write A[API Gateway v2], not A[API Gateway (v2)].
2. No square brackets [ ] inside labels.
3. No curly braces { } inside labels except for diamond node syntax.
4. No quotes inside labels.
5. Labels use only letters, digits, spaces, hyphens and underscores.
6. Spell out special characters: E[Cost under 100 USD], not E[Cost < $100].
7. Architecture diagrams flow Left-to-Right (graph LR).
";

/// `**USER INSTRUCTION:** ...` block, empty when there is no instruction
pub(crate) fn user_instruction(config: &ExpandConfig) -> String {
    if config.instruction.trim().is_empty() {
        String::new()
    } else {
        format!("**USER INSTRUCTION:** {}\n\n", config.instruction.trim())
    }
}

/// Previously expanded sections rendered for inclusion in a prompt
pub(crate) fn expanded_sections(content: &ExpandedContent) -> String {
    content
        .iter()
        .map(|(section, text)| format!("### {} (Expanded):\n{}", section, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `a, b, c` or `N/A` for an empty list
pub(crate) fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}
