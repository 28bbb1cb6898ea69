//! Proposal writer prompts

use super::user_instruction;
use bsa_core::{ExpandConfig, ExpandDensity, ProposalRequest, SolutionDesign};

/// Characters of the current proposal shown to the section expander
pub const EXPAND_PROPOSAL_CONTEXT_CHARS: usize = 5000;

/// Section list of a proposal; headers are translated by the model
const PROPOSAL_SECTIONS: [&str; 11] = [
    "Professional Cover Info",
    "Executive Summary (must address the Risks and ROI)",
    "Background & Objectives",
    "Scope of Solution",
    "Solution Architecture (include a Well-Architected alignment section)",
    "Work Plan & Timeline (GANTT) with a detailed schedule of activities by phase and week",
    "Deliverables (detailed list)",
    "Roles & Dependencies",
    "Success Criteria (KPIs)",
    "Governance & Support (detailed service delivery management and SLA tiers)",
    "Legal & Commercial Terms (placeholder)",
];

/// Full technical proposal prompt
pub fn build_proposal_prompt(
    request: &ProposalRequest,
    design: &SolutionDesign,
    filtered_context: &str,
    date: &str,
    refinement_context: &str,
) -> String {
    let design_json = serde_json::to_string(design).unwrap_or_default();
    let mut prompt = String::new();

    prompt.push_str("You are a Proposal Manager writing a formal Technical Proposal.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str(&format!("- Client: {}\n", request.company_name));
    prompt.push_str(&format!("- Hyperscaler: {}\n", request.hyper_scaler));
    prompt.push_str(&format!("- **Language:** {}\n", request.language));
    prompt.push_str(&format!("- **Proposal Date:** {}\n", date));
    prompt.push_str(&format!("- Solution Design: {}\n\n", design_json));

    prompt.push_str("## FILTERED RESEARCH & BUSINESS CONTEXT\n\n");
    prompt.push_str(filtered_context);
    prompt.push_str("\n\n");
    prompt.push_str(refinement_context);

    prompt.push_str("## STRATEGY\n\n");
    prompt.push_str(
        "Consider the client's perspective using ONLY the filtered context. Show how the \
         solution mitigates the risks visible there. Tone: professional, confident, consultative.\n\n",
    );

    prompt.push_str("## EXECUTION\n\n");
    prompt.push_str(
        "Respond in Markdown with proper headers (#, ##, ###). Do NOT wrap the whole \
         response in a code block.\n\n\
         Keep later sections as dense as earlier ones: Governance, Success Criteria and \
         Deliverables get full detail. Write it as a final contract ready for signature.\n\n",
    );

    prompt.push_str("IMPORTANT:\n");
    prompt.push_str("1. Embed this Mermaid diagram in the Architecture section as a mermaid code block:\n");
    prompt.push_str("```mermaid\n");
    prompt.push_str(&design.mermaid_code);
    prompt.push_str("\n```\n");
    prompt.push_str("2. Include a Mermaid GANTT chart in the Work Plan section.\n");
    prompt.push_str(
        "3. In every Mermaid diagram, never use parentheses or brackets inside text labels.\n\n",
    );

    prompt.push_str(&format!(
        "Required Sections (translate headers to {}):\n",
        request.language
    ));
    for (i, section) in PROPOSAL_SECTIONS.iter().enumerate() {
        if i == 0 {
            prompt.push_str(&format!(
                "{}. **{}** (Title: \"Technical Proposal - {}\", Date: \"{}\")\n",
                i + 1,
                section,
                request.company_name,
                date
            ));
        } else {
            prompt.push_str(&format!("{}. **{}**\n", i + 1, section));
        }
    }
    prompt.push_str("\nNo text before or after the Markdown content.\n");

    prompt
}

/// Refinement block for a proposal rewrite
pub fn build_proposal_refinement_context(feedback: &str) -> String {
    let mut context = String::new();

    context.push_str("## REFINEMENT MODE\n\n");
    context.push_str(
        "This is an iteration of a previous proposal that had critical issues, a low \
         score, or received manual feedback.\n\n",
    );
    context.push_str(&format!("Feedback to address:\n\"{}\"\n\n", feedback));
    context.push_str(
        "Rewrite the proposal to close these gaps while keeping the parts that were \
         correct. Preserve the table of contents and every section.\n\n",
    );

    context
}

/// Expansion of one proposal section
pub fn build_expand_proposal_prompt(
    section: &str,
    current_proposal: &str,
    business_case: &str,
    language: &str,
    config: &ExpandConfig,
) -> String {
    let density = match config.density {
        ExpandDensity::Low => "Write a concise summary paragraph (approx 100 words).",
        ExpandDensity::Medium => "Write a DETAILED, high-quality expansion.",
        ExpandDensity::High => "Write an extensive, highly detailed section (approx 500-800 words).",
    };
    let excerpt: String = current_proposal
        .chars()
        .take(EXPAND_PROPOSAL_CONTEXT_CHARS)
        .collect();

    let mut prompt = String::new();
    prompt.push_str("You are a Senior Technical Proposal Writer.\n\n");
    prompt.push_str(&format!(
        "Task: Expand the section \"{}\" of the proposal.\n\n",
        section
    ));
    prompt.push_str("Context:\n");
    prompt.push_str(&format!("- Original Business Case: \"{}\"\n", business_case));
    prompt.push_str(&format!(
        "- Current Proposal (partial): {}... (truncated)\n\n",
        excerpt
    ));
    prompt.push_str(&format!(
        "Instructions:\n\
         1. {}\n\
         2. Do NOT summarize. Give specific technical details, steps or definitions.\n\
         3. Professional tone.\n\
         4. Language: {}\n\
         5. Output ONLY the content for this section, with Markdown subsections.\n\n",
        density, language
    ));
    prompt.push_str(&user_instruction(config));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_prompt_embeds_diagram_and_sections() {
        let request = ProposalRequest {
            company_name: "Acme".to_string(),
            language: "Spanish".to_string(),
            ..Default::default()
        };
        let design = SolutionDesign {
            mermaid_code: "graph LR; A-->B".to_string(),
            ..Default::default()
        };

        let prompt = build_proposal_prompt(&request, &design, "{\"x\":1}", "2026-10-18", "");

        assert!(prompt.contains("```mermaid\ngraph LR; A-->B\n```"));
        assert!(prompt.contains("Technical Proposal - Acme"));
        assert!(prompt.contains("translate headers to Spanish"));
        assert!(prompt.contains("11. **Legal & Commercial Terms (placeholder)**"));
    }

    #[test]
    fn test_expand_proposal_truncates_context() {
        let proposal = "y".repeat(6000);
        let prompt = build_expand_proposal_prompt(
            "Scope",
            &proposal,
            "Move to cloud",
            "English",
            &ExpandConfig::default(),
        );
        assert!(prompt.contains(&"y".repeat(5000)));
        assert!(!prompt.contains(&"y".repeat(5001)));
        assert!(prompt.contains("DETAILED, high-quality"));
    }
}
