//! Section expander
//!
//! Deep-dives on one named section of an artifact. Expansion never fails the
//! caller: an error turns into a placeholder text (or, for metacognition, the
//! unchanged current content).

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::architect::build_expand_design_prompt;
use crate::prompts::metacognition::build_expand_metacognition_prompt;
use crate::prompts::researcher::build_expand_research_prompt;
use crate::prompts::writer::build_expand_proposal_prompt;
use bsa_agent::normalize::extract_markdown;
use bsa_agent::GenerateRequest;
use bsa_core::{
    BusinessAnalysis, ExpandConfig, MetacognitionAnalysis, ProposalRequest, ResearchResult,
    SolutionDesign,
};
use regex::Regex;

pub const EXPANSION_ERROR: &str = "Could not expand section due to an error.";
const EMPTY_EXPANSION: &str = "Expansion failed.";

/// Subject line used when expanding the business analysis
const BUSINESS_SUBJECT: &str = "Client Business Case";

async fn expand(ctx: &StageContext, request: GenerateRequest, log: &mut ActivityLog) -> String {
    match ctx.gateway.generate(ctx.flash(), request, 1).await {
        Ok(response) => extract_markdown(response.text_or(EMPTY_EXPANSION)),
        Err(e) => {
            log.error(format!("Expansion error: {}", e));
            EXPANSION_ERROR.to_string()
        }
    }
}

/// Grounded deep-dive on a KYC section
pub async fn expand_research_section(
    ctx: &StageContext,
    company: &str,
    section: &str,
    research: &ResearchResult,
    language: &str,
    config: &ExpandConfig,
    log: &mut ActivityLog,
) -> String {
    log.thinking(format!(
        "Expanding section: {} using Google Search (Language: {})...",
        section, language
    ));
    let context = serde_json::to_string(&research.detailed_analysis).unwrap_or_default();
    let prompt = build_expand_research_prompt(company, section, &context, language, config);
    expand(ctx, GenerateRequest::text(prompt).grounded(), log).await
}

/// Grounded deep-dive on a business analysis section
pub async fn expand_business_section(
    ctx: &StageContext,
    section: &str,
    analysis: &BusinessAnalysis,
    language: &str,
    config: &ExpandConfig,
    log: &mut ActivityLog,
) -> String {
    log.thinking(format!("Expanding business section: {}...", section));
    let context = serde_json::to_string(analysis).unwrap_or_default();
    let prompt = build_expand_research_prompt(BUSINESS_SUBJECT, section, &context, language, config);
    expand(ctx, GenerateRequest::text(prompt).grounded(), log).await
}

/// Grounded deep-dive on an architecture section
pub async fn expand_design_section(
    ctx: &StageContext,
    section: &str,
    design: &SolutionDesign,
    language: &str,
    config: &ExpandConfig,
    log: &mut ActivityLog,
) -> String {
    log.thinking(format!("Expanding architecture section: {}...", section));
    let prompt = build_expand_design_prompt(section, design, language, config);
    expand(ctx, GenerateRequest::text(prompt).grounded(), log).await
}

/// Expansion text for one proposal section
pub async fn expand_proposal_section(
    ctx: &StageContext,
    section: &str,
    proposal: &str,
    business_case: &str,
    language: &str,
    config: &ExpandConfig,
    log: &mut ActivityLog,
) -> String {
    log.thinking(format!("Expanding proposal section: {}...", section));
    let prompt = build_expand_proposal_prompt(section, proposal, business_case, language, config);
    expand(ctx, GenerateRequest::text(prompt), log).await
}

/// Insert an expansion under the section's heading, or append a new section
pub fn insert_proposal_expansion(proposal: &str, section: &str, expansion: &str) -> String {
    let pattern = format!(r"(?im)^(#{{1,6}})\s+{}\s*$", regex::escape(section));
    let heading = Regex::new(&pattern).ok().and_then(|re| re.find(proposal));

    match heading {
        Some(m) => format!(
            "{}\n\n{}\n\n{}",
            &proposal[..m.end()],
            expansion,
            proposal[m.end()..].trim_start_matches('\n')
        ),
        None => format!("{}\n\n## {} (Expanded)\n{}", proposal, section, expansion),
    }
}

/// What the metacognition expander starts from for `section`
pub fn metacognition_section_content(analysis: &MetacognitionAnalysis, section: &str) -> String {
    if let Some(existing) = analysis.expanded_content.get(section) {
        if !existing.is_empty() {
            return existing.clone();
        }
    }

    let value = match section {
        "Customer Perspective" => serde_json::to_string_pretty(&analysis.customer_perspective),
        "Provider Perspective" | "Nubiral Perspective" => {
            serde_json::to_string_pretty(&analysis.provider_perspective)
        }
        "Proposal Perspective" => serde_json::to_string_pretty(&analysis.proposal_perspective),
        _ => return String::new(),
    };
    value.unwrap_or_default()
}

/// Expand one metacognition section; failure returns the current content
pub async fn expand_metacognition_section(
    ctx: &StageContext,
    request: &ProposalRequest,
    section: &str,
    analysis: &MetacognitionAnalysis,
    log: &mut ActivityLog,
) -> String {
    log.thinking(format!("[Metacognition Analyst] Expanding \"{}\"...", section));

    let current = metacognition_section_content(analysis, section);
    let full = serde_json::to_string_pretty(analysis).unwrap_or_default();
    let prompt = build_expand_metacognition_prompt(section, &current, &full, &request.language);
    let call = GenerateRequest::text(prompt).with_max_output_tokens(ctx.high_output());

    match ctx
        .gateway
        .generate(ctx.text_model_or_flash(request), call, 1)
        .await
    {
        Ok(response) => {
            log.success("[Metacognition Analyst] Section expanded successfully.");
            response.text_or(&current).to_string()
        }
        Err(e) => {
            log.error(format!("[Metacognition Analyst] Expansion failed: {}", e));
            current
        }
    }
}
