//! Context density filter
//!
//! Controls how much of the research and business analysis is forwarded into
//! the architect and writer prompts. Each level is a superset of the one below.

use bsa_core::{BusinessAnalysis, ContextDensity, ResearchResult};
use serde_json::{json, Value};

/// Characters of industry landscape kept at medium density
const INDUSTRY_CONTEXT_CHARS: usize = 300;

/// Strategic goals kept at low density
const LOW_GOAL_COUNT: usize = 3;

/// Risks kept at medium density
const MEDIUM_RISK_COUNT: usize = 5;

/// Filtered context as a JSON value
pub fn context_value(
    research: &ResearchResult,
    business: &BusinessAnalysis,
    density: ContextDensity,
) -> Value {
    let analysis = &research.detailed_analysis;

    match density {
        ContextDensity::Low => json!({
            "client_summary": research.summary,
            "strategic_goals": research.strategic_goals.iter().take(LOW_GOAL_COUNT).collect::<Vec<_>>(),
            "core_problem": business.problem_statement,
            "expected_roi": business.expected_business_value.roi,
            "key_constraints": analysis.regulatory_constraints,
        }),
        // `core_problem` and `expected_roi` live on as `problem_statement` and
        // `roi_analysis.roi`; `key_constraints` is kept so medium never drops a
        // low field
        ContextDensity::Medium => json!({
            "client_summary": research.summary,
            "strategic_goals": research.strategic_goals,
            "industry_context": truncate_with_ellipsis(&analysis.industry_landscape, INDUSTRY_CONTEXT_CHARS),
            "top_risks": analysis.challenges_and_risks.iter().take(MEDIUM_RISK_COUNT).collect::<Vec<_>>(),
            "problem_statement": business.problem_statement,
            "root_causes": business.root_cause_analysis,
            "roi_analysis": business.expected_business_value,
            "key_pain_points": business.key_pain_points,
            "hyperscaler_affinity": analysis.hyperscaler_affinity,
            "key_constraints": analysis.regulatory_constraints,
        }),
        ContextDensity::High => json!({
            "research_full": research,
            "business_analysis_full": business,
        }),
    }
}

/// Filtered context rendered as pretty JSON for prompt embedding
pub fn apply_context_filter(
    research: &ResearchResult,
    business: &BusinessAnalysis,
    density: ContextDensity,
) -> String {
    let value = context_value(research, business, density);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}
