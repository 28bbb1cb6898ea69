//! Image prompts for the cover and the five infographics

use super::{expanded_sections, join_or_na};
use bsa_core::{
    BusinessAnalysis, CostEstimation, HyperScaler, MetacognitionAnalysis, ResearchResult,
    SolutionDesign,
};

/// Story behind the proposal cover
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverContext {
    pub summary: String,
    pub business_case: String,
    pub strategic_goals: Vec<String>,
    pub hyper_scaler: Option<HyperScaler>,
    pub problem_statement: String,
}

fn palette(hyper_scaler: Option<HyperScaler>) -> &'static str {
    match hyper_scaler {
        Some(HyperScaler::Aws) => "Orange, Black, White",
        Some(HyperScaler::Gcp) => "Blue, Green, Yellow, Red",
        Some(HyperScaler::Azure) => "Blue, Teal, Purple",
        _ => "Blue, Cyan, White",
    }
}

/// Append a regeneration instruction to any image prompt
pub fn with_instruction(mut prompt: String, instruction: &str) -> String {
    if !instruction.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\n**CRITICAL MODIFICATION INSTRUCTION:** {}\nAdjust the image strictly according to this modification.",
            instruction.trim()
        ));
    }
    prompt
}

/// Abstract, text-free cover image
pub fn build_cover_prompt(company: &str, context: &CoverContext) -> String {
    let goals = if context.strategic_goals.is_empty() {
        "Digital Transformation".to_string()
    } else {
        context
            .strategic_goals
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let cloud = context
        .hyper_scaler
        .map(|hs| hs.to_string())
        .unwrap_or_else(|| "Cloud".to_string());
    let vision = [&context.business_case, &context.problem_statement]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| "Business Optimization".to_string());

    let mut prompt = String::new();
    prompt.push_str("Create a visionary, premium corporate cover image for a technology proposal.\n\n");
    prompt.push_str("**The Story to Visualize:**\n");
    prompt.push_str(&format!("- Company: {}\n", company));
    prompt.push_str(&format!("- Transformation Goal: {}\n", goals));
    prompt.push_str(&format!("- Business Challenge Being Solved: {}\n", vision));
    prompt.push_str(&format!("- Future Enabled By: {} cloud technology\n\n", cloud));
    prompt.push_str(
        "**Visual Direction:** an abstract, inspirational picture of the successful future \
         state: digital transformation, growth, innovation and the journey from today's \
         challenges to a bright future.\n\n",
    );
    prompt.push_str(&format!(
        "**Style:** premium and executive-level, abstract rather than literal, modern \
         gradients and technology motifs with subtle cloud and data-flow elements, \
         {} tones, polished 4K quality.\n\n",
        palette(context.hyper_scaler)
    ));
    prompt.push_str(
        "**Critical Rules:** NO TEXT, NO LOGOS, NO WORDS. No literal people, offices or computers.\n",
    );

    prompt
}

/// Corporate intelligence infographic from the KYC research
pub fn build_kyc_infographic_prompt(company: &str, research: &ResearchResult, language: &str) -> String {
    let analysis = &research.detailed_analysis;
    let swot = analysis.swot.clone().unwrap_or_default();
    let expanded = expanded_sections(&research.expanded_content);

    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Create a professional corporate intelligence infographic for \"{}\".\n\n",
        company
    ));
    prompt.push_str("**Data to Visualize:**\n");
    prompt.push_str(&format!("- Company Summary: {}\n", research.summary));
    prompt.push_str(&format!(
        "- Strategic Goals: {}\n",
        research.strategic_goals.join(", ")
    ));
    prompt.push_str("- SWOT Analysis:\n");
    prompt.push_str(&format!("  * Strengths: {}\n", join_or_na(&swot.strengths)));
    prompt.push_str(&format!("  * Weaknesses: {}\n", join_or_na(&swot.weaknesses)));
    prompt.push_str(&format!(
        "  * Opportunities: {}\n",
        join_or_na(&swot.opportunities)
    ));
    prompt.push_str(&format!("  * Threats: {}\n", join_or_na(&swot.threats)));
    prompt.push_str(&format!(
        "- Competitors (Global): {}\n",
        join_or_na(&analysis.competitors.global)
    ));
    prompt.push_str(&format!(
        "- Competitors (Local): {}\n",
        join_or_na(&analysis.competitors.local)
    ));
    prompt.push_str(&format!(
        "- Cloud Affinity: {}\n",
        analysis.hyperscaler_affinity
    ));
    prompt.push_str(&format!("- GenAI Maturity: {}\n\n", analysis.gen_ai_maturity));

    if !expanded.is_empty() {
        prompt.push_str("**ADDITIONAL EXPANDED INSIGHTS (include these):**\n");
        prompt.push_str(&expanded);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "**Style:** high-end corporate dashboard, a prominent SWOT quadrant, competitor \
         positioning, professional blues, teals and whites, clean data-driven typography.\n\n",
    );
    prompt.push_str(&format!(
        "**Language:** all labels and annotations in {}.\n",
        language
    ));

    prompt
}

/// Problem-to-value infographic from the business analysis
pub fn build_business_infographic_prompt(analysis: &BusinessAnalysis, language: &str) -> String {
    let value = &analysis.expected_business_value;
    let expanded = expanded_sections(&analysis.expanded_content);

    let mut prompt = String::new();
    prompt.push_str("Create a business case analysis infographic.\n\n");
    prompt.push_str("**Data to Visualize:**\n");
    prompt.push_str(&format!("- Core Problem: {}\n", analysis.problem_statement));
    prompt.push_str(&format!(
        "- Root Causes: {}\n",
        analysis.root_cause_analysis.join(", ")
    ));
    prompt.push_str(&format!(
        "- Key Pain Points: {}\n",
        analysis.key_pain_points.join(", ")
    ));
    prompt.push_str(&format!("- Expected ROI: {}\n", value.roi));
    prompt.push_str(&format!("- Efficiency Gains: {}\n", value.efficiency_gains));
    prompt.push_str(&format!(
        "- Additional Benefits: {}\n\n",
        value.other_benefits.join(", ")
    ));

    if !expanded.is_empty() {
        prompt.push_str("**ADDITIONAL EXPANDED INSIGHTS (include these):**\n");
        prompt.push_str(&expanded);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "**Style:** problem-to-solution flow, ROI highlighted with upward trend graphics, \
         pain point icons, root causes as a fishbone or tree, growth greens and blues, \
         executive-ready.\n\n",
    );
    prompt.push_str(&format!(
        "**Language:** all labels and annotations in {}.\n",
        language
    ));

    prompt
}

/// Solution architecture infographic
pub fn build_architecture_infographic_prompt(
    design: &SolutionDesign,
    hyper_scaler: HyperScaler,
    language: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("Create a cloud architecture solution infographic.\n\n");
    prompt.push_str("**Data to Visualize:**\n");
    prompt.push_str(&format!("- Cloud Provider: {}\n", hyper_scaler));
    prompt.push_str(&format!(
        "- Architecture Overview: {}\n",
        design.architecture_overview
    ));
    prompt.push_str(&format!(
        "- Key Components: {}\n",
        design.key_components.join(", ")
    ));
    prompt.push_str(&format!("- Design Rationale: {}\n\n", design.rationale));
    prompt.push_str(&format!(
        "**Style:** isometric or flat connected nodes showing component relationships, \
         {} iconography style, Well-Architected pillars as badges, cloud blues and purples \
         with accent highlights.\n\n",
        hyper_scaler
    ));
    prompt.push_str(&format!(
        "**Language:** all labels and annotations in {}.\n",
        language
    ));

    prompt
}

/// `$1,234,567` style amount, rounded to whole dollars
pub fn format_usd(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Execution cost dashboard
pub fn build_cost_infographic_prompt(estimation: &CostEstimation, language: &str) -> String {
    let plan = &estimation.optimal_plan;
    let roles = plan
        .roles
        .iter()
        .map(|r| r.role.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str("Create a professional project execution cost infographic.\n\n");
    prompt.push_str("**Data to Visualize:**\n");
    prompt.push_str(&format!("- Optimal Plan Timeline: {} weeks\n", plan.total_weeks));
    prompt.push_str(&format!("- Total Investment: {}\n", format_usd(plan.total_cost)));
    prompt.push_str(&format!("- Team Composition: {}\n", roles));

    let mut highlight_difference = true;
    if let Some(comparison) = &estimation.proposal_comparison {
        let delta = if comparison.weeks_difference > 0 {
            format!("Saved {} weeks", comparison.weeks_difference)
        } else {
            format!("Added {} weeks for quality", comparison.weeks_difference.abs())
        };
        prompt.push_str(&format!(
            "- Proposal Comparison: {} weeks proposed -> {} weeks optimized ({})\n",
            comparison.proposed_weeks, comparison.optimal_weeks, delta
        ));
        prompt.push_str(&format!(
            "- Optimization Insight: {}\n",
            comparison.recommendation
        ));
        highlight_difference = comparison.weeks_difference != 0;
    }
    prompt.push('\n');

    prompt.push_str(
        "**Visual Elements:**\n\
         - Horizontal Gantt-style timeline\n\
         - Role allocation heatmap of weekly intensity\n\
         - Cost breakdown by phase or role (pie or donut)\n\
         - Key metrics: total weeks, total cost, team size\n",
    );
    if highlight_difference {
        prompt.push_str("- A callout highlighting the optimization difference\n");
    }
    prompt.push('\n');
    prompt.push_str(
        "**Style:** project management dashboard, professional blues with green for \
         efficiency gains, data-dense, no placeholder text.\n\n",
    );
    prompt.push_str(&format!(
        "**Language:** all labels and annotations in {}.\n",
        language
    ));

    prompt
}

/// Three-perspective alignment infographic
pub fn build_metacognition_infographic_prompt(
    analysis: &MetacognitionAnalysis,
    company: &str,
    language: &str,
) -> String {
    let consonances = analysis
        .consonance_matrix
        .iter()
        .filter(|c| c.alignment_score >= 4)
        .count();
    let dissonances = analysis.dissonance_alerts.len();
    let critical = analysis
        .dissonance_alerts
        .iter()
        .filter(|d| d.severity == "Critical" || d.severity == "High")
        .count();
    let tensions = analysis.tension_management.len();

    let mut prompt = String::new();
    prompt.push_str(
        "Create a strategic Metacognition Analysis infographic for a cloud project proposal.\n\n",
    );
    prompt.push_str(&format!("- Client: {}\n", company));
    prompt.push_str(
        "- The analysis maps alignments and gaps across the Customer, Provider (delivery \
         team) and Proposal perspectives\n\n",
    );
    prompt.push_str("**Key Metrics:**\n");
    prompt.push_str(&format!("- Strong alignments: {}\n", consonances));
    prompt.push_str(&format!("- Identified gaps: {}\n", dissonances));
    prompt.push_str(&format!("- Critical or high severity alerts: {}\n", critical));
    prompt.push_str(&format!("- Tensions to manage: {}\n\n", tensions));
    prompt.push_str(
        "**Visual Concept:** a Venn diagram of CUSTOMER (teal), PROPOSAL (blue) and \
         PROVIDER (purple). The center is the full alignment zone, pairwise overlaps are \
         partial consonance, outer edges are dissonance zones. Add alignment heat \
         indicators, tension balance icons, alert badges and recommendation callouts.\n\n",
    );
    prompt.push_str(
        "**Style:** executive consulting quality, steering-committee ready, teals, blues \
         and purples, no placeholder text.\n\n",
    );
    prompt.push_str(&format!("**Language:** all labels in {}.\n", language));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsa_core::{ConsonanceItem, DissonanceAlert, ProposalComparison, WeeklyPlan};

    #[test]
    fn test_cover_prompt_palette_and_fallbacks() {
        let context = CoverContext {
            hyper_scaler: Some(HyperScaler::Aws),
            problem_statement: "Slow checkout".to_string(),
            ..Default::default()
        };
        let prompt = build_cover_prompt("Acme", &context);
        assert!(prompt.contains("Orange, Black, White"));
        assert!(prompt.contains("Transformation Goal: Digital Transformation"));
        assert!(prompt.contains("Challenge Being Solved: Slow checkout"));
        assert!(prompt.contains("NO TEXT"));
    }

    #[test]
    fn test_instruction_modifier() {
        let prompt = with_instruction("base".to_string(), "darker");
        assert!(prompt.ends_with("Adjust the image strictly according to this modification."));
        assert_eq!(with_instruction("base".to_string(), " "), "base");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1234567.0), "$1,234,567");
    }

    #[test]
    fn test_cost_prompt_comparison() {
        let estimation = CostEstimation {
            optimal_plan: WeeklyPlan {
                total_weeks: 10,
                total_cost: 52000.0,
                ..Default::default()
            },
            proposal_comparison: Some(ProposalComparison {
                proposed_weeks: 12,
                optimal_weeks: 10,
                weeks_difference: 2,
                ..Default::default()
            }),
            is_dirty: None,
        };
        let prompt = build_cost_infographic_prompt(&estimation, "English");
        assert!(prompt.contains("Total Investment: $52,000"));
        assert!(prompt.contains("12 weeks proposed -> 10 weeks optimized (Saved 2 weeks)"));
        assert!(prompt.contains("callout"));
    }

    #[test]
    fn test_metacognition_counts() {
        let analysis = MetacognitionAnalysis {
            consonance_matrix: vec![
                ConsonanceItem {
                    alignment_score: 5,
                    ..Default::default()
                },
                ConsonanceItem {
                    alignment_score: 2,
                    ..Default::default()
                },
            ],
            dissonance_alerts: vec![
                DissonanceAlert {
                    severity: "High".to_string(),
                    ..Default::default()
                },
                DissonanceAlert {
                    severity: "Low".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let prompt = build_metacognition_infographic_prompt(&analysis, "Acme", "English");
        assert!(prompt.contains("Strong alignments: 1"));
        assert!(prompt.contains("Identified gaps: 2"));
        assert!(prompt.contains("high severity alerts: 1"));
    }
}
