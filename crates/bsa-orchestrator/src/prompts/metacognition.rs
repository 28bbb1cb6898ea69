//! Metacognition analyst prompts: reason, act, observe, expand

use bsa_core::{BusinessAnalysis, CostEstimation, ResearchResult, SolutionDesign};

/// Stage 1: decide what needs external validation
pub fn build_reason_prompt(
    company: &str,
    research: &ResearchResult,
    business: &BusinessAnalysis,
    design: &SolutionDesign,
    cost: &CostEstimation,
    language: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a Senior Delivery Strategist and Metacognition Analyst working in \
         Reason-Act-Observe steps.\n\n",
    );
    prompt.push_str("## STAGE 1: REASONING - what needs validation\n\n");
    prompt.push_str(&format!("**Client:** {}\n\n", company));

    prompt.push_str("**Available Data:**\n");
    prompt.push_str(&format!("- Research Summary: {}\n", research.summary));
    prompt.push_str(&format!(
        "- Strategic Goals: {}\n",
        research.strategic_goals.join(", ")
    ));
    prompt.push_str(&format!(
        "- Business Problem: {}\n",
        business.problem_statement
    ));
    prompt.push_str(&format!(
        "- Pain Points: {}\n",
        business.key_pain_points.join(", ")
    ));
    prompt.push_str(&format!("- Solution: {}\n", design.architecture_overview));
    prompt.push_str(&format!(
        "- Timeline: {} weeks\n",
        cost.optimal_plan.total_weeks
    ));
    prompt.push_str(&format!(
        "- Team Size: {} roles\n\n",
        cost.optimal_plan.roles.len()
    ));

    prompt.push_str("## TASK\n\n");
    prompt.push_str(
        "Reason about what to SEARCH FOR to validate the analysis:\n\
         1. Customer perspective: industry benchmarks, typical expectations, common failure modes.\n\
         2. Market context: competitor approaches and best practices.\n\
         3. Risk: common delivery risks, regulatory and compliance considerations.\n\n",
    );

    prompt.push_str("## OUTPUT (JSON)\n\n");
    prompt.push_str(
        r#"{
  "reasoning": "Chain of thought about what needs validation",
  "searchQueries": ["benchmark query", "expectation query", "risk query", "best practice query"],
  "hypotheses": {
    "customerAssumptions": ["..."],
    "deliveryRisks": ["..."],
    "tensionsToValidate": ["..."]
  }
}
"#,
    );
    prompt.push_str(&format!("\n**Language:** {}\n", language));

    prompt
}

/// Stage 2: grounded search against the hypotheses
pub fn build_act_prompt(company: &str, industry: &str, hypotheses_json: &str, language: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a Metacognition Analyst performing GROUNDED RESEARCH to validate delivery hypotheses.\n\n",
    );
    prompt.push_str(&format!("**Client:** {}\n", company));
    prompt.push_str(&format!("**Industry:** {}\n\n", industry));
    prompt.push_str("**Hypotheses to Validate:**\n");
    prompt.push_str(hypotheses_json);
    prompt.push_str("\n\n");

    prompt.push_str("## TASK\n\n");
    prompt.push_str(&format!(
        "Use Google Search to find REAL DATA about:\n\
         1. Benchmarks for cloud transformation projects in {}\n\
         2. Customer expectations and success criteria\n\
         3. Typical delivery challenges and failure modes\n\
         4. Stakeholder alignment best practices\n\n",
        industry
    ));
    prompt.push_str(
        "Synthesize findings per hypothesis as structured observations for the final analysis.\n",
    );
    prompt.push_str(&format!("\n**Language:** {}\n", language));

    prompt
}

/// Stage 3: final synthesis as a `MetacognitionAnalysis` JSON object
pub fn build_observe_prompt(
    company: &str,
    research: &ResearchResult,
    business: &BusinessAnalysis,
    design: &SolutionDesign,
    cost: &CostEstimation,
    search_findings: &str,
    language: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a Senior Delivery Strategist completing a Metacognitive Analysis with \
         validated, grounded insights.\n\n",
    );

    prompt.push_str("## CONTEXT\n\n");
    prompt.push_str(&format!("**Client:** {}\n\n", company));
    prompt.push_str(&format!("**Research Summary:**\n{}\n\n", research.summary));
    prompt.push_str(&format!(
        "**Strategic Goals:**\n{}\n\n",
        research.strategic_goals.join(", ")
    ));
    prompt.push_str(&format!(
        "**Business Problem:**\n{}\n\n",
        business.problem_statement
    ));
    prompt.push_str(&format!(
        "**Solution Overview:**\n{}\n\n",
        design.architecture_overview
    ));
    prompt.push_str(&format!(
        "**Key Components:**\n{}\n\n",
        design.key_components.join(", ")
    ));
    prompt.push_str(&format!(
        "**Timeline:** {} weeks\n**Team Size:** {} roles\n\n",
        cost.optimal_plan.total_weeks,
        cost.optimal_plan.roles.len()
    ));

    prompt.push_str("## GROUNDED SEARCH FINDINGS\n\n");
    prompt.push_str(search_findings);
    prompt.push_str("\n\n---\n\n");

    prompt.push_str("## FINAL ANALYSIS\n\n");
    prompt.push_str(
        "1. **Customer Perspective:** statedGoals, implicitAssumptions (validated against the \
         findings), riskTolerance (Low/Medium/High), organizationalConstraints, successDefinition.\n\
         2. **Provider Perspective** (the delivery team): deliveryStrengths, potentialGaps, \
         resourceConsiderations, commercialFactors, experienceRelevance.\n\
         3. **Proposal Perspective:** promisedOutcomes, implicitCommitments, scopeBoundaries, \
         dependencyAssumptions.\n\
         4. **Consonance Matrix:** score alignment 1-5 with cited reasoning for timeline, \
         budget, scope, success criteria, risk perception, change management, technical \
         complexity and post-implementation support.\n\
         5. **Dissonance Alerts:** critical misalignments with evidence; severity \
         Low/Medium/High/Critical.\n\
         6. **Tension Management:** tensions with grounded recommendations and checkpoints.\n\
         7. **Delivery Recommendations:** 5-10 actionable, grounded items.\n\n",
    );

    prompt.push_str("## OUTPUT (JSON)\n\n");
    prompt.push_str(
        r#"{
  "customerPerspective": {"statedGoals": [], "implicitAssumptions": [], "riskTolerance": "", "organizationalConstraints": [], "successDefinition": ""},
  "providerPerspective": {"deliveryStrengths": [], "potentialGaps": [], "resourceConsiderations": [], "commercialFactors": [], "experienceRelevance": ""},
  "proposalPerspective": {"promisedOutcomes": [], "implicitCommitments": [], "scopeBoundaries": [], "dependencyAssumptions": []},
  "consonanceMatrix": [{"dimension": "", "customerView": "", "proposalPromise": "", "providerCapability": "", "alignmentScore": 1, "notes": ""}],
  "dissonanceAlerts": [{"severity": "Low|Medium|High|Critical", "description": "", "customerExpectation": "", "reality": "", "mitigationStrategy": ""}],
  "tensionManagement": [{"tension": "Speed vs Quality", "leftForce": "", "rightForce": "", "currentBalance": "", "recommendation": "", "checkpoints": []}],
  "deliveryRecommendations": [],
  "groundingSources": []
}
"#,
    );
    prompt.push_str(&format!(
        "\nAll text MUST be in {}. Cite search findings for claims about industry norms and \
         say plainly where the search found no evidence.\n",
        language
    ));

    prompt
}

/// Expansion of one metacognition section
pub fn build_expand_metacognition_prompt(
    section: &str,
    current_content: &str,
    full_analysis_json: &str,
    language: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are expanding a section of a Metacognition Analysis.\n\n");
    prompt.push_str(&format!("**Section to Expand:** {}\n\n", section));
    prompt.push_str("**Current Content:**\n");
    prompt.push_str(current_content);
    prompt.push_str("\n\n**Full Analysis Context:**\n");
    prompt.push_str(full_analysis_json);
    prompt.push_str("\n\n");
    prompt.push_str(
        "Provide a comprehensive expansion with deeper analysis and cited sources, industry \
         benchmarks, concrete scenarios, actionable insights and risk mitigation.\n",
    );
    prompt.push_str(&format!(
        "Output Markdown in {}. Minimum 400 words.\n",
        language
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsa_core::WeeklyPlan;

    #[test]
    fn test_reason_prompt_summarizes_plan() {
        let cost = CostEstimation {
            optimal_plan: WeeklyPlan {
                total_weeks: 10,
                roles: vec![Default::default(), Default::default()],
                ..Default::default()
            },
            ..Default::default()
        };
        let prompt = build_reason_prompt(
            "Acme",
            &ResearchResult::default(),
            &BusinessAnalysis::default(),
            &SolutionDesign::default(),
            &cost,
            "English",
        );
        assert!(prompt.contains("- Timeline: 10 weeks"));
        assert!(prompt.contains("- Team Size: 2 roles"));
        assert!(prompt.contains("\"searchQueries\""));
    }

    #[test]
    fn test_act_prompt_uses_industry() {
        let prompt = build_act_prompt("Acme", "retail", "{\"deliveryRisks\":[]}", "English");
        assert!(prompt.contains("**Industry:** retail"));
        assert!(prompt.contains("projects in retail"));
    }
}
