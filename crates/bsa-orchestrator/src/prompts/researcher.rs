//! KYC researcher and business analyst prompts

use super::user_instruction;
use bsa_core::{ExpandConfig, ExpandDensity};

/// Grounded KYC research on `company`, answered as one JSON object
pub fn build_research_prompt(company: &str, language: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Perform a deep strategic \"Know Your Customer\" (KYC) research on the company: \"{}\".\n",
        company
    ));
    prompt.push_str("The findings feed a technical proposal for this company.\n\n");

    prompt.push_str("## DIMENSIONS\n\n");
    prompt.push_str(
        "1. **Industry Landscape:** current trends, size and market dynamics.\n\
         2. **Challenges & Risks:** internal and external challenges, regulatory \
         prohibitions (GDPR, HIPAA, local financial rules) and the consequences of inaction.\n\
         3. **Stakeholders:** key decision makers (CIO, CTO) and their agenda.\n\
         4. **Hyperscaler Affinity:** current use of AWS, Azure or GCP and the relationship status.\n\
         5. **Maturity:** business capability versus global leaders, enterprise architecture, \
         and Generative AI adoption versus the industry.\n\
         6. **Competition:** global and local competitors.\n\
         7. **SWOT:** strengths, weaknesses, opportunities, threats.\n\n",
    );

    prompt.push_str(&format!(
        "**IMPORTANT: The output MUST be in the following language: {}.**\n\n",
        language
    ));

    prompt.push_str("## OUTPUT (JSON ONLY)\n\n");
    prompt.push_str(
        r#"{
  "summary": "A 2-3 sentence overview of the company.",
  "strategicGoals": ["Goal 1", "Goal 2", "Goal 3"],
  "detailedAnalysis": {
    "industryLandscape": "Industry context.",
    "challengesAndRisks": ["Challenge", "Consequence of inaction", "Regulatory prohibition"],
    "regulatoryConstraints": ["Regulation 1"],
    "keyStakeholders": ["Role - Concern"],
    "hyperscalerAffinity": "Current cloud stance.",
    "businessMaturity": "Assessment versus leaders.",
    "eaMaturity": "Enterprise architecture assessment.",
    "genAiMaturity": "Generative AI adoption assessment.",
    "competitors": {"global": ["..."], "local": ["..."]},
    "swot": {"strengths": ["..."], "weaknesses": ["..."], "opportunities": ["..."], "threats": ["..."]}
  }
}
"#,
    );

    prompt
}

/// Targeted follow-up search for one field the first pass left empty
pub fn build_repair_prompt(
    company: &str,
    missing_field: &str,
    current_data: &str,
    language: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "An earlier research pass on \"{}\" missed critical details regarding: {}.\n\n",
        company, missing_field
    ));
    prompt.push_str("## TASK\n\n");
    prompt.push_str(&format!(
        "Run a targeted search specifically for \"{}\" at {}.\n\n",
        missing_field, company
    ));
    prompt.push_str("## PREVIOUS PARTIAL DATA\n\n");
    prompt.push_str(current_data);
    prompt.push_str("\n\n");
    prompt.push_str("## OUTPUT\n\n");
    prompt.push_str(
        "Return the FULL completed JSON object with the new findings merged into the \
         existing structure. `challengesAndRisks` and `competitors` must be populated.\n",
    );
    prompt.push_str(&format!("Language: {}.\n", language));

    prompt
}

/// Deep-dive on one research or business section
///
/// `subject` is the company name, or a generic label when expanding the
/// business case.
pub fn build_expand_research_prompt(
    subject: &str,
    section: &str,
    current_context: &str,
    language: &str,
    config: &ExpandConfig,
) -> String {
    let density = match config.density {
        ExpandDensity::Low => "Provide a concise 2-paragraph summary.",
        ExpandDensity::Medium => "Provide a comprehensive report.",
        ExpandDensity::High => {
            "Provide an extremely detailed, in-depth analysis with multiple subsections."
        }
    };

    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Perform a targeted deep-dive research for \"{}\".\n",
        subject
    ));
    prompt.push_str(&format!(
        "Focus EXCLUSIVELY on the topic: \"{}\".\n\n",
        section
    ));
    prompt.push_str(&format!("Current known context: {}\n\n", current_context));
    prompt.push_str("## TASK\n\n");
    prompt.push_str(&format!(
        "1. Search for detailed, up-to-date information regarding {}.\n\
         2. {}\n\
         3. Use Markdown tables to structure data where it helps.\n\
         4. Where it helps, include a Mermaid chart (pie for market share, graph for trends).\n\n",
        section, density
    ));
    prompt.push_str(&user_instruction(config));
    prompt.push_str(&format!("**Language:** {}\n", language));
    prompt.push_str("Output format: Pure Markdown.\n");

    prompt
}

/// Business case deconstruction into drivers, pain points and value
pub fn build_business_prompt(company: &str, business_case: &str, language: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Act as a Senior Business Analyst and Digital Transformation Consultant.\n\n");
    prompt.push_str(&format!("Client: {}\n", company));
    prompt.push_str(&format!("Input Case: \"{}\"\n\n", business_case));

    prompt.push_str("## TASK\n\n");
    prompt.push_str(
        "Perform a comprehensive Business Case Analysis. Deconstruct the input into \
         concrete business drivers, pain points and value.\n\n",
    );

    prompt.push_str("## REQUIRED OUTPUT JSON\n\n");
    prompt.push_str(
        r#"{
  "problemStatement": "Clear, professional definition of the core problem.",
  "rootCauseAnalysis": ["Root Cause 1", "Root Cause 2"],
  "currentProcessFlaws": ["Inefficiency 1", "Risk 2"],
  "expectedBusinessValue": {
    "roi": "Estimated ROI or financial impact",
    "efficiencyGains": "Projected efficiency improvements",
    "otherBenefits": ["Benefit 1", "Benefit 2"]
  },
  "keyPainPoints": ["Pain 1", "Pain 2"],
  "userStories": ["As a [Role], I want [Feature] so that [Benefit]"],
  "mermaidDiagram": "A Mermaid mindmap or graph TD of the As-Is state or the problem hierarchy."
}
"#,
    );
    prompt.push_str(&format!("\n**Language:** {}\n", language));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_prompt_names_company_and_language() {
        let prompt = build_research_prompt("Acme", "Spanish");
        assert!(prompt.contains("\"Acme\""));
        assert!(prompt.contains("language: Spanish"));
        assert!(prompt.contains("\"challengesAndRisks\""));
    }

    #[test]
    fn test_expand_density_wording() {
        let low = ExpandConfig {
            density: ExpandDensity::Low,
            ..Default::default()
        };
        let high = ExpandConfig {
            density: ExpandDensity::High,
            instruction: "Add a table".to_string(),
        };

        let low_prompt = build_expand_research_prompt("Acme", "SWOT", "{}", "English", &low);
        let high_prompt = build_expand_research_prompt("Acme", "SWOT", "{}", "English", &high);

        assert!(low_prompt.contains("concise 2-paragraph"));
        assert!(!low_prompt.contains("USER INSTRUCTION"));
        assert!(high_prompt.contains("extremely detailed"));
        assert!(high_prompt.contains("**USER INSTRUCTION:** Add a table"));
    }

    #[test]
    fn test_repair_prompt_carries_partial_data() {
        let prompt = build_repair_prompt("Acme", "Competitors", r#"{"summary":"x"}"#, "English");
        assert!(prompt.contains("missed critical details regarding: Competitors"));
        assert!(prompt.contains(r#"{"summary":"x"}"#));
    }
}
