//! Execution-cost estimator prompts

use bsa_core::CostEstimation;
use std::collections::BTreeMap;

/// Allocation percentages the estimator may use
pub const ALLOCATION_STEPS: [u32; 6] = [0, 10, 25, 50, 75, 100];

/// Rate card without design roles; the design team is not part of execution
pub fn execution_rates(rates: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    rates
        .iter()
        .filter(|(role, _)| !role.to_lowercase().contains("solution architect"))
        .map(|(role, rate)| (role.clone(), *rate))
        .collect()
}

fn allocation_steps() -> String {
    ALLOCATION_STEPS
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First estimation from the proposal's executive sections
pub fn build_estimate_prompt(
    proposal_context: &str,
    rates: &BTreeMap<String, f64>,
    language: &str,
) -> String {
    let rate_card =
        serde_json::to_string_pretty(&execution_rates(rates)).unwrap_or_else(|_| "{}".to_string());
    let mut prompt = String::new();

    prompt.push_str(
        "You are an expert Project Estimator specialized in resource optimization and team planning.\n\
         Analyze the technical proposal below and produce one well-justified OPTIMAL execution plan.\n\n",
    );
    prompt.push_str(
        "Estimate the EXECUTION team only. The solution design is already done, so do NOT \
         include Solution Architect roles. Use Cloud Engineers and DevOps Engineers for \
         cloud and infrastructure work.\n\n",
    );

    prompt.push_str("## INPUTS\n\n");
    prompt.push_str("1. Technical Proposal (below)\n");
    prompt.push_str("2. Available Execution Roles & Rates (USD/hr):\n");
    prompt.push_str(&rate_card);
    prompt.push('\n');
    prompt.push_str(&format!("3. Output Language: {}\n\n", language));

    prompt.push_str("## REQUIREMENTS\n\n");
    prompt.push_str(
        "1. **Proposed timeline:** find the work plan, schedule or GANTT in the proposal and \
         note the exact number of weeks.\n\
         2. **Optimal plan:** choose the best realistic timeline, minimize cost without \
         losing quality, keep stress between 4 and 6. Explain any difference from the proposal.\n",
    );
    prompt.push_str(&format!(
        "3. **Allocation rules:** week 1 is discovery and planning (analysts, tech leads); \
         middle weeks are core build (DevOps, cloud, backend, frontend); final weeks are QA, \
         UAT, deployment and handover. Allowed percentages: {}.\n",
        allocation_steps()
    ));
    prompt.push_str(
        "4. **Stress score (1-10) per role:** 1-3 healthy, 4-6 moderate, 7-8 high risk of \
         errors, 9-10 burnout. Give a 'note' explaining the score.\n\
         5. **Reasoning:** a detailed Markdown document covering the analysis of the original \
         proposal, the justification of every role and seniority, a phase-by-phase breakdown \
         with one `### Phase N: <name> (Weeks X-Y)` heading per phase (objectives, active roles, \
         deliverables, dependencies, risks), the comparison with the proposal, and \
         optimization recommendations.\n\n",
    );
    prompt.push_str(&format!("All text MUST be in **{}**.\n\n", language));

    prompt.push_str("## OUTPUT (PURE JSON, no code fences)\n\n");
    prompt.push_str(
        r#"{
  "optimalPlan": {
    "totalWeeks": number,
    "roles": [
      {
        "role": "Role Name",
        "hourlyRate": number,
        "allocations": {"1": 50, "2": 100},
        "stress": {"level": "Low" | "Medium" | "High" | "Extreme", "score": number, "note": "..."}
      }
    ],
    "totalCost": number,
    "reasoning": "Markdown document, minimum 800 words"
  },
  "proposalComparison": {
    "proposedWeeks": number,
    "optimalWeeks": number,
    "weeksDifference": number,
    "costDifference": number,
    "recommendation": "At least 3 paragraphs"
  }
}
"#,
    );

    prompt.push_str("\n## PROPOSAL CONTENT\n\n");
    prompt.push_str(proposal_context);
    prompt.push('\n');

    prompt
}

/// Rework of an existing estimation following a user instruction
///
/// `anchored_weeks` is the week count the refined plan must keep unless the
/// instruction explicitly changes it.
pub fn build_refine_estimate_prompt(
    current: &CostEstimation,
    instruction: &str,
    proposal: &str,
    anchored_weeks: Option<u32>,
    language: &str,
) -> String {
    let current_json =
        serde_json::to_string_pretty(current).unwrap_or_else(|_| "{}".to_string());
    let mut prompt = String::new();

    prompt.push_str("You are refining a Cost Estimation plan based on user feedback.\n");
    prompt.push_str(&format!("User Instruction: \"{}\"\n", instruction));
    prompt.push_str(&format!("Output Language: {}\n\n", language));

    prompt.push_str("## ORIGINAL PROPOSAL\n\n");
    prompt.push_str(
        "This proposal holds the definitive project timeline and WBS. Respect it; do NOT \
         invent a different number of weeks.\n\n",
    );
    prompt.push_str("--- PROPOSAL START ---\n");
    prompt.push_str(proposal);
    prompt.push_str("\n--- PROPOSAL END ---\n\n");

    if let Some(weeks) = anchored_weeks {
        prompt.push_str(&format!(
            "**TIMELINE ANCHOR:** the project lasts {} weeks. totalWeeks MUST stay {} unless \
             the user instruction explicitly changes the duration.\n\n",
            weeks, weeks
        ));
    }

    prompt.push_str("## REQUIREMENTS\n\n");
    prompt.push_str(
        "1. Keep the same JSON structure with optimalPlan and proposalComparison.\n\
         2. Apply the instruction: adjust weeks, allocations or roles as asked.\n\
         3. Recalculate totalCost as SUM(hourlyRate * hours) where hours = SUM(allocation% * 40 per week).\n\
         4. Recalculate stress scores when allocations change.\n\
         5. Rewrite 'reasoning' with a phase-by-phase rationale and explain what changed and why.\n\
         6. A removed role is dropped with its impact explained; an added role gets allocations and a justification.\n",
    );
    prompt.push_str(&format!("7. All text MUST be in **{}**.\n\n", language));

    prompt.push_str("## CURRENT ESTIMATION\n\n");
    prompt.push_str(&current_json);
    prompt.push('\n');

    prompt
}
