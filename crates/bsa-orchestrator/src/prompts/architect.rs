//! Solution architect prompts and the structured-output schema

use super::{user_instruction, MERMAID_SAFETY_RULES};
use bsa_core::{ExpandConfig, HyperScaler, ProposalRequest, SolutionDesign};
use serde_json::{json, Value};

/// Pre-design grounding: current services of `hyper_scaler` for the problem
pub fn build_service_grounding_prompt(hyper_scaler: HyperScaler, problem_statement: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Role: Cloud Solutions Architect specialized in {}.\n",
        hyper_scaler
    ));
    prompt.push_str(
        "Task: Research and identify the optimal specific cloud services for the client's business case.\n\n",
    );
    prompt.push_str("Client Context:\n");
    prompt.push_str(problem_statement);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Requirements:\n\
         1. Identify the 3-4 most critical {} services that solve the core problem.\n\
         2. Check for service constraints or regional availability issues.\n\
         3. Find one modern service (GenAI, serverless) that adds high value.\n\n",
        hyper_scaler
    ));
    prompt.push_str(
        "Output: a concise bulleted list of recommended services, one-line justification each.\n",
    );

    prompt
}

/// Refinement block appended when the architect revises an existing design
pub fn build_design_refinement_context(feedback: &str, current: &SolutionDesign) -> String {
    let mut context = String::new();

    context.push_str("\n\n## REFINEMENT MODE\n\n");
    context.push_str(&format!(
        "Modify the current architecture according to this instruction: \"{}\".\n\n",
        feedback
    ));
    context.push_str(&format!(
        "**Current Architecture Overview:** {}\n",
        current.architecture_overview
    ));
    context.push_str(&format!(
        "**Current Components:** {}\n\n",
        current.key_components.join(", ")
    ));
    context.push_str(
        "Apply this feedback strictly while keeping Well-Architected alignment. \
         State in 'thinking_process' what you change and why.\n",
    );

    context
}

/// Main chain-of-thought design prompt
pub fn build_design_prompt(
    request: &ProposalRequest,
    filtered_context: &str,
    grounding: &str,
    refinement_context: &str,
) -> String {
    let hs = request.hyper_scaler;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Act as a Senior Cloud Solutions Architect specialized in {}.\n\n",
        hs
    ));
    prompt.push_str(&format!("Client: {}\n", request.company_name));
    prompt.push_str(&format!("Target Cloud Provider (HyperScaler): {}\n\n", hs));

    prompt.push_str("## FILTERED CONTEXT\n\n");
    prompt.push_str(filtered_context);
    prompt.push_str("\n\n");

    prompt.push_str("## CLOUD SERVICE RESEARCH (Grounding)\n\n");
    prompt.push_str(grounding);
    prompt.push_str("\n\n");

    prompt.push_str("## NEW OR UNKNOWN SERVICES\n\n");
    prompt.push_str(
        "If a service name is unfamiliar, do not reject it. Use Google Search to check \
         whether it is real or newly announced, and use it if it exists. Flag a service \
         only when search confirms it does not exist.\n\n",
    );

    prompt.push_str("## TASK\n\n");
    prompt.push_str(
        "Design a high-level technical solution architecture for the business case above.\n\n",
    );

    prompt.push_str("## REASONING REQUIREMENT\n\n");
    prompt.push_str(&format!(
        "Before the final architecture, write a detailed chain of thought in 'thinking_process':\n\
         1. Deconstruct requirements: key requirements, constraints (budget, timeline, skills, \
         compliance) and implicit requirements.\n\
         2. Evaluate 2-3 architectural patterns with concrete {} services, pros and cons.\n\
         3. Selection rationale mapped to the Well-Architected pillars, with accepted trade-offs.\n\
         4. Business alignment: connect each major component to a business goal.\n\n",
        hs
    ));

    prompt.push_str(MERMAID_SAFETY_RULES);
    prompt.push('\n');

    prompt.push_str("## DIAGRAM LAYOUT\n\n");
    prompt.push_str(&format!(
        "The diagram flows Left-to-Right: customer, user and on-premise systems on the left, \
         the {} solution on the right, subgraphs separating domains.\n\n",
        hs
    ));

    prompt.push_str("## WELL-ARCHITECTED ALIGNMENT\n\n");
    prompt.push_str(&format!(
        "Align explicitly with the {} Well-Architected Framework: Operational Excellence, \
         Security, Reliability, Performance Efficiency, Cost Optimization, Sustainability.\n\n",
        hs
    ));

    prompt.push_str(&format!(
        "**IMPORTANT: architectureOverview, rationale and keyComponents MUST be in: {}.**\n",
        request.language
    ));
    prompt.push_str(refinement_context);

    prompt
}

/// Second-pass prompt that upgrades a diagram's detail and layout
pub fn build_refine_diagram_prompt(
    original_code: &str,
    overview: &str,
    hyper_scaler: HyperScaler,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Act as a Visualization Expert.\n");
    prompt.push_str(
        "Refine the following Mermaid.js architecture diagram to be significantly more \
         detailed and professional.\n\n",
    );
    prompt.push_str(&format!("Cloud: {}\n", hyper_scaler));
    prompt.push_str(&format!("Architecture Overview: {}\n", overview));
    prompt.push_str("Original Code:\n");
    prompt.push_str(original_code);
    prompt.push_str("\n\n");
    prompt.push_str(MERMAID_SAFETY_RULES);
    prompt.push('\n');
    prompt.push_str(
        "Improvements Required:\n\
         1. Strict Left-to-Right layout.\n\
         2. Specific service nodes, with subgraphs for VPCs, regions or availability zones.\n\
         3. Protocol labels on links (HTTPS, gRPC, SQL).\n\
         4. A clean, modern style definition.\n\n",
    );
    prompt.push_str("Output: ONLY the raw Mermaid code. No markdown wrapper.\n");

    prompt
}

/// Deep-dive on one architecture section
pub fn build_expand_design_prompt(
    section: &str,
    design: &SolutionDesign,
    language: &str,
    config: &ExpandConfig,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Role: Senior Cloud Architect.\n");
    prompt.push_str(&format!(
        "Task: Deep dive expansion of the architecture section: \"{}\".\n\n",
        section
    ));
    prompt.push_str("Current Architecture Context:\n");
    prompt.push_str(&format!("Overview: {}\n", design.architecture_overview));
    prompt.push_str(&format!(
        "Key Components: {}\n\n",
        design.key_components.join(", ")
    ));
    prompt.push_str(&format!(
        "Provide a detailed technical breakdown of \"{}\" including:\n\
         1. Specific configuration details (instance types, retention policies).\n\
         2. Security considerations for this area.\n\
         3. Operational trade-offs.\n\
         4. Why this approach beat the alternatives.\n\n",
        section
    ));
    prompt.push_str(&user_instruction(config));
    prompt.push_str(&format!("Language: {}.\nOutput: Pure Markdown.\n", language));

    prompt
}

/// Response schema for the structured design call
pub fn design_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "thinking_process": {
                "type": "STRING",
                "description": "Verbose internal monologue (minimum 300 words): requirements, alternatives with pros and cons, selection rationale with Well-Architected alignment, trade-offs."
            },
            "alternatives_discarded": {
                "type": "STRING",
                "description": "Which alternative architectures were considered and why they were rejected (minimum 100 words)."
            },
            "architectureOverview": {
                "type": "STRING",
                "description": "A comprehensive paragraph (minimum 150 words) describing the technical approach with specific services."
            },
            "keyComponents": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Specific cloud services used in the solution."
            },
            "rationale": {
                "type": "STRING",
                "description": "Why this architecture is the best fit (minimum 200 words), citing Well-Architected pillars and business requirements."
            },
            "mermaidCode": {
                "type": "STRING",
                "description": "Valid Mermaid flowchart, LR direction, no parentheses, brackets or special characters inside node labels."
            },
            "businessMapping": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "businessGoal": { "type": "STRING", "description": "Business goal or pain point from the analysis." },
                        "technicalSolution": { "type": "STRING", "description": "Cloud component or pattern addressing it." },
                        "outcome": { "type": "STRING", "description": "Expected technical or business outcome." }
                    },
                    "required": ["businessGoal", "technicalSolution", "outcome"]
                },
                "description": "Mapping of business goals to technical solutions (minimum 3)."
            }
        },
        "required": [
            "thinking_process",
            "alternatives_discarded",
            "architectureOverview",
            "keyComponents",
            "rationale",
            "mermaidCode",
            "businessMapping"
        ]
    })
}
