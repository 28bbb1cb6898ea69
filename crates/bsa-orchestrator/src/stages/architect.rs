//! Solution architect
//!
//! Three passes: service grounding (fresh designs only), the structured design
//! call, and a diagram refinement pass that never replaces a diagram with
//! something that is not one.

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::context_filter::apply_context_filter;
use crate::prompts::architect::{
    build_design_prompt, build_design_refinement_context, build_refine_diagram_prompt,
    build_service_grounding_prompt, design_schema,
};
use bsa_agent::normalize::{extract_json, extract_markdown};
use bsa_agent::GenerateRequest;
use bsa_core::{BusinessAnalysis, ProposalRequest, ResearchResult, SolutionDesign};
use serde_json::Value;

/// Diagram of the fallback design; refinement skips it
pub const FALLBACK_DIAGRAM: &str =
    "graph TD;\nClient-->LoadBalancer;\nLoadBalancer-->AppServer;\nAppServer-->Database;";

const FALLBACK_MARKER: &str = "graph TD;\nClient-->LoadBalancer";

const NO_GROUNDING: &str = "No specific grounding data available.";

/// Characters of the model's reasoning echoed to the activity log
const THOUGHT_PREVIEW_CHARS: usize = 150;

/// Design used when the main architect call fails
pub fn fallback_design() -> SolutionDesign {
    SolutionDesign {
        architecture_overview: "High-Availability Cloud Architecture (Fallback Design)".to_string(),
        key_components: vec![
            "Managed Compute Service".to_string(),
            "Relational Database Service".to_string(),
            "Object Storage".to_string(),
            "CDN".to_string(),
        ],
        rationale: "Standard industry best practices were applied as a fallback due to an error."
            .to_string(),
        mermaid_code: FALLBACK_DIAGRAM.to_string(),
        ..Default::default()
    }
}

/// Parse the structured response, moving `thinking_process` into place
pub fn parse_design(text: &str) -> bsa_core::Result<SolutionDesign> {
    let mut value: Value = serde_json::from_str(&extract_json(text))
        .map_err(|e| bsa_core::BsaError::Parse(e.to_string()))?;

    let snake = value
        .as_object_mut()
        .and_then(|obj| obj.remove("thinking_process"));
    // schema-only field, not part of the artifact
    if let Some(obj) = value.as_object_mut() {
        obj.remove("alternatives_discarded");
    }

    let mut design: SolutionDesign =
        serde_json::from_value(value).map_err(|e| bsa_core::BsaError::Parse(e.to_string()))?;
    if let Some(Value::String(thinking)) = snake {
        if !thinking.trim().is_empty() {
            design.thinking_process = Some(thinking);
        }
    }
    Ok(design)
}

/// Inputs of one architect run
pub struct DesignInputs<'a> {
    pub request: &'a ProposalRequest,
    pub research: &'a ResearchResult,
    pub business: &'a BusinessAnalysis,
    /// Validator critique or user instruction
    pub feedback: Option<&'a str>,
    /// Design being revised, when refining
    pub current: Option<&'a SolutionDesign>,
}

async fn ground_services(
    ctx: &StageContext,
    inputs: &DesignInputs<'_>,
    log: &mut ActivityLog,
) -> String {
    let hs = inputs.request.hyper_scaler;
    log.thinking(format!(
        "[Stage 1/3] Grounding: Researching latest {} services for this case...",
        hs
    ));

    let prompt = build_service_grounding_prompt(hs, &inputs.business.problem_statement);
    let request = GenerateRequest::text(prompt).grounded();
    match ctx.gateway.generate(ctx.flash(), request, 1).await {
        Ok(response) => {
            log.info("[Stage 1/3] Grounding Complete.");
            response.text_or(NO_GROUNDING).to_string()
        }
        Err(e) => {
            tracing::warn!("Service grounding failed: {}", e);
            log.info("[Stage 1/3] Warning: Grounding failed. Using internal knowledge base.");
            NO_GROUNDING.to_string()
        }
    }
}

async fn refine_diagram(
    ctx: &StageContext,
    design: &mut SolutionDesign,
    request: &ProposalRequest,
    log: &mut ActivityLog,
) {
    if design.mermaid_code.trim().is_empty() || design.mermaid_code.contains(FALLBACK_MARKER) {
        return;
    }

    log.thinking("[Stage 3/3] Visualization: Refining Diagram for detail and layout...");
    let prompt = build_refine_diagram_prompt(
        &design.mermaid_code,
        &design.architecture_overview,
        request.hyper_scaler,
    );

    match ctx
        .gateway
        .generate(ctx.flash(), GenerateRequest::text(prompt), 1)
        .await
    {
        Ok(response) => {
            let refined = extract_markdown(response.text_or(""));
            if refined.contains("graph") || refined.contains("flowchart") {
                design.mermaid_code = refined;
                log.success("[Stage 3/3] Visualization Enhanced.");
            }
        }
        Err(e) => {
            tracing::warn!("Diagram refinement failed, keeping original: {}", e);
            log.info("[Stage 3/3] Warning: Refinement skipped. Using original diagram.");
        }
    }
}

/// Design (or revise) the solution architecture
pub async fn design_solution(
    ctx: &StageContext,
    inputs: DesignInputs<'_>,
    log: &mut ActivityLog,
) -> SolutionDesign {
    let request = inputs.request;
    log.thinking(format!(
        "[ReAct Architect] Initiating 3-Stage Design Sequence for {}...",
        request.hyper_scaler
    ));

    let grounding = match inputs.feedback {
        None => ground_services(ctx, &inputs, log).await,
        Some(_) => NO_GROUNDING.to_string(),
    };

    log.thinking(format!(
        "[Stage 2/3] Architecting: Designing solution with context density {}...",
        request.context_density.to_string().to_uppercase()
    ));

    let filtered = apply_context_filter(inputs.research, inputs.business, request.context_density);
    let refinement = match (inputs.feedback, inputs.current) {
        (Some(feedback), Some(current)) => build_design_refinement_context(feedback, current),
        _ => String::new(),
    };
    let prompt = build_design_prompt(request, &filtered, &grounding, &refinement);
    let call = GenerateRequest::text(prompt)
        .with_schema(design_schema())
        .grounded();

    let parsed = match ctx.gateway.generate(ctx.text_model(request), call, 2).await {
        Ok(response) => parse_design(response.text_or("{}")),
        Err(e) => Err(e),
    };

    let mut design = match parsed {
        Ok(design) => design,
        Err(e) => {
            log.error(format!("Error generating design: {}", e));
            return fallback_design();
        }
    };

    if let Some(thinking) = &design.thinking_process {
        let preview: String = thinking.chars().take(THOUGHT_PREVIEW_CHARS).collect();
        log.thinking(format!("[Stage 2/3] Thought Process:\n{}...", preview));
    }

    refine_diagram(ctx, &mut design, request, log).await;
    design
}
