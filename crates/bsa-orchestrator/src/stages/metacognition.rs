//! Metacognition analyst: reason, act, observe

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::metacognition::{build_act_prompt, build_observe_prompt, build_reason_prompt};
use bsa_agent::normalize::parse_json;
use bsa_agent::GenerateRequest;
use bsa_core::{
    BusinessAnalysis, CostEstimation, MetacognitionAnalysis, ProposalRequest,
    ResearchResult, Result, SolutionDesign,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const OBSERVE_ATTEMPTS: u32 = 2;
const OBSERVE_PAUSE: Duration = Duration::from_secs(1);
const NO_FINDINGS: &str = "No additional findings from search.";

/// Stage 1 output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hypotheses {
    pub reasoning: String,
    pub search_queries: Vec<String>,
    pub hypotheses: Value,
}

/// Every artifact the analysis reads
pub struct MetacognitionInputs<'a> {
    pub request: &'a ProposalRequest,
    pub research: &'a ResearchResult,
    pub business: &'a BusinessAnalysis,
    pub design: &'a SolutionDesign,
    pub cost: &'a CostEstimation,
}

/// Three-perspective alignment analysis with grounded validation
pub async fn analyze_metacognition(
    ctx: &StageContext,
    inputs: MetacognitionInputs<'_>,
    log: &mut ActivityLog,
) -> Result<MetacognitionAnalysis> {
    let company = inputs.request.company_name.as_str();
    let language = inputs.request.language.as_str();
    let model = ctx.text_model(inputs.request);

    log.thinking(format!(
        "[ReAct Metacognition] Starting cognitive analysis for {}...",
        company
    ));

    let result = run_stages(ctx, model, company, language, &inputs, log).await;
    if let Err(e) = &result {
        log.error(format!("[ReAct Metacognition] Error: {}", e));
    }
    result
}

async fn run_stages(
    ctx: &StageContext,
    model: &str,
    company: &str,
    language: &str,
    inputs: &MetacognitionInputs<'_>,
    log: &mut ActivityLog,
) -> Result<MetacognitionAnalysis> {
    // Reason
    log.thinking("[ReAct Metacognition] Reasoning: Identifying hypotheses and search queries...");
    let prompt = build_reason_prompt(
        company,
        inputs.research,
        inputs.business,
        inputs.design,
        inputs.cost,
        language,
    );
    let response = ctx
        .gateway
        .generate(model, GenerateRequest::text(prompt).json_mode(), 1)
        .await?;
    let hypotheses: Hypotheses = parse_json(response.text_or("{}"))?;
    log.info(format!(
        "[ReAct Metacognition] Identified {} areas requiring validation.",
        hypotheses.search_queries.len()
    ));

    // Act
    log.thinking("[ReAct Metacognition] Action: Executing grounded search for validation...");
    let landscape = &inputs.research.detailed_analysis.industry_landscape;
    let industry = if landscape.trim().is_empty() {
        "technology"
    } else {
        landscape.as_str()
    };
    let hypotheses_json = serde_json::to_string(&hypotheses.hypotheses)?;
    let prompt = build_act_prompt(company, industry, &hypotheses_json, language);
    let call = GenerateRequest::text(prompt)
        .grounded()
        .with_max_output_tokens(ctx.high_output());
    let response = ctx.gateway.generate(model, call, 1).await?;
    let findings = response.text_or(NO_FINDINGS).to_string();
    log.info("[ReAct Metacognition] Observation: Received grounded research insights.");

    // Observe
    log.thinking(
        "[ReAct Metacognition] Synthesizing: Creating final analysis with grounded insights...",
    );
    let prompt = build_observe_prompt(
        company,
        inputs.research,
        inputs.business,
        inputs.design,
        inputs.cost,
        &findings,
        language,
    );

    let mut attempt = 0;
    let analysis = loop {
        attempt += 1;
        let outcome = ctx
            .gateway
            .generate(model, GenerateRequest::text(prompt.clone()).json_mode(), 1)
            .await
            .and_then(|response| parse_json::<MetacognitionAnalysis>(response.text_or("{}")));
        match outcome {
            Ok(analysis) => break analysis,
            Err(e) if attempt >= OBSERVE_ATTEMPTS => return Err(e),
            Err(e) => {
                tracing::warn!("Metacognition synthesis failed: {}", e);
                log.info(format!(
                    "[ReAct Metacognition] Warning: JSON parsing failed in stage 3 (Attempt {}/{}). Retrying synthesis...",
                    attempt, OBSERVE_ATTEMPTS
                ));
                tokio::time::sleep(OBSERVE_PAUSE).await;
            }
        }
    };

    if analysis.consonance_matrix.is_empty() && analysis.dissonance_alerts.is_empty() {
        tracing::warn!("Metacognition analysis came back without alignment data");
    }

    log.info(format!(
        "[ReAct Metacognition] Identified {} alignment dimensions.",
        analysis.consonance_matrix.len()
    ));
    log.info(format!(
        "[ReAct Metacognition] Found {} dissonance alerts.",
        analysis.dissonance_alerts.len()
    ));
    log.info(format!(
        "[ReAct Metacognition] Mapped {} tensions to manage.",
        analysis.tension_management.len()
    ));
    log.success("[ReAct Metacognition] Analysis complete with grounded validation.");

    Ok(analysis)
}
