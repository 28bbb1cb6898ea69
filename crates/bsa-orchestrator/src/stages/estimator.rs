//! Execution cost estimator
//!
//! Unlike the other stages the estimator has no fallback artifact: a failed
//! call or an unparseable plan is returned to the caller.

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::estimator::{build_estimate_prompt, build_refine_estimate_prompt};
use bsa_agent::normalize::{parse_json, strip_images_for_context};
use bsa_agent::GenerateRequest;
use bsa_core::{CostEstimation, ProposalRequest, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn commercial_cutoff() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)##\s*7\.").expect("valid regex"))
}

fn week_mention() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(semanas?|weeks?)").expect("valid regex"))
}

fn duration_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(weeks?|semanas?)\b").expect("valid regex"))
}

/// Proposal text the estimator sees: no inline images, nothing from `## 7.` on
pub fn estimation_context(proposal: &str) -> String {
    let stripped = strip_images_for_context(proposal);
    match commercial_cutoff().find(&stripped) {
        Some(m) => stripped[..m.start()].to_string(),
        None => stripped,
    }
}

/// Every `N weeks` / `N semanas` mention, in order
pub fn week_mentions(text: &str) -> Vec<u32> {
    week_mention()
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect()
}

/// Project length stated by the proposal: its longest week mention
pub fn proposal_weeks(proposal: &str) -> Option<u32> {
    week_mentions(proposal).into_iter().filter(|w| *w > 0).max()
}

fn fill_cost(mut estimation: CostEstimation) -> CostEstimation {
    if estimation.optimal_plan.total_cost <= 0.0 && !estimation.optimal_plan.roles.is_empty() {
        estimation.optimal_plan.total_cost = estimation.optimal_plan.computed_total_cost();
    }
    estimation
}

/// First estimation from the proposal
pub async fn generate_cost_estimation(
    ctx: &StageContext,
    request: &ProposalRequest,
    proposal: &str,
    rates: &BTreeMap<String, f64>,
    log: &mut ActivityLog,
) -> Result<CostEstimation> {
    log.thinking("[Cost Estimator] Analyzing proposal timeline and assigning roles...");

    let context = estimation_context(proposal);
    log.info(
        "[Cost Estimator] Context filtered to relevant sections (Executive Summary, Solution, Timeline).",
    );
    log.thinking(format!(
        "[Cost Estimator] Estimating Payload: {} chars (~{} tokens).",
        context.len(),
        context.len().div_ceil(4)
    ));

    let mentions: Vec<String> = week_mention()
        .find_iter(&context)
        .map(|m| m.as_str().to_string())
        .collect();
    if !mentions.is_empty() {
        log.thinking(format!(
            "[Cost Estimator] Week mentions in proposal: {}",
            mentions.join(", ")
        ));
    }

    let prompt = build_estimate_prompt(&context, rates, &request.language);
    let call = GenerateRequest::text(prompt).json_mode();
    let estimation = ctx
        .gateway
        .generate(ctx.text_model_or_flash(request), call, 1)
        .await
        .and_then(|response| parse_json::<CostEstimation>(response.text_or("{}")));

    match estimation {
        Ok(estimation) => {
            let estimation = fill_cost(estimation);
            log.info(format!(
                "[Cost Estimator] Estimation complete. Optimal plan: {} weeks.",
                estimation.optimal_plan.total_weeks
            ));
            if let Some(comparison) = &estimation.proposal_comparison {
                log.thinking(format!(
                    "[Cost Estimator] Proposal weeks: {}, optimal weeks: {}",
                    comparison.proposed_weeks, comparison.optimal_weeks
                ));
            }
            Ok(estimation)
        }
        Err(e) => {
            log.error(format!("Cost Estimation failed: {}", e));
            Err(e)
        }
    }
}

/// Rework an estimation following a user instruction
pub async fn refine_cost_estimation(
    ctx: &StageContext,
    request: &ProposalRequest,
    current: &CostEstimation,
    instruction: &str,
    proposal: &str,
    log: &mut ActivityLog,
) -> Result<CostEstimation> {
    let model = ctx.text_model_or_flash(request);
    log.thinking(format!(
        "[Cost Estimator] Refining plan (Model: {}): \"{}\"...",
        model, instruction
    ));

    let context = strip_images_for_context(proposal);
    let anchored = proposal_weeks(&context).or_else(|| {
        let weeks = current.optimal_plan.total_weeks;
        (weeks > 0).then_some(weeks)
    });

    let prompt =
        build_refine_estimate_prompt(current, instruction, &context, anchored, &request.language);
    let refined = ctx
        .gateway
        .generate(model, GenerateRequest::text(prompt).json_mode(), 1)
        .await
        .and_then(|response| parse_json::<CostEstimation>(response.text_or("{}")));

    match refined {
        Ok(refined) => {
            let refined = fill_cost(refined);
            if let Some(weeks) = anchored {
                let new_weeks = refined.optimal_plan.total_weeks;
                if new_weeks != weeks && !duration_keyword().is_match(instruction) {
                    log.info(format!(
                        "[Cost Estimator] Warning: refined plan changed the timeline from {} to {} weeks without being asked to.",
                        weeks, new_weeks
                    ));
                }
            }
            Ok(refined)
        }
        Err(e) => {
            log.error(format!("Cost Refinement failed: {}", e));
            Err(e)
        }
    }
}
