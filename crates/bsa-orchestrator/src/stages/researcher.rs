//! KYC researcher
//!
//! Reason, act, validate: one grounded search, a sparseness check, and at most
//! one targeted repair search whose keys overwrite the first pass.

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::researcher::{build_repair_prompt, build_research_prompt};
use bsa_agent::normalize::{extract_json, from_value_lenient, merge_shallow};
use bsa_agent::GenerateRequest;
use bsa_core::{Competitors, DetailedAnalysis, ResearchResult, Source, Swot};
use serde_json::{Map, Value};

const RESEARCH_RETRIES: u32 = 2;
const REPAIR_RETRIES: u32 = 1;

/// Research used when the primary search fails outright
pub fn fallback_research(company: &str) -> ResearchResult {
    ResearchResult {
        summary: format!("Could not retrieve real-time data for {}.", company),
        strategic_goals: vec![
            "Digital Transformation".to_string(),
            "Operational Efficiency".to_string(),
        ],
        detailed_analysis: DetailedAnalysis {
            industry_landscape: "General Industry".to_string(),
            challenges_and_risks: vec![
                "Legacy Systems".to_string(),
                "Cost of Inaction: High operational costs".to_string(),
            ],
            key_stakeholders: vec!["CIO".to_string(), "CTO".to_string()],
            hyperscaler_affinity: "Unknown".to_string(),
            business_maturity: "Average".to_string(),
            ea_maturity: "Low AI Adoption".to_string(),
            gen_ai_maturity: "Low".to_string(),
            competitors: Competitors::default(),
            swot: Some(Swot::default()),
            regulatory_constraints: Vec::new(),
        },
        ..Default::default()
    }
}

/// Analysis used when the model returned none at all
fn unavailable_analysis() -> DetailedAnalysis {
    DetailedAnalysis {
        industry_landscape: "Data unavailable".to_string(),
        hyperscaler_affinity: "Unknown".to_string(),
        business_maturity: "Unknown".to_string(),
        ea_maturity: "Unknown".to_string(),
        gen_ai_maturity: "Unknown".to_string(),
        swot: Some(Swot::default()),
        ..Default::default()
    }
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(&extract_json(text)) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// First entry per URI, in order
pub fn dedup_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut unique: Vec<Source> = Vec::new();
    for source in sources {
        if source.uri.is_empty() || source.title.is_empty() {
            continue;
        }
        if !unique.iter().any(|s| s.uri == source.uri) {
            unique.push(source);
        }
    }
    unique
}

/// Build the research artifact from raw model JSON, filling what is missing
fn assemble(company: &str, data: Value, sources: Vec<Source>, log: &mut ActivityLog) -> ResearchResult {
    let has_analysis = data
        .get("detailedAnalysis")
        .map(|v| v.is_object())
        .unwrap_or(false);

    let (mut research, dropped): (ResearchResult, _) = from_value_lenient(data);
    if !dropped.is_empty() {
        log.error(format!(
            "Warning: research payload had unexpected shape, ignored: {}",
            dropped.join(", ")
        ));
    }

    if research.summary.trim().is_empty() {
        research.summary = format!("Information about {}", company);
    }
    if !has_analysis {
        research.detailed_analysis = unavailable_analysis();
    }
    research.sources = dedup_sources(sources);
    research.expanded_content.clear();
    research
}

/// Grounded KYC research on `company`
pub async fn conduct_research(
    ctx: &StageContext,
    company: &str,
    language: &str,
    log: &mut ActivityLog,
) -> ResearchResult {
    let model = ctx.flash();

    log.thinking(format!(
        "[ReAct Researcher] Reasoning: Formulating search strategy for \"{}\"...",
        company
    ));
    log.thinking("[ReAct Researcher] Action: Executing primary deep-dive search...");

    let request = GenerateRequest::text(build_research_prompt(company, language))
        .grounded()
        .json_mode();
    let response = match ctx.gateway.generate(model, request, RESEARCH_RETRIES).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Primary research failed for {}: {}", company, e);
            log.error("[ReAct Researcher] Error: Primary search failed. Using fallback.");
            return fallback_research(company);
        }
    };

    let mut data = match parse_object(response.text_or("{}")) {
        Some(data) => data,
        None => {
            log.error("Warning: JSON parse failed. Attempting fallback...");
            Value::Object(Map::new())
        }
    };

    let (first_pass, _): (ResearchResult, _) = from_value_lenient(data.clone());
    if let Some(missing) = first_pass.missing_field() {
        log.thinking(format!(
            "[ReAct Researcher] Observation: Data is sparse for '{}'. Triggering Agentic Repair...",
            missing
        ));
        log.thinking("[ReAct Researcher] Action: Executing targeted repair search...");

        let prompt = build_repair_prompt(company, missing, &data.to_string(), language);
        let request = GenerateRequest::text(prompt).grounded().json_mode();
        let repaired = match ctx.gateway.generate(model, request, REPAIR_RETRIES).await {
            Ok(response) => parse_object(response.text_or("{}")),
            Err(e) => {
                tracing::warn!("Research repair call failed: {}", e);
                None
            }
        };

        match repaired {
            Some(repair) => {
                data = merge_shallow(data, repair);
                log.success("[ReAct Researcher] Success: Data repaired and synthesized.");
            }
            None => log.info("[ReAct Researcher] Repair failed. Proceeding with available data."),
        }
    }

    assemble(company, data, response.sources, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::mock_context;
    use bsa_agent::{GenerateResponse, MockTransport};
    use bsa_core::BsaError;

    const COMPLETE: &str = r#"{"summary":"Acme sells things","strategicGoals":["Grow"],"detailedAnalysis":{"challengesAndRisks":["Legacy"],"competitors":{"global":["Rival"],"local":[]}}}"#;

    #[tokio::test]
    async fn test_complete_research_skips_repair() {
        let mock = MockTransport::new();
        mock.push_response(GenerateResponse {
            text: COMPLETE.to_string(),
            sources: vec![
                Source { title: "A".into(), uri: "https://a.test".into() },
                Source { title: "A again".into(), uri: "https://a.test".into() },
                Source { title: "B".into(), uri: "https://b.test".into() },
            ],
            ..Default::default()
        });
        let (mock, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(research.summary, "Acme sells things");
        assert_eq!(research.sources.len(), 2);
        assert_eq!(research.sources[0].title, "A");
        let (model, request) = &mock.calls()[0];
        assert_eq!(model, "gemini-3-flash-preview");
        assert!(request.grounded);
    }

    #[tokio::test]
    async fn test_sparse_research_is_repaired() {
        let mock = MockTransport::new();
        mock.push_text(r#"{"summary":"Acme","detailedAnalysis":{"challengesAndRisks":[]}}"#);
        mock.push_text(r#"{"detailedAnalysis":{"challengesAndRisks":["Legacy ERP"],"competitors":{"global":["Rival"]}}}"#);
        let (mock, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.calls_matching("missed critical details regarding: Challenges & Risks"), 1);
        assert_eq!(research.summary, "Acme");
        assert_eq!(
            research.detailed_analysis.challenges_and_risks,
            vec!["Legacy ERP".to_string()]
        );
        assert!(log.messages().iter().any(|m| m.contains("Data repaired")));
    }

    #[tokio::test]
    async fn test_mistyped_field_keeps_the_rest() {
        let mock = MockTransport::new();
        mock.push_text(
            r#"{"summary":"Acme is big","strategicGoals":"Grow","sources":42,"detailedAnalysis":{"industryLandscape":"Retail","challengesAndRisks":["Legacy"],"competitors":{"global":["Rival"]},"swot":"n/a"}}"#,
        );
        let (mock, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(research.summary, "Acme is big");
        assert_eq!(research.strategic_goals, vec!["Grow".to_string()]);
        assert_eq!(research.detailed_analysis.industry_landscape, "Retail");
        assert_eq!(
            research.detailed_analysis.challenges_and_risks,
            vec!["Legacy".to_string()]
        );
        assert!(research.detailed_analysis.swot.is_none());
        assert!(log
            .messages()
            .iter()
            .any(|m| m.ends_with("ignored: detailedAnalysis.swot")));
    }

    #[tokio::test]
    async fn test_failed_repair_keeps_original() {
        let mock = MockTransport::new()
            .with_failing_rule("missed critical details", "repair offline");
        mock.push_text(r#"{"summary":"Acme","detailedAnalysis":{"challengesAndRisks":["Debt"]}}"#);
        let (_, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(research.detailed_analysis.challenges_and_risks, vec!["Debt".to_string()]);
        assert!(log
            .messages()
            .contains(&"[ReAct Researcher] Repair failed. Proceeding with available data."));
    }

    #[tokio::test]
    async fn test_primary_failure_returns_fallback() {
        let mock = MockTransport::new();
        for _ in 0..3 {
            mock.push_error(BsaError::Transport("503".to_string()));
        }
        let (mock, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(mock.call_count(), 3);
        assert_eq!(research, fallback_research("Acme"));
    }

    #[tokio::test]
    async fn test_unparseable_research_gets_defaults() {
        let mock = MockTransport::new();
        mock.push_text("I could not find anything useful.");
        mock.push_text("still nothing");
        let (_, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let research = conduct_research(&ctx, "Acme", "English", &mut log).await;

        assert_eq!(research.summary, "Information about Acme");
        assert_eq!(research.detailed_analysis.industry_landscape, "Data unavailable");
        assert_eq!(research.detailed_analysis.gen_ai_maturity, "Unknown");
    }
}
