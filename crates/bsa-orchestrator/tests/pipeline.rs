//! End-to-end pipeline runs over a scripted transport

use async_trait::async_trait;
use bsa_agent::{FunctionCall, Gateway, GenerateResponse, InlineData, LogoSource, MockTransport};
use bsa_core::config::GatewayConfig;
use bsa_core::{
    AppStep, BsaConfig, BsaError, ChatRole, ExpandConfig, ExpandTarget, ImageKind,
    ProposalRequest, SessionData,
};
use bsa_orchestrator::{Pipeline, State};
use std::sync::Arc;

const RESEARCH: &str = r#"{"summary":"Acme is a retailer","strategicGoals":["Grow online"],"detailedAnalysis":{"industryLandscape":"Retail","challengesAndRisks":["Legacy POS"],"competitors":{"global":["MegaMart"],"local":[]}}}"#;
const BUSINESS: &str = r#"{"problemStatement":"Checkout is slow","rootCauseAnalysis":["Monolith"],"keyPainPoints":["Queues"]}"#;
const DESIGN: &str = r#"{"architectureOverview":"Event-driven retail platform","keyComponents":["Lambda","DynamoDB"],"rationale":"Scales with demand","mermaidCode":"graph LR; POS-->API"}"#;
const VALID: &str = r#"{"isValid":true,"score":9,"critique":"Covers every root cause"}"#;
const INVALID: &str = r#"{"isValid":false,"score":4,"critique":"Missing offline mode"}"#;
const PROPOSAL: &str = "# Technical Proposal - Acme\n\n## 4. Delivery Team\nTBD\n\n## 5. Execution Timeline\nTotal 12 weeks\n\n## 7. Legal\nTerms";
const AUDIT: &str = "# Audit\n\n| ***Nota:*** | 92 |\n";
const PLAN: &str = r#"{"optimalPlan":{"totalWeeks":12,"roles":[{"role":"Tech Lead","hourlyRate":65,"allocations":{"1":50}},{"role":"Cloud Engineer Sr","hourlyRate":55,"allocations":{"1":100}}],"totalCost":0,"reasoning":"Lean team"}}"#;
const REASON: &str = r#"{"reasoning":"Check timeline","searchQueries":["retail migrations"],"hypotheses":{"risks":["POS cutover"]}}"#;
const OBSERVE: &str = r#"{"consonanceMatrix":[{"dimension":"Timeline","alignmentScore":4}],"dissonanceAlerts":[{"severity":"High","description":"Peak season"}],"tensionManagement":[]}"#;

struct FixedLogo;

#[async_trait]
impl LogoSource for FixedLogo {
    async fn fetch_company_logo(&self, _company_name: &str) -> Option<String> {
        Some("data:image/png;base64,LOGO".to_string())
    }
}

fn image(data: &str) -> GenerateResponse {
    GenerateResponse {
        images: vec![InlineData {
            mime_type: "image/png".to_string(),
            data: data.to_string(),
        }],
        ..Default::default()
    }
}

/// Every stage answered by prompt needle
fn scripted(validation: &str) -> MockTransport {
    MockTransport::new()
        .with_rule_response("Create a", image("AAAA"))
        .with_rule("Know Your Customer", RESEARCH)
        .with_rule("Act as a Senior Business Analyst", BUSINESS)
        .with_rule("Role: Cloud Solutions Architect specialized", "Use managed serverless services.")
        .with_rule("Act as a Senior Cloud Solutions Architect", DESIGN)
        .with_rule("Act as a Visualization Expert", "graph LR\nPOS-->API-->DB")
        .with_rule("# DESIGN LOGIC REVIEW", validation)
        .with_rule("You are a Proposal Manager", PROPOSAL)
        .with_rule("# TECHNICAL PROPOSAL AUDIT", AUDIT)
        .with_rule("You are an expert Project Estimator", PLAN)
        .with_rule("performing GROUNDED RESEARCH", "Retail migrations average 14 weeks.")
        .with_rule("completing a Metacognitive Analysis", OBSERVE)
        .with_rule("STAGE 1: REASONING", REASON)
        .with_rule("Senior Technical Proposal Writer", "Extra timeline detail")
}

fn pipeline(mock: MockTransport) -> (Arc<MockTransport>, Pipeline) {
    let mock = Arc::new(mock);
    let config = BsaConfig {
        gateway: GatewayConfig {
            backoff_unit_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let gateway = Gateway::new(mock.clone(), config.gateway.clone());
    (mock, Pipeline::new(gateway, &config))
}

fn request() -> ProposalRequest {
    ProposalRequest {
        company_name: "Acme".to_string(),
        business_case: "Modernize checkout".to_string(),
        language: "English".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_discovery_stops_for_approval() {
    let (mock, mut pipeline) = pipeline(scripted(VALID));

    pipeline.run_discovery(request()).await.unwrap();

    assert_eq!(pipeline.state(), &State::AwaitingApproval);
    assert_eq!(pipeline.step(), AppStep::Result);
    let artifacts = pipeline.artifacts();
    assert_eq!(
        artifacts.research.as_ref().unwrap().summary,
        "Acme is a retailer"
    );
    assert_eq!(
        artifacts.design.as_ref().unwrap().mermaid_code,
        "graph LR\nPOS-->API-->DB"
    );
    assert!(artifacts.images.kyc_infographic.is_some());
    assert!(artifacts.images.business_infographic.is_some());
    assert!(artifacts.images.architecture_infographic.is_some());
    assert!(artifacts.proposal.is_empty());

    assert_eq!(mock.calls_matching("# DESIGN LOGIC REVIEW"), 1);
    assert_eq!(mock.calls_matching("Act as a Senior Cloud Solutions Architect"), 1);
    assert_eq!(mock.calls_matching("You are a Proposal Manager"), 0);

    let messages = pipeline.log().messages();
    assert_eq!(messages[0], "Initialized agent for company: Acme");
    assert!(messages.contains(&"Architecture Logic Validated (Score: 9/10)."));
    assert_eq!(
        messages.last().copied(),
        Some("Design Phase Complete. Waiting for user approval to generate proposal...")
    );
}

#[tokio::test]
async fn test_failed_validation_triggers_one_redesign() {
    let (mock, mut pipeline) = pipeline(scripted(INVALID));

    pipeline.run_discovery(request()).await.unwrap();

    assert_eq!(pipeline.state(), &State::AwaitingApproval);
    // the corrected design is not validated again
    assert_eq!(mock.calls_matching("# DESIGN LOGIC REVIEW"), 1);
    assert_eq!(mock.calls_matching("Act as a Senior Cloud Solutions Architect"), 2);
    // service grounding only runs for fresh designs
    assert_eq!(mock.calls_matching("Role: Cloud Solutions Architect specialized"), 1);
    assert_eq!(mock.calls_matching("Missing offline mode"), 1);

    let messages = pipeline.log().messages();
    assert!(messages.contains(&"Critique: \"Missing offline mode\""));
    assert!(messages.contains(&"Re-design complete."));
}

#[tokio::test]
async fn test_validator_outage_fails_open() {
    let mock = MockTransport::new()
        .with_failing_rule("# DESIGN LOGIC REVIEW", "503")
        .with_rule_response("Create a", image("AAAA"))
        .with_rule("Know Your Customer", RESEARCH)
        .with_rule("Act as a Senior Business Analyst", BUSINESS)
        .with_rule("Role: Cloud Solutions Architect specialized", "Serverless")
        .with_rule("Act as a Senior Cloud Solutions Architect", DESIGN)
        .with_rule("Act as a Visualization Expert", "graph LR\nA-->B");
    let (mock, mut pipeline) = pipeline(mock);

    pipeline.run_discovery(request()).await.unwrap();

    assert_eq!(pipeline.state(), &State::AwaitingApproval);
    assert_eq!(mock.calls_matching("Act as a Senior Cloud Solutions Architect"), 1);
    assert!(pipeline
        .log()
        .messages()
        .contains(&"Architecture Logic Validated (Score: 5/10)."));
}

#[tokio::test]
async fn test_actions_need_upstream_artifacts() {
    let (mock, mut pipeline) = pipeline(MockTransport::new());

    let err = pipeline.generate_proposal().await.unwrap_err();
    assert!(matches!(err, BsaError::MissingArtifact(_)));
    assert!(pipeline.estimate_cost().await.is_err());
    assert!(pipeline.analyze_metacognition().await.is_err());
    assert!(pipeline.sync_proposal_with_cost().is_err());

    assert_eq!(mock.call_count(), 0);
    assert_eq!(
        pipeline.log().messages()[0],
        "Missing required artifacts to generate proposal."
    );
}

#[tokio::test]
async fn test_full_session() {
    let (mock, pipeline) = pipeline(scripted(VALID));
    let mut pipeline = pipeline.with_logo_source(Arc::new(FixedLogo));

    pipeline.run_discovery(request()).await.unwrap();
    pipeline.approve_design().unwrap();
    pipeline.generate_proposal().await.unwrap();

    let artifacts = pipeline.artifacts();
    assert!(artifacts
        .proposal
        .starts_with("![Cover Image](data:image/png;base64,AAAA)\n\n# Technical Proposal - Acme"));
    assert_eq!(
        artifacts.images.customer_logo.as_deref(),
        Some("data:image/png;base64,LOGO")
    );
    assert_eq!(artifacts.design.as_ref().unwrap().is_approved, Some(true));

    let report = pipeline.audit_proposal().await.unwrap();
    assert_eq!(report.score, 92);
    assert_eq!(pipeline.artifacts().evaluation, AUDIT);

    pipeline.estimate_cost().await.unwrap();
    let cost = pipeline.artifacts().cost.clone().unwrap();
    assert_eq!(cost.optimal_plan.total_weeks, 12);
    assert_eq!(cost.optimal_plan.total_cost, 3500.0);
    assert!(pipeline.artifacts().images.cost_infographic.is_some());

    let preview = pipeline.preview_cost_sync().unwrap();
    assert_eq!(preview.original_team_section, "## 4. Delivery Team\nTBD\n\n");
    pipeline.sync_proposal_with_cost().unwrap();
    let proposal = &pipeline.artifacts().proposal;
    assert!(!proposal.contains("TBD"));
    assert!(proposal.contains("| Tech Lead | Technical leadership and code review |"));
    assert!(proposal.contains("**Total Duration:** 12 weeks"));
    assert!(proposal.contains("## 7. Legal\nTerms"));

    pipeline.analyze_metacognition().await.unwrap();
    let analysis = pipeline.artifacts().metacognition.clone().unwrap();
    assert_eq!(analysis.dissonance_alerts[0].severity, "High");
    assert!(pipeline.artifacts().images.metacognition_infographic.is_some());
    assert_eq!(mock.calls_matching("**Industry:** Retail"), 1);

    let text = pipeline
        .expand_section(
            ExpandTarget::Proposal,
            "5. Execution Timeline",
            &ExpandConfig::default(),
        )
        .await
        .unwrap();
    assert_eq!(text, "Extra timeline detail");
    assert!(pipeline
        .artifacts()
        .proposal
        .contains("## 5. Execution Timeline\n\nExtra timeline detail\n"));

    pipeline
        .update_expanded(ExpandTarget::Kyc, "SWOT", Some("Manual notes".to_string()))
        .unwrap();
    assert_eq!(
        pipeline.artifacts().research.as_ref().unwrap().expanded_content["SWOT"],
        "Manual notes"
    );
    assert_eq!(
        pipeline.log().messages().last().copied(),
        Some("KYC section 'SWOT' updated manually.")
    );

    // a saved session restores to the same point
    let json = serde_json::to_string(&pipeline.snapshot()).unwrap();
    let data: SessionData = serde_json::from_str(&json).unwrap();
    let gateway = Gateway::new(Arc::new(MockTransport::new()), GatewayConfig::default());
    let restored = Pipeline::from_session(gateway, &BsaConfig::default(), data);
    assert_eq!(restored.state(), &State::AwaitingApproval);
    assert_eq!(restored.artifacts(), pipeline.artifacts());
    assert_eq!(restored.log().len(), pipeline.log().len());
}

#[tokio::test]
async fn test_estimation_failure_keeps_prior_artifacts() {
    let mock = Arc::new(
        MockTransport::new().with_rule("You are an expert Project Estimator", "No plan today"),
    );
    let gateway = Gateway::new(
        mock.clone(),
        GatewayConfig {
            backoff_unit_ms: 0,
            ..Default::default()
        },
    );
    let data = SessionData {
        request: Some(request()),
        proposal_markdown: "# Proposal\n12 weeks".to_string(),
        step: AppStep::Result,
        ..Default::default()
    };
    let mut pipeline = Pipeline::from_session(gateway, &BsaConfig::default(), data);

    let err = pipeline.estimate_cost().await.unwrap_err();

    assert!(matches!(err, BsaError::Parse(_)));
    assert_eq!(mock.call_count(), 1);
    assert!(pipeline.artifacts().cost.is_none());
    assert_eq!(pipeline.artifacts().proposal, "# Proposal\n12 weeks");
    assert!(pipeline
        .log()
        .messages()
        .iter()
        .any(|m| m.starts_with("Error generating cost estimation")));
}

#[tokio::test]
async fn test_regenerated_cover_replaces_embedded_image() {
    let mock = Arc::new(MockTransport::new().with_rule_response("Create a", image("NEWCOVER")));
    let gateway = Gateway::new(mock.clone(), GatewayConfig::default());
    let data = SessionData {
        request: Some(request()),
        proposal_markdown: "![Cover Image](data:image/png;base64,OLD)\n\n# Proposal".to_string(),
        ..Default::default()
    };
    let mut pipeline = Pipeline::from_session(gateway, &BsaConfig::default(), data);

    let uri = pipeline
        .regenerate_image(ImageKind::Cover, "use darker tones")
        .await
        .unwrap();

    assert_eq!(uri.as_deref(), Some("data:image/png;base64,NEWCOVER"));
    assert_eq!(
        pipeline.artifacts().proposal,
        "![Cover Image](data:image/png;base64,NEWCOVER)\n\n# Proposal"
    );
    assert_eq!(mock.calls_matching("use darker tones"), 1);
    // no logo source configured
    assert!(pipeline.artifacts().images.customer_logo.is_none());

    let err = pipeline
        .regenerate_image(ImageKind::Cost, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BsaError::MissingArtifact(_)));
}

fn designed_session(mock: Arc<MockTransport>) -> Pipeline {
    let gateway = Gateway::new(mock, GatewayConfig::default());
    let data = SessionData {
        request: Some(request()),
        design: Some(serde_json::from_str(DESIGN).unwrap()),
        step: AppStep::Result,
        ..Default::default()
    };
    Pipeline::from_session(gateway, &BsaConfig::default(), data)
}

#[tokio::test]
async fn test_expert_chat_patches_design() {
    let mock = Arc::new(MockTransport::new());
    mock.push_response(GenerateResponse::from_function_call(FunctionCall::new(
        "update_solution_design",
        serde_json::json!({
            "mermaid_code": "```mermaid\ngraph LR; POS-->Cache-->API\n```",
            "rationale": "Cache hot reads"
        }),
    )));
    mock.push_text("Added a cache in front of the API.");
    let mut pipeline = designed_session(mock.clone());

    let reply = pipeline.chat_with_expert("Add a cache", None).await;

    assert_eq!(reply, "Added a cache in front of the API.");
    let design = pipeline.artifacts().design.as_ref().unwrap();
    assert_eq!(design.mermaid_code, "graph LR; POS-->Cache-->API");
    assert_eq!(design.rationale, "Cache hot reads");
    assert_eq!(design.architecture_overview, "Event-driven retail platform");
    assert_eq!(
        pipeline.log().messages().last().copied(),
        Some("Architecture updated via Chat Agent.")
    );
    assert_eq!(mock.calls_matching("- Solution Design Available: true"), 2);

    let roles: Vec<ChatRole> = pipeline.chat_history().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Model]);

    // the conversation is part of the saved session
    let gateway = Gateway::new(Arc::new(MockTransport::new()), GatewayConfig::default());
    let restored = Pipeline::from_session(gateway, &BsaConfig::default(), pipeline.snapshot());
    assert_eq!(restored.chat_history(), pipeline.chat_history());
}

#[tokio::test]
async fn test_expert_chat_sends_history_and_image() {
    let mock = Arc::new(MockTransport::new());
    mock.push_text("Happy to help.");
    mock.push_text("That sketch shows a message queue.");
    let mut pipeline = designed_session(mock.clone());

    pipeline.chat_with_expert("Hello", None).await;
    let reply = pipeline
        .chat_with_expert("", Some("data:image/png;base64,QUJD".to_string()))
        .await;

    assert_eq!(reply, "That sketch shows a message queue.");
    let calls = mock.calls();
    let (model, second) = &calls[1];
    assert_eq!(model, "gemini-3-flash-preview");
    assert_eq!(second.history.len(), 2);
    assert_eq!(second.parts[0].text.as_deref(), Some("Please analyze this image."));
    assert_eq!(second.parts[1].inline_data.as_ref().unwrap().data, "QUJD");

    let chat = pipeline.chat_history();
    assert_eq!(chat.len(), 4);
    assert_eq!(chat[2].text, "[Image attached]");
    assert_eq!(chat[2].image.as_deref(), Some("data:image/png;base64,QUJD"));
}

#[tokio::test]
async fn test_expert_chat_outage_replies_politely() {
    let mock = Arc::new(MockTransport::new());
    mock.push_error(BsaError::Api("503 Service Unavailable".to_string()));
    let mut pipeline = designed_session(mock);

    let reply = pipeline.chat_with_expert("How long is the plan?", None).await;

    assert_eq!(reply, "I am currently overloaded. Please try again.");
    assert!(pipeline
        .log()
        .messages()
        .last()
        .is_some_and(|m| m.starts_with("Expert chat failed")));
    assert_eq!(pipeline.chat_history().len(), 2);
}
