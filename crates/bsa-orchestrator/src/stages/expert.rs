//! Expert assistant: session-aware chat with tool calls
//!
//! One user turn is at most two model calls. When the first reply asks for
//! tools, each call is mapped to an [`ExpertAction`], run through
//! [`ExpertActions`], and the results are sent back for a final answer.

use super::StageContext;
use crate::prompts::expert::{build_chat_system_instruction, ExpertBriefing};
use async_trait::async_trait;
use bsa_agent::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateRequest, InlineData,
    Part,
};
use bsa_core::{
    AgentLog, ChatMessage, ChatRole, CostEstimation, ImageKind, LogKind, ResearchResult, Result,
    SolutionDesign,
};
use serde_json::json;

pub const OVERLOADED_REPLY: &str = "I am currently overloaded. Please try again.";
const IMAGE_ONLY_PROMPT: &str = "Please analyze this image.";
const PROCESSING_REPLY: &str = "I'm processing that...";
const EXECUTED_REPLY: &str = "Action executed.";
const UNSUPPORTED_TOOL: &str = "Tool not supported.";
const RECENT_LOG_LIMIT: usize = 30;

/// Replacement diagram and optional prose for the current design
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignPatch {
    pub mermaid_code: String,
    pub architecture_overview: Option<String>,
    pub rationale: Option<String>,
}

impl DesignPatch {
    /// Overwrite the fields the patch carries; blank values keep the current text
    pub fn apply(&self, design: &mut SolutionDesign) {
        if !self.mermaid_code.trim().is_empty() {
            design.mermaid_code = self.mermaid_code.clone();
        }
        let filled = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        if let Some(overview) = filled(&self.architecture_overview) {
            design.architecture_overview = overview;
        }
        if let Some(rationale) = filled(&self.rationale) {
            design.rationale = rationale;
        }
    }
}

/// Session change the assistant may request
#[derive(Debug, Clone, PartialEq)]
pub enum ExpertAction {
    RegenerateImage { kind: ImageKind, instruction: String },
    ExpandKycSection { section: String },
    UpdateDesign(DesignPatch),
}

fn asset_kind(name: &str) -> Option<ImageKind> {
    match name.trim().to_lowercase().as_str() {
        "cover" => Some(ImageKind::Cover),
        "concept" | "architecture" => Some(ImageKind::Architecture),
        "infographic" | "kyc" => Some(ImageKind::Kyc),
        "business" => Some(ImageKind::Business),
        "cost" => Some(ImageKind::Cost),
        "metacognition" => Some(ImageKind::Metacognition),
        _ => None,
    }
}

impl ExpertAction {
    /// Map a model tool call; `None` for unknown tools or missing required arguments
    pub fn from_call(call: &FunctionCall) -> Option<Self> {
        let non_empty = |key: &str| {
            call.arg_str(key)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match call.name.as_str() {
            "regenerate_visual_asset" => Some(ExpertAction::RegenerateImage {
                kind: asset_kind(call.arg_str("asset_type")?)?,
                instruction: non_empty("instruction").unwrap_or_default(),
            }),
            "expand_kyc_section" => Some(ExpertAction::ExpandKycSection {
                section: non_empty("section_name")?,
            }),
            "update_solution_design" => Some(ExpertAction::UpdateDesign(DesignPatch {
                mermaid_code: non_empty("mermaid_code")?,
                architecture_overview: non_empty("architecture_overview"),
                rationale: non_empty("rationale"),
            })),
            _ => None,
        }
    }

    /// Tool result reported back to the model after a successful run
    pub fn confirmation(&self) -> &'static str {
        match self {
            ExpertAction::RegenerateImage { .. } => "Image regeneration triggered.",
            ExpertAction::ExpandKycSection { .. } => "Expansion triggered.",
            ExpertAction::UpdateDesign(_) => "Design updated.",
        }
    }
}

/// Executes assistant actions against the session
#[async_trait(?Send)]
pub trait ExpertActions {
    async fn perform(&mut self, action: &ExpertAction) -> Result<()>;
}

/// Artifacts the assistant can see
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpertInputs<'a> {
    pub research: Option<&'a ResearchResult>,
    pub design: Option<&'a SolutionDesign>,
    pub proposal: &'a str,
    pub cost: Option<&'a CostEstimation>,
    pub logs: &'a [AgentLog],
}

/// Last non-info log lines as `[TYPE] message`
fn recent_logs(logs: &[AgentLog]) -> String {
    let relevant: Vec<&AgentLog> = logs.iter().filter(|l| l.kind != LogKind::Info).collect();
    relevant[relevant.len().saturating_sub(RECENT_LOG_LIMIT)..]
        .iter()
        .map(|l| format!("[{}] {}", l.kind.to_string().to_uppercase(), l.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn briefing(inputs: &ExpertInputs<'_>) -> ExpertBriefing {
    let to_json = |value: serde_json::Result<String>| value.unwrap_or_else(|_| "{}".to_string());
    ExpertBriefing {
        has_kyc: inputs.research.is_some(),
        has_design: inputs.design.is_some(),
        has_proposal: !inputs.proposal.is_empty(),
        has_cost: inputs.cost.is_some(),
        recent_logs: recent_logs(inputs.logs),
        kyc_data: inputs
            .research
            .map(|r| to_json(serde_json::to_string(&r.detailed_analysis)))
            .unwrap_or_else(|| "{}".to_string()),
        mermaid_code: inputs
            .design
            .map(|d| d.mermaid_code.clone())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| "NOT_GENERATED_YET".to_string()),
        cost_data: inputs
            .cost
            .map(|c| to_json(serde_json::to_string(c)))
            .unwrap_or_else(|| "{}".to_string()),
    }
}

/// Tools offered on every turn
pub fn tool_declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration {
            name: "regenerate_visual_asset".to_string(),
            description: "Regenerate a visual asset. Use ONLY if the user explicitly requests \
                          to change an image."
                .to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "asset_type": {"type": "STRING", "enum": ["cover", "concept", "infographic"]},
                    "instruction": {"type": "STRING"}
                },
                "required": ["asset_type"]
            }),
        },
        FunctionDeclaration {
            name: "expand_kyc_section".to_string(),
            description: "Perform deep dive research on a specific KYC section.".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {"section_name": {"type": "STRING"}},
                "required": ["section_name"]
            }),
        },
        FunctionDeclaration {
            name: "update_solution_design".to_string(),
            description: "Update the solution design (Mermaid diagram/Architecture).".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "mermaid_code": {"type": "STRING"},
                    "architecture_overview": {"type": "STRING"},
                    "rationale": {"type": "STRING"}
                },
                "required": ["mermaid_code"]
            }),
        },
    ]
}

/// Text plus an optional `data:` URI image; unparseable URIs are dropped
fn turn_parts(text: &str, image: Option<&str>) -> Vec<Part> {
    let mut parts = vec![Part::text(text)];
    if let Some(data) = image.and_then(InlineData::from_data_uri) {
        parts.push(Part::image(data));
    }
    parts
}

/// Earlier chat turns in wire form
pub fn history_contents(history: &[ChatMessage]) -> Vec<Content> {
    history
        .iter()
        .map(|message| {
            let parts = turn_parts(&message.text, message.image.as_deref());
            match message.role {
                ChatRole::User => Content::user(parts),
                ChatRole::Model => Content::model(parts),
            }
        })
        .collect()
}

/// First request of a turn
pub fn chat_request(
    inputs: &ExpertInputs<'_>,
    history: &[ChatMessage],
    message: &str,
    image: Option<&str>,
) -> GenerateRequest {
    let text = if message.trim().is_empty() {
        IMAGE_ONLY_PROMPT
    } else {
        message
    };
    GenerateRequest {
        parts: turn_parts(text, image),
        ..Default::default()
    }
    .with_system_instruction(build_chat_system_instruction(&briefing(inputs)))
    .with_history(history_contents(history))
    .with_functions(tool_declarations())
}

/// Follow-up carrying tool results, after the turn that requested them
fn follow_up_request(
    first: GenerateRequest,
    calls: &[FunctionCall],
    results: Vec<FunctionResponse>,
) -> GenerateRequest {
    let mut history = first.history;
    history.push(Content::user(first.parts));
    history.push(Content::model(
        calls.iter().cloned().map(Part::function_call).collect(),
    ));
    GenerateRequest {
        parts: results.into_iter().map(Part::function_response).collect(),
        config: first.config,
        grounded: first.grounded,
        system_instruction: first.system_instruction,
        history,
        functions: first.functions,
    }
}

/// Run one turn; tool calls go through `actions`
///
/// Errors are model failures only. A failing action is reported to the
/// model as its tool result.
pub async fn converse<A>(
    ctx: &StageContext,
    request: GenerateRequest,
    actions: &mut A,
) -> Result<String>
where
    A: ExpertActions + ?Sized,
{
    let first = ctx.gateway.generate(ctx.flash(), request.clone(), 0).await?;
    if first.function_calls.is_empty() {
        return Ok(first.text_or(PROCESSING_REPLY).to_string());
    }

    let mut results = Vec::with_capacity(first.function_calls.len());
    for call in &first.function_calls {
        let result = match ExpertAction::from_call(call) {
            Some(action) => match actions.perform(&action).await {
                Ok(()) => action.confirmation().to_string(),
                Err(e) => format!("Action failed: {}", e),
            },
            None => UNSUPPORTED_TOOL.to_string(),
        };
        results.push(FunctionResponse::answering(call, result));
    }

    let follow_up = follow_up_request(request, &first.function_calls, results);
    let last = ctx.gateway.generate(ctx.flash(), follow_up, 0).await?;
    Ok(last.text_or(EXECUTED_REPLY).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::mock_context;
    use bsa_agent::{GenerateResponse, MockTransport};
    use bsa_core::BsaError;

    #[derive(Default)]
    struct Recorder {
        performed: Vec<ExpertAction>,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl ExpertActions for Recorder {
        async fn perform(&mut self, action: &ExpertAction) -> Result<()> {
            self.performed.push(action.clone());
            if self.fail {
                Err(BsaError::MissingArtifact("No solution design to update.".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn call(name: &str, args: serde_json::Value) -> FunctionCall {
        FunctionCall::new(name, args)
    }

    #[test]
    fn test_tool_calls_map_to_actions() {
        assert_eq!(
            ExpertAction::from_call(&call(
                "regenerate_visual_asset",
                json!({"asset_type": "concept", "instruction": "more blue"})
            )),
            Some(ExpertAction::RegenerateImage {
                kind: ImageKind::Architecture,
                instruction: "more blue".to_string()
            })
        );
        assert_eq!(
            ExpertAction::from_call(&call(
                "regenerate_visual_asset",
                json!({"asset_type": "infographic"})
            )),
            Some(ExpertAction::RegenerateImage {
                kind: ImageKind::Kyc,
                instruction: String::new()
            })
        );
        assert_eq!(
            ExpertAction::from_call(&call(
                "update_solution_design",
                json!({"mermaid_code": "graph LR; A-->B"})
            )),
            Some(ExpertAction::UpdateDesign(DesignPatch {
                mermaid_code: "graph LR; A-->B".to_string(),
                ..Default::default()
            }))
        );
        assert!(ExpertAction::from_call(&call("expand_kyc_section", json!({}))).is_none());
        let unknown_asset = call("regenerate_visual_asset", json!({"asset_type": "logo"}));
        assert!(ExpertAction::from_call(&unknown_asset).is_none());
        assert!(ExpertAction::from_call(&call("get_system_documentation", json!({}))).is_none());
    }

    #[test]
    fn test_design_patch_keeps_unset_fields() {
        let mut design = SolutionDesign {
            architecture_overview: "Serverless".to_string(),
            rationale: "Cost".to_string(),
            mermaid_code: "graph LR; A-->B".to_string(),
            ..Default::default()
        };
        DesignPatch {
            mermaid_code: "graph LR; A-->C".to_string(),
            architecture_overview: Some("Event-driven".to_string()),
            rationale: Some("  ".to_string()),
        }
        .apply(&mut design);

        assert_eq!(design.mermaid_code, "graph LR; A-->C");
        assert_eq!(design.architecture_overview, "Event-driven");
        assert_eq!(design.rationale, "Cost");
    }

    #[test]
    fn test_briefing_without_artifacts() {
        let logs = vec![
            AgentLog::new("Starting", LogKind::Info),
            AgentLog::new("Validator timed out", LogKind::Error),
            AgentLog::new("Architecture approved.", LogKind::Success),
        ];
        let inputs = ExpertInputs {
            logs: &logs,
            ..Default::default()
        };
        let briefing = briefing(&inputs);

        assert!(!briefing.has_kyc && !briefing.has_design && !briefing.has_proposal);
        assert_eq!(
            briefing.recent_logs,
            "[ERROR] Validator timed out\n[SUCCESS] Architecture approved."
        );
        assert_eq!(briefing.kyc_data, "{}");
        assert_eq!(briefing.mermaid_code, "NOT_GENERATED_YET");
    }

    #[test]
    fn test_only_the_latest_logs_are_briefed() {
        let logs: Vec<AgentLog> = (0..40)
            .map(|i| AgentLog::new(format!("step {}", i), LogKind::Thinking))
            .collect();
        let lines = recent_logs(&logs);
        assert_eq!(lines.lines().count(), RECENT_LOG_LIMIT);
        assert!(lines.starts_with("[THINKING] step 10\n"));
    }

    #[test]
    fn test_history_and_image_become_turns() {
        let history = vec![
            ChatMessage::new(ChatRole::User, "What is this?")
                .with_image(Some("data:image/jpeg;base64,QUJD".to_string())),
            ChatMessage::new(ChatRole::Model, "A whiteboard sketch."),
        ];
        let request = chat_request(&ExpertInputs::default(), &history, "", None);

        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].role.as_deref(), Some("user"));
        assert_eq!(
            request.history[0].parts[1].inline_data.as_ref().unwrap().mime_type,
            "image/jpeg"
        );
        assert_eq!(request.history[1].role.as_deref(), Some("model"));
        assert_eq!(request.parts[0].text.as_deref(), Some(IMAGE_ONLY_PROMPT));
        assert_eq!(request.functions.len(), 3);
        assert!(request.system_instruction.is_some());
    }

    #[tokio::test]
    async fn test_plain_answer_needs_one_call() {
        let mock = MockTransport::new();
        mock.push_text("The SWOT is in the KYC tab.");
        let (mock, ctx) = mock_context(mock);
        let mut actions = Recorder::default();

        let request = chat_request(&ExpertInputs::default(), &[], "Where is the SWOT?", None);
        let reply = converse(&ctx, request, &mut actions).await.unwrap();

        assert_eq!(reply, "The SWOT is in the KYC tab.");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls()[0].0, "gemini-3-flash-preview");
        assert!(actions.performed.is_empty());
    }

    #[tokio::test]
    async fn test_tool_calls_are_answered_then_summarized() {
        let mock = MockTransport::new();
        mock.push_response(GenerateResponse {
            function_calls: vec![
                call("expand_kyc_section", json!({"section_name": "SWOT"})),
                call("get_system_documentation", json!({})),
            ],
            ..Default::default()
        });
        mock.push_text("");
        let (mock, ctx) = mock_context(mock);
        let mut actions = Recorder::default();

        let request = chat_request(&ExpertInputs::default(), &[], "Expand the SWOT", None);
        let reply = converse(&ctx, request, &mut actions).await.unwrap();

        assert_eq!(reply, EXECUTED_REPLY);
        assert_eq!(
            actions.performed,
            vec![ExpertAction::ExpandKycSection {
                section: "SWOT".to_string()
            }]
        );

        let calls = mock.calls();
        let follow_up = &calls[1].1;
        assert_eq!(follow_up.history.len(), 2);
        assert!(follow_up.history[1].parts[0].function_call.is_some());
        let results: Vec<&serde_json::Value> = follow_up
            .parts
            .iter()
            .filter_map(|p| p.function_response.as_ref())
            .map(|r| &r.response["result"])
            .collect();
        assert_eq!(results, vec!["Expansion triggered.", UNSUPPORTED_TOOL]);
    }

    #[tokio::test]
    async fn test_failed_action_is_reported_to_the_model() {
        let mock = MockTransport::new();
        mock.push_response(GenerateResponse::from_function_call(call(
            "update_solution_design",
            json!({"mermaid_code": "graph LR; A-->B"}),
        )));
        mock.push_text("There is no design to update yet.");
        let (mock, ctx) = mock_context(mock);
        let mut actions = Recorder {
            fail: true,
            ..Default::default()
        };

        let request = chat_request(&ExpertInputs::default(), &[], "Add a cache", None);
        let reply = converse(&ctx, request, &mut actions).await.unwrap();

        assert_eq!(reply, "There is no design to update yet.");
        let calls = mock.calls();
        let response = calls[1].1.parts[0].function_response.as_ref().unwrap();
        assert!(response.response["result"]
            .as_str()
            .unwrap()
            .starts_with("Action failed:"));
    }

    #[tokio::test]
    async fn test_model_outage_is_an_error() {
        let mock = MockTransport::new();
        mock.push_error(BsaError::Api("503".to_string()));
        let (_, ctx) = mock_context(mock);

        let request = chat_request(&ExpertInputs::default(), &[], "Hi", None);
        assert!(converse(&ctx, request, &mut Recorder::default()).await.is_err());
    }
}
