//! Request/response types for the generative language API

use bsa_core::Source;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inline binary payload (images in and out)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

impl InlineData {
    /// Render as a `data:` URI, dropping whitespace the API sometimes inserts
    pub fn to_data_uri(&self) -> String {
        let clean: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        format!("data:{};base64,{}", self.mime_type, clean)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// One part of a prompt or a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Set on reasoning summaries; never part of the answer text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn image(data: InlineData) -> Self {
        Self {
            inline_data: Some(data),
            ..Default::default()
        }
    }

    /// Echo of a tool call the model made
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Default::default()
        }
    }

    /// Result of a tool call, sent back to the model
    pub fn function_response(response: FunctionResponse) -> Self {
        Self {
            function_response: Some(response),
            ..Default::default()
        }
    }
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
        }
    }

    /// String argument, or `None` when absent or not a string
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// Tool result answering a [`FunctionCall`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    /// Reply to `call` with `{"result": result}`
    pub fn answering(call: &FunctionCall, result: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: serde_json::json!({ "result": result.into() }),
        }
    }
}

/// Tool the model may call; `parameters` is an OpenAPI-style object schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts,
        }
    }
}

/// Generation settings recognized by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

/// A model call as the pipeline stages describe it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    pub config: GenerationConfig,
    /// Enable web-search grounding
    pub grounded: bool,
    pub system_instruction: Option<String>,
    /// Earlier turns, sent before `parts`
    pub history: Vec<Content>,
    /// Tools the model may call instead of answering
    pub functions: Vec<FunctionDeclaration>,
}

impl GenerateRequest {
    /// Plain text prompt
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(prompt)],
            ..Default::default()
        }
    }

    /// Append another prompt part
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Force a JSON response body
    pub fn json_mode(mut self) -> Self {
        self.config.response_mime_type = Some("application/json".to_string());
        self
    }

    /// Structured output contract (implies JSON mode)
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.config.response_schema = Some(schema);
        self.json_mode()
    }

    /// Enable web-search grounding
    pub fn grounded(mut self) -> Self {
        self.grounded = true;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDeclaration>) -> Self {
        self.functions = functions;
        self
    }

    /// Ask for text and image output
    pub fn image_output(mut self) -> Self {
        self.config.response_modalities = Some(vec!["TEXT".to_string(), "IMAGE".to_string()]);
        self
    }

    pub fn is_image_request(&self) -> bool {
        self.config.response_modalities.is_some()
    }

    /// Apply the default output budget unless the caller set one.
    /// Image requests keep the model's own limit.
    pub fn with_default_output_tokens(mut self, tokens: u32) -> Self {
        if self.config.max_output_tokens.is_none() && !self.is_image_request() {
            self.config.max_output_tokens = Some(tokens);
        }
        self
    }

    /// System instruction plus the text parts of the current turn, for
    /// logging and mocks
    pub fn prompt_text(&self) -> String {
        self.system_instruction
            .as_deref()
            .into_iter()
            .chain(self.parts.iter().filter_map(|p| p.text.as_deref()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Normalized model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    /// Answer text (thought parts excluded)
    pub text: String,
    /// Cited sources for grounded calls, unique by URI
    pub sources: Vec<Source>,
    /// Inline images for image-generation calls
    pub images: Vec<InlineData>,
    /// Tool calls requested instead of (or alongside) an answer
    pub function_calls: Vec<FunctionCall>,
    pub usage: Option<Usage>,
}

impl GenerateResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Queue-friendly reply that only calls one tool
    pub fn from_function_call(call: FunctionCall) -> Self {
        Self {
            function_calls: vec![call],
            ..Default::default()
        }
    }

    /// Text, or `default` when the model returned nothing
    pub fn text_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.text.trim().is_empty() {
            default
        } else {
            &self.text
        }
    }
}

// ============ WIRE FORMAT ============

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_declarations: Option<Vec<FunctionDeclaration>>,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

impl From<&GenerateRequest> for WireRequest {
    fn from(request: &GenerateRequest) -> Self {
        let mut tools = Vec::new();
        if request.grounded {
            tools.push(WireTool {
                google_search: Some(GoogleSearch {}),
                ..Default::default()
            });
        }
        if !request.functions.is_empty() {
            tools.push(WireTool {
                function_declarations: Some(request.functions.clone()),
                ..Default::default()
            });
        }
        let generation_config = if request.config == GenerationConfig::default() {
            None
        } else {
            Some(request.config.clone())
        };
        let mut contents = request.history.clone();
        contents.push(Content::user(request.parts.clone()));
        Self {
            contents,
            system_instruction: request
                .system_instruction
                .as_ref()
                .map(|text| Content {
                    role: None,
                    parts: vec![Part::text(text.clone())],
                }),
            generation_config,
            tools,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: usize,
    #[serde(default)]
    pub candidates_token_count: usize,
}

/// Response body of `generateContent`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl From<WireResponse> for GenerateResponse {
    fn from(wire: WireResponse) -> Self {
        let usage = wire.usage_metadata.map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });

        let Some(candidate) = wire.candidates.into_iter().next() else {
            return Self {
                usage,
                ..Default::default()
            };
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        let text = parts
            .iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect::<String>();
        let mut images = Vec::new();
        let mut function_calls = Vec::new();
        for part in parts {
            if let Some(data) = part.inline_data {
                images.push(data);
            }
            if let Some(call) = part.function_call {
                function_calls.push(call);
            }
        }

        let mut sources: Vec<Source> = Vec::new();
        for web in candidate
            .grounding_metadata
            .map(|g| g.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.web)
        {
            let (Some(uri), Some(title)) = (web.uri, web.title) else {
                continue;
            };
            if uri.is_empty() || title.is_empty() || sources.iter().any(|s| s.uri == uri) {
                continue;
            }
            sources.push(Source { title, uri });
        }

        Self {
            text,
            sources,
            images,
            function_calls,
            usage,
        }
    }
}
