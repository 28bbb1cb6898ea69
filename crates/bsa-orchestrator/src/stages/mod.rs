//! Stage agents
//!
//! Each stage is a free async function over a [`StageContext`]: it builds a
//! prompt, calls the gateway, normalizes the response and either returns a
//! typed artifact or a fallback. Narration goes to the caller's
//! [`ActivityLog`](crate::ActivityLog).

pub mod architect;
pub mod business;
pub mod estimator;
pub mod expander;
pub mod expert;
pub mod metacognition;
pub mod researcher;
pub mod visualizer;
pub mod writer;

use bsa_agent::Gateway;
use bsa_core::config::ModelConfig;
use bsa_core::ProposalRequest;

/// Gateway plus model selection shared by every stage
#[derive(Clone)]
pub struct StageContext {
    pub gateway: Gateway,
    pub models: ModelConfig,
}

fn or_default<'a>(choice: &'a str, default: &'a str) -> &'a str {
    if choice.trim().is_empty() {
        default
    } else {
        choice
    }
}

impl StageContext {
    pub fn new(gateway: Gateway, models: ModelConfig) -> Self {
        Self { gateway, models }
    }

    /// The request's reasoning model, or the configured pro model
    pub fn text_model<'a>(&'a self, request: &'a ProposalRequest) -> &'a str {
        or_default(&request.text_model, &self.models.reasoning_pro)
    }

    /// The request's reasoning model, or the configured fast model
    pub fn text_model_or_flash<'a>(&'a self, request: &'a ProposalRequest) -> &'a str {
        or_default(&request.text_model, &self.models.reasoning_flash)
    }

    /// The request's image model, or the configured default image model
    pub fn image_model<'a>(&'a self, request: &'a ProposalRequest) -> &'a str {
        or_default(&request.image_model, &self.models.vision_flash)
    }

    pub fn flash(&self) -> &str {
        &self.models.reasoning_flash
    }

    /// Output budget for long-form generations
    pub fn high_output(&self) -> u32 {
        self.gateway.config().max_output_tokens
    }
}


#[cfg(test)]
mod tests {
    use super::testing::mock_context;
    use super::*;
    use bsa_agent::MockTransport;

    #[test]
    fn test_model_selection_defaults() {
        let (_, ctx) = mock_context(MockTransport::new());
        let mut request = ProposalRequest::default();

        assert_eq!(ctx.text_model(&request), "gemini-3-pro-preview");
        assert_eq!(ctx.text_model_or_flash(&request), "gemini-3-flash-preview");
        assert_eq!(ctx.image_model(&request), "gemini-2.5-flash-image");

        request.text_model = "custom-model".to_string();
        request.image_model = " ".to_string();
        assert_eq!(ctx.text_model(&request), "custom-model");
        assert_eq!(ctx.text_model_or_flash(&request), "custom-model");
        assert_eq!(ctx.image_model(&request), "gemini-2.5-flash-image");
    }
}
