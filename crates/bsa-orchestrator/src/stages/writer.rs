//! Proposal writer

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::context_filter::apply_context_filter;
use crate::prompts::writer::{build_proposal_prompt, build_proposal_refinement_context};
use bsa_agent::normalize::extract_markdown;
use bsa_agent::GenerateRequest;
use bsa_core::{BusinessAnalysis, ProposalImages, ProposalRequest, ResearchResult, SolutionDesign};
use chrono::NaiveDate;

pub const PROPOSAL_ERROR: &str = "# Error generating proposal";
const FALLBACK_ERROR: &str = "# Error generating proposal (Fallback)";

/// Inputs of one writer run
pub struct ProposalInputs<'a> {
    pub request: &'a ProposalRequest,
    pub research: &'a ResearchResult,
    pub business: &'a BusinessAnalysis,
    pub design: &'a SolutionDesign,
    pub images: &'a ProposalImages,
    pub feedback: Option<&'a str>,
    pub previous: Option<&'a str>,
}

/// Today's proposal date in the request's language
pub fn proposal_date(language: &str) -> String {
    format_proposal_date(chrono::Local::now().date_naive(), language)
}

/// Numeric short date: day first for Spanish, month first otherwise
pub fn format_proposal_date(date: NaiveDate, language: &str) -> String {
    if crate::proposal_sync::is_spanish(language) {
        date.format("%d/%m/%Y").to_string()
    } else {
        date.format("%m/%d/%Y").to_string()
    }
}

/// Write the full technical proposal as Markdown
///
/// Never fails: a primary-model failure falls back to the fast model once,
/// and a second failure yields the error document.
pub async fn generate_proposal(
    ctx: &StageContext,
    inputs: ProposalInputs<'_>,
    log: &mut ActivityLog,
) -> String {
    let request = inputs.request;
    let density = request.context_density.to_string().to_uppercase();
    log.thinking(format!(
        "[ReAct Writer] Analyzing Audience and Strategy for {} proposal (Context: {})...",
        request.language, density
    ));

    let filtered = apply_context_filter(inputs.research, inputs.business, request.context_density);
    let refinement = match (inputs.feedback, inputs.previous) {
        (Some(feedback), Some(previous)) if !previous.trim().is_empty() => {
            build_proposal_refinement_context(feedback)
        }
        _ => String::new(),
    };
    let prompt = build_proposal_prompt(
        request,
        inputs.design,
        &filtered,
        &proposal_date(&request.language),
        &refinement,
    );

    let primary = GenerateRequest::text(prompt.clone()).with_max_output_tokens(ctx.high_output());
    match ctx.gateway.generate(ctx.text_model(request), primary, 1).await {
        Ok(response) => {
            let mut markdown = extract_markdown(response.text_or(PROPOSAL_ERROR));
            log.info("[ReAct Writer] Text generated. Injecting visual assets...");
            if let Some(cover) = &inputs.images.cover_image {
                markdown = format!("![Cover Image]({})\n\n{}", cover, markdown);
            }
            markdown
        }
        Err(e) => {
            tracing::warn!("Primary writer model failed: {}", e);
            log.error(format!(
                "Primary model failed. Switching to fallback ({})...",
                ctx.flash()
            ));
            match ctx
                .gateway
                .generate(ctx.flash(), GenerateRequest::text(prompt), 1)
                .await
            {
                Ok(response) => extract_markdown(response.text_or(FALLBACK_ERROR)),
                Err(e) => {
                    tracing::warn!("Fallback writer model failed: {}", e);
                    PROPOSAL_ERROR.to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::mock_context;
    use bsa_agent::MockTransport;
    use bsa_core::BsaError;

    #[test]
    fn test_proposal_date_is_numeric_per_language() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(format_proposal_date(date, "Spanish"), "18/10/2026");
        assert_eq!(format_proposal_date(date, "English"), "10/18/2026");
    }

    #[derive(Default)]
    struct Fixture {
        request: ProposalRequest,
        research: ResearchResult,
        business: BusinessAnalysis,
        design: SolutionDesign,
        images: ProposalImages,
    }

    impl Fixture {
        fn with_cover() -> Self {
            Self {
                images: ProposalImages {
                    cover_image: Some("data:image/png;base64,AAA".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }
        }

        fn inputs(&self) -> ProposalInputs<'_> {
            ProposalInputs {
                request: &self.request,
                research: &self.research,
                business: &self.business,
                design: &self.design,
                images: &self.images,
                feedback: None,
                previous: None,
            }
        }
    }

    #[tokio::test]
    async fn test_cover_is_prepended() {
        let mock = MockTransport::new();
        mock.push_text("```markdown\n# Technical Proposal\n```");
        let (mock, ctx) = mock_context(mock);
        let fixture = Fixture::with_cover();
        let mut log = ActivityLog::new();

        let markdown = generate_proposal(&ctx, fixture.inputs(), &mut log).await;

        assert_eq!(
            markdown,
            "![Cover Image](data:image/png;base64,AAA)\n\n# Technical Proposal"
        );
        let (model, call) = &mock.calls()[0];
        assert_eq!(model, "gemini-3-pro-preview");
        assert_eq!(call.config.max_output_tokens, Some(65536));
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fast_model() {
        let mock = MockTransport::new();
        mock.push_error(BsaError::Api("500".to_string()));
        mock.push_error(BsaError::Api("500".to_string()));
        mock.push_text("# Fallback Proposal");
        let (mock, ctx) = mock_context(mock);
        let fixture = Fixture::with_cover();
        let mut log = ActivityLog::new();

        let markdown = generate_proposal(&ctx, fixture.inputs(), &mut log).await;

        // the fallback path does not inject the cover
        assert_eq!(markdown, "# Fallback Proposal");
        assert_eq!(mock.calls()[2].0, "gemini-3-flash-preview");
    }

    #[tokio::test]
    async fn test_total_failure_is_error_document() {
        let mock = MockTransport::new();
        for _ in 0..4 {
            mock.push_error(BsaError::Api("500".to_string()));
        }
        let (_, ctx) = mock_context(mock);
        let fixture = Fixture::default();
        let mut log = ActivityLog::new();

        let markdown = generate_proposal(&ctx, fixture.inputs(), &mut log).await;
        assert_eq!(markdown, PROPOSAL_ERROR);
    }

    #[tokio::test]
    async fn test_refinement_needs_previous_proposal() {
        let mock = MockTransport::new();
        mock.push_text("# Draft");
        mock.push_text("# Revised");
        let (mock, ctx) = mock_context(mock);
        let fixture = Fixture::default();
        let mut log = ActivityLog::new();

        let mut inputs = fixture.inputs();
        inputs.feedback = Some("Shorter");
        generate_proposal(&ctx, inputs, &mut log).await;

        let mut inputs = fixture.inputs();
        inputs.feedback = Some("Shorter");
        inputs.previous = Some("# Draft");
        generate_proposal(&ctx, inputs, &mut log).await;

        assert_eq!(mock.calls_matching("REFINEMENT MODE"), 1);
    }
}
