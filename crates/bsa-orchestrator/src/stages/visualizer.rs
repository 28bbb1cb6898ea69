//! Visualizer: cover image and infographics
//!
//! Image generation is never critical. Every failure ends as `None` plus a
//! log line, and the image call is made once without retries.

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::visualizer::{
    build_architecture_infographic_prompt, build_business_infographic_prompt,
    build_cost_infographic_prompt, build_cover_prompt, build_kyc_infographic_prompt,
    build_metacognition_infographic_prompt, with_instruction, CoverContext,
};
use bsa_agent::{GenerateRequest, LogoSource};
use bsa_core::fail_open::fail_open;
use bsa_core::{
    BusinessAnalysis, CostEstimation, ImageKind, MetacognitionAnalysis, ProposalRequest,
    ResearchResult, SolutionDesign,
};

/// Artifacts an image prompt may draw from
#[derive(Clone, Copy)]
pub struct ImageSources<'a> {
    pub request: &'a ProposalRequest,
    pub research: Option<&'a ResearchResult>,
    pub business: Option<&'a BusinessAnalysis>,
    pub design: Option<&'a SolutionDesign>,
    pub cost: Option<&'a CostEstimation>,
    pub metacognition: Option<&'a MetacognitionAnalysis>,
}

impl<'a> ImageSources<'a> {
    pub fn new(request: &'a ProposalRequest) -> Self {
        Self {
            request,
            research: None,
            business: None,
            design: None,
            cost: None,
            metacognition: None,
        }
    }

    fn cover_context(&self) -> CoverContext {
        CoverContext {
            summary: self.research.map(|r| r.summary.clone()).unwrap_or_default(),
            business_case: self.request.business_case.clone(),
            strategic_goals: self
                .research
                .map(|r| r.strategic_goals.iter().take(3).cloned().collect())
                .unwrap_or_default(),
            hyper_scaler: Some(self.request.hyper_scaler),
            problem_statement: self
                .business
                .map(|b| b.problem_statement.clone())
                .unwrap_or_default(),
        }
    }
}

/// Prompt for `kind`, or `None` when its source artifact is missing
pub fn image_prompt(kind: ImageKind, sources: &ImageSources<'_>) -> Option<String> {
    let request = sources.request;
    let language = request.language.as_str();
    match kind {
        ImageKind::Cover => Some(build_cover_prompt(
            &request.company_name,
            &sources.cover_context(),
        )),
        ImageKind::Kyc => sources
            .research
            .map(|r| build_kyc_infographic_prompt(&request.company_name, r, language)),
        ImageKind::Business => sources
            .business
            .map(|b| build_business_infographic_prompt(b, language)),
        ImageKind::Architecture => sources
            .design
            .map(|d| build_architecture_infographic_prompt(d, request.hyper_scaler, language)),
        ImageKind::Cost => sources
            .cost
            .map(|c| build_cost_infographic_prompt(c, language)),
        ImageKind::Metacognition => sources
            .metacognition
            .map(|m| build_metacognition_infographic_prompt(m, &request.company_name, language)),
    }
}

/// One image call; the first inline image comes back as a data URI
pub async fn generate_image(
    ctx: &StageContext,
    model: &str,
    prompt: String,
    label: &str,
    log: &mut ActivityLog,
) -> Option<String> {
    log.info(format!("[Visualizer] Generating {}...", label));

    let request = GenerateRequest::text(prompt).image_output();
    let operation = format!("image_generation[{}]", label);
    let Some(response) = fail_open(&operation, || ctx.gateway.generate(model, request, 0)).await
    else {
        log.error(format!("[Visualizer] Failed to generate {}.", label));
        return None;
    };

    match response.images.first() {
        Some(image) => {
            log.success(format!("[Visualizer] {} generated successfully.", label));
            Some(image.to_data_uri())
        }
        None => {
            log.info(format!(
                "[Visualizer] Warning: No image data returned for {}.",
                label
            ));
            None
        }
    }
}

/// Render one visual, optionally steered by a modification instruction
pub async fn render(
    ctx: &StageContext,
    kind: ImageKind,
    sources: &ImageSources<'_>,
    instruction: &str,
    log: &mut ActivityLog,
) -> Option<String> {
    let prompt = match image_prompt(kind, sources) {
        Some(prompt) => with_instruction(prompt, instruction),
        None => {
            tracing::debug!("Skipping {}: source artifact missing", kind.label());
            return None;
        }
    };
    let model = ctx.image_model(sources.request);
    generate_image(ctx, model, prompt, kind.label(), log).await
}

/// Cover image plus the customer logo found for it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverArt {
    pub cover: Option<String>,
    pub logo: Option<String>,
}

/// Generate the cover, then look up the customer logo
///
/// The logo is only fetched when a cover was produced.
pub async fn generate_cover_with_logo(
    ctx: &StageContext,
    sources: &ImageSources<'_>,
    instruction: &str,
    logos: Option<&dyn LogoSource>,
    log: &mut ActivityLog,
) -> CoverArt {
    let company = &sources.request.company_name;
    log.info(format!("[Visualizer] Generating cover image for {}...", company));

    let cover = render(ctx, ImageKind::Cover, sources, instruction, log).await;
    if cover.is_none() {
        log.info("[Visualizer] Warning: Base cover generation failed.");
        return CoverArt::default();
    }

    let logo = match logos {
        Some(source) => {
            log.info(format!("[Visualizer] Fetching {} logo...", company));
            let logo = source.fetch_company_logo(company).await;
            if logo.is_some() {
                log.success("[Visualizer] Customer logo retrieved successfully.");
            } else {
                log.info("[Visualizer] Customer logo not found.");
            }
            logo
        }
        None => None,
    };

    CoverArt { cover, logo }
}
