//! Pipeline controller
//!
//! Owns every artifact of one proposal session. Discovery (research through
//! validated design) is driven by the pure state machine; everything after it
//! is a user action that runs exactly one stage. A failed action logs an
//! `error` entry and leaves the artifacts it did not produce untouched.

use crate::activity_log::ActivityLog;
use crate::proposal_sync::{self, SyncPreview};
use crate::stages::architect::{self, DesignInputs};
use crate::stages::expert::{self, DesignPatch, ExpertAction, ExpertActions, ExpertInputs};
use crate::stages::metacognition::{self, MetacognitionInputs};
use crate::stages::visualizer::{self, ImageSources};
use crate::stages::writer::{self, ProposalInputs};
use crate::stages::{business, estimator, expander, researcher, StageContext};
use crate::state_machine::{transition, Action, Event, State};
use async_trait::async_trait;
use bsa_agent::normalize::extract_markdown;
use bsa_agent::{Gateway, LogoSource};
use bsa_core::{
    AppStep, BsaConfig, BsaError, BusinessAnalysis, ChatMessage, ChatRole, CostEstimation,
    ExpandConfig, ExpandDensity, ExpandTarget, ImageKind, LogKind, MetacognitionAnalysis,
    ProposalImages, ProposalRequest, ResearchResult, Result, SessionData, SolutionDesign,
};
use bsa_validation::{AuditReport, Auditor, DesignValidator, ValidatorConfig};
use regex::{NoExpand, Regex};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

const MISSING_FOR_PROPOSAL: &str = "Missing required artifacts to generate proposal.";
const MISSING_FOR_DESIGN: &str = "Missing required artifacts to regenerate design.";
const MISSING_FOR_METACOGNITION: &str =
    "Missing required artifacts for metacognition analysis. Generate proposal and cost estimation first.";
const MISSING_FOR_SYNC: &str = "Cannot sync: missing cost estimation or proposal.";
const MISSING_FOR_REFINE_COST: &str = "Cannot refine cost without proposal context.";

/// Everything the stages have produced for the current request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub research: Option<ResearchResult>,
    pub business: Option<BusinessAnalysis>,
    pub design: Option<SolutionDesign>,
    pub proposal: String,
    pub cost: Option<CostEstimation>,
    pub metacognition: Option<MetacognitionAnalysis>,
    pub images: ProposalImages,
    /// Latest audit report
    pub evaluation: String,
}

impl Artifacts {
    fn sources<'a>(&'a self, request: &'a ProposalRequest) -> ImageSources<'a> {
        ImageSources {
            request,
            research: self.research.as_ref(),
            business: self.business.as_ref(),
            design: self.design.as_ref(),
            cost: self.cost.as_ref(),
            metacognition: self.metacognition.as_ref(),
        }
    }
}

fn missing(log: &mut ActivityLog, message: &str) -> BsaError {
    log.error(message);
    BsaError::MissingArtifact(message.to_string())
}

/// Render one visual and store it in its slot (a failed render keeps the old one)
async fn render_into(
    ctx: &StageContext,
    request: &ProposalRequest,
    artifacts: &mut Artifacts,
    kind: ImageKind,
    instruction: &str,
    log: &mut ActivityLog,
) -> Option<String> {
    let uri = {
        let sources = artifacts.sources(request);
        visualizer::render(ctx, kind, &sources, instruction, log).await
    };
    artifacts.images.set(kind, uri.clone());
    uri
}

/// Swap the data URI of an embedded `![<alt>](data:image/...)` image
fn replace_embedded_image(markdown: &str, alt: &str, uri: &str) -> String {
    let pattern = format!(r"!\[{}\]\(data:image/[^)]+\)", regex::escape(alt));
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace(markdown, NoExpand(&format!("![{}]({})", alt, uri)))
            .into_owned(),
        Err(_) => markdown.to_string(),
    }
}

/// Proposal session controller
pub struct Pipeline {
    ctx: StageContext,
    state: State,
    request: Option<ProposalRequest>,
    artifacts: Artifacts,
    log: ActivityLog,
    chat: Vec<ChatMessage>,
    rates: BTreeMap<String, f64>,
    logos: Option<Arc<dyn LogoSource>>,
}

impl Pipeline {
    pub fn new(gateway: Gateway, config: &BsaConfig) -> Self {
        Self {
            ctx: StageContext::new(gateway, config.models.clone()),
            state: State::Idle,
            request: None,
            artifacts: Artifacts::default(),
            log: ActivityLog::new(),
            chat: Vec::new(),
            rates: config.cost.rates.clone(),
            logos: None,
        }
    }

    /// Look up customer logos when generating the cover
    pub fn with_logo_source(mut self, logos: Arc<dyn LogoSource>) -> Self {
        self.logos = Some(logos);
        self
    }

    /// Rebuild a pipeline from a saved session
    pub fn from_session(gateway: Gateway, config: &BsaConfig, data: SessionData) -> Self {
        let mut pipeline = Self::new(gateway, config);
        if let Some(request) = &data.request {
            pipeline.ctx.gateway = pipeline.ctx.gateway.with_api_delay(request.api_delay);
        }

        pipeline.state = if data.design.is_some() {
            State::AwaitingApproval
        } else if data.step == AppStep::Input {
            State::Idle
        } else {
            State::Failed {
                error: "Discovery did not finish before the session was saved".to_string(),
                step: data.step,
            }
        };
        pipeline.request = data.request;
        pipeline.artifacts = Artifacts {
            research: data.research,
            business: data.business,
            design: data.design,
            proposal: data.proposal_markdown,
            cost: data.cost_estimation,
            metacognition: data.metacognition,
            images: data.images,
            evaluation: data.evaluation_markdown,
        };
        pipeline.log = ActivityLog::from(data.logs);
        pipeline.chat = data.chat_history;
        pipeline
    }

    /// Serializable copy of the session
    pub fn snapshot(&self) -> SessionData {
        SessionData {
            request: self.request.clone(),
            research: self.artifacts.research.clone(),
            business: self.artifacts.business.clone(),
            design: self.artifacts.design.clone(),
            proposal_markdown: self.artifacts.proposal.clone(),
            cost_estimation: self.artifacts.cost.clone(),
            metacognition: self.artifacts.metacognition.clone(),
            images: self.artifacts.images.clone(),
            evaluation_markdown: self.artifacts.evaluation.clone(),
            step: self.step(),
            logs: self.log.entries().to_vec(),
            chat_history: self.chat.clone(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// UI phase derived from the state machine
    pub fn step(&self) -> AppStep {
        self.state.app_step()
    }

    pub fn request(&self) -> Option<&ProposalRequest> {
        self.request.as_ref()
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Expert chat turns, oldest first
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat
    }

    // ============ DISCOVERY ============

    /// Research, business analysis, design and validation for a new request
    ///
    /// Resets every artifact and the activity log first. Ends in
    /// `AwaitingApproval`; proposal generation is a separate action.
    pub async fn run_discovery(&mut self, request: ProposalRequest) -> Result<()> {
        self.ctx.gateway = self.ctx.gateway.with_api_delay(request.api_delay);
        self.artifacts = Artifacts::default();
        self.log.clear();
        self.state = State::Idle;

        self.log.info(format!(
            "Initialized agent for company: {}",
            request.company_name
        ));
        self.log.info(format!(
            "Configuration: Density={}, API Delay={}s",
            request.context_density.to_string().to_uppercase(),
            request.api_delay
        ));

        let start = Event::Start {
            company: request.company_name.clone(),
            language: request.language.clone(),
        };
        self.request = Some(request);
        self.dispatch(start).await
    }

    /// Fresh design, validated, with at most one corrective pass
    pub async fn regenerate_design(&mut self) -> Result<()> {
        if self.request.is_none()
            || self.artifacts.research.is_none()
            || self.artifacts.business.is_none()
        {
            return Err(missing(&mut self.log, MISSING_FOR_DESIGN));
        }

        self.state = State::Designing;
        let actions = VecDeque::from([
            Action::Log {
                message: "Regenerating Solution Architecture based on latest Strategy..."
                    .to_string(),
                kind: LogKind::Thinking,
            },
            Action::RunDesign { feedback: None },
        ]);
        self.drive(actions).await
    }

    async fn dispatch(&mut self, event: Event) -> Result<()> {
        let (next, actions) = transition(std::mem::take(&mut self.state), event);
        self.state = next;
        self.drive(actions.into()).await
    }

    /// Execute actions in order, feeding produced events back into the machine
    async fn drive(&mut self, mut pending: VecDeque<Action>) -> Result<()> {
        while let Some(action) = pending.pop_front() {
            if let Some(event) = self.execute(action).await {
                debug!("Pipeline event: {:?}", event);
                let (next, actions) = transition(std::mem::take(&mut self.state), event);
                self.state = next;
                pending.extend(actions);
            }
        }

        match &self.state {
            State::Failed { error, .. } => Err(BsaError::stage("discovery", error)),
            state => {
                info!("Pipeline settled in {:?}", state);
                Ok(())
            }
        }
    }

    async fn execute(&mut self, action: Action) -> Option<Event> {
        let Some(request) = self.request.as_ref() else {
            return Some(Event::Error {
                message: "No proposal request".to_string(),
            });
        };

        match action {
            Action::Log { message, kind } => {
                self.log.push(message, kind);
                None
            }
            Action::RunResearch => {
                let research = researcher::conduct_research(
                    &self.ctx,
                    &request.company_name,
                    &request.language,
                    &mut self.log,
                )
                .await;
                self.artifacts.research = Some(research);
                Some(Event::ResearchComplete)
            }
            Action::RunBusinessAnalysis => {
                let analysis = business::analyze_business_case(
                    &self.ctx,
                    &request.company_name,
                    &request.business_case,
                    &request.language,
                    &mut self.log,
                )
                .await;
                self.artifacts.business = Some(analysis);
                Some(Event::BusinessComplete)
            }
            Action::RenderInfographic(kind) => {
                render_into(&self.ctx, request, &mut self.artifacts, kind, "", &mut self.log).await;
                None
            }
            Action::RunDesign { feedback } => {
                let (Some(research), Some(business)) = (
                    self.artifacts.research.as_ref(),
                    self.artifacts.business.as_ref(),
                ) else {
                    return Some(Event::Error {
                        message: "Design needs research and business analysis".to_string(),
                    });
                };
                let inputs = DesignInputs {
                    request,
                    research,
                    business,
                    feedback: feedback.as_deref(),
                    current: self.artifacts.design.as_ref(),
                };
                let design = architect::design_solution(&self.ctx, inputs, &mut self.log).await;
                self.artifacts.design = Some(design);
                Some(Event::DesignComplete)
            }
            Action::RunValidation => {
                let (Some(business), Some(design)) = (
                    self.artifacts.business.as_ref(),
                    self.artifacts.design.as_ref(),
                ) else {
                    return Some(Event::Error {
                        message: "Validation needs a design".to_string(),
                    });
                };
                let validator = DesignValidator::new(
                    self.ctx.gateway.clone(),
                    ValidatorConfig::new(self.ctx.flash()),
                );
                let verdict = validator.validate(business, design).await;
                if let Some(reason) = &verdict.fail_open_reason {
                    self.log.info(format!(
                        "[Validator] {} ({})",
                        verdict.result.critique, reason
                    ));
                }

                let score = verdict.result.score;
                if verdict.needs_redesign() {
                    Some(Event::ValidationFailed {
                        score,
                        critique: verdict.result.critique,
                    })
                } else {
                    Some(Event::ValidationPassed { score })
                }
            }
        }
    }

    // ============ DESIGN ============

    /// Mark the current design as approved for proposal generation
    pub fn approve_design(&mut self) -> Result<()> {
        let Some(design) = self.artifacts.design.as_mut() else {
            return Err(missing(&mut self.log, "No solution design to approve."));
        };
        design.is_approved = Some(true);
        self.log.success("Architecture approved.");
        Ok(())
    }

    /// Revise the current design following user feedback
    pub async fn refine_design(&mut self, feedback: &str) -> Result<()> {
        let (Some(request), Some(research), Some(business), Some(current)) = (
            self.request.as_ref(),
            self.artifacts.research.as_ref(),
            self.artifacts.business.as_ref(),
            self.artifacts.design.as_ref(),
        ) else {
            return Err(missing(&mut self.log, "Missing required artifacts to refine design."));
        };

        self.log
            .thinking("Refining Architecture based on user feedback...");
        let inputs = DesignInputs {
            request,
            research,
            business,
            feedback: Some(feedback),
            current: Some(current),
        };
        let design = architect::design_solution(&self.ctx, inputs, &mut self.log).await;
        self.artifacts.design = Some(design);
        self.log.success(
            "Architecture updated successfully. Generate the proposal document when ready.",
        );
        Ok(())
    }

    /// Replace the diagram (and optionally the overview and rationale) of the current design
    pub fn update_design(&mut self, patch: &DesignPatch) -> Result<()> {
        let Some(design) = self.artifacts.design.as_mut() else {
            return Err(missing(&mut self.log, "No solution design to update."));
        };
        let patch = DesignPatch {
            mermaid_code: extract_markdown(&patch.mermaid_code),
            ..patch.clone()
        };
        patch.apply(design);
        self.log.success("Architecture updated via Chat Agent.");
        Ok(())
    }

    // ============ PROPOSAL ============

    /// Cover image (plus customer logo), then the proposal draft
    pub async fn generate_proposal(&mut self) -> Result<()> {
        let (Some(request), Some(research), Some(business), Some(design)) = (
            self.request.as_ref(),
            self.artifacts.research.as_ref(),
            self.artifacts.business.as_ref(),
            self.artifacts.design.as_ref(),
        ) else {
            return Err(missing(&mut self.log, MISSING_FOR_PROPOSAL));
        };

        self.log.thinking("Generating cover image with logos...");
        let art = {
            let sources = self.artifacts.sources(request);
            visualizer::generate_cover_with_logo(
                &self.ctx,
                &sources,
                "",
                self.logos.as_deref(),
                &mut self.log,
            )
            .await
        };
        self.artifacts.images.set(ImageKind::Cover, art.cover);
        if art.logo.is_some() {
            self.artifacts.images.customer_logo = art.logo;
        }

        self.log.thinking(format!(
            "Drafting initial proposal (Density: {})...",
            request.context_density
        ));
        let inputs = ProposalInputs {
            request,
            research,
            business,
            design,
            images: &self.artifacts.images,
            feedback: None,
            previous: None,
        };
        let proposal = writer::generate_proposal(&self.ctx, inputs, &mut self.log).await;
        self.artifacts.proposal = proposal;
        self.log.success("Initial draft generated.");
        self.log.success("Proposal generated. Ready for review.");
        Ok(())
    }

    /// Rewrite the proposal following user feedback
    pub async fn refine_proposal(&mut self, feedback: &str) -> Result<()> {
        let (Some(request), Some(research), Some(business), Some(design)) = (
            self.request.as_ref(),
            self.artifacts.research.as_ref(),
            self.artifacts.business.as_ref(),
            self.artifacts.design.as_ref(),
        ) else {
            return Err(missing(&mut self.log, "Missing required artifacts to refine proposal."));
        };

        self.log
            .thinking("Refining Proposal based on user feedback...");
        let inputs = ProposalInputs {
            request,
            research,
            business,
            design,
            images: &self.artifacts.images,
            feedback: Some(feedback),
            previous: Some(self.artifacts.proposal.as_str()),
        };
        let proposal = writer::generate_proposal(&self.ctx, inputs, &mut self.log).await;
        self.artifacts.proposal = proposal;
        self.log.success("Proposal updated based on feedback.");
        self.log.success("Proposal generated. Ready for review.");
        Ok(())
    }

    /// Replace the proposal with a manually edited version
    pub fn update_proposal(&mut self, markdown: impl Into<String>) {
        self.artifacts.proposal = markdown.into();
        debug!("Proposal replaced manually ({} chars)", self.artifacts.proposal.len());
    }

    /// SMART audit of the current proposal
    pub async fn audit_proposal(&mut self) -> Result<AuditReport> {
        let Some(request) = self.request.as_ref() else {
            return Err(missing(&mut self.log, "No proposal to audit."));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, "No proposal to audit."));
        }

        self.log.thinking("Manual SMART Audit triggered...");
        let auditor = Auditor::new(self.ctx.gateway.clone(), self.ctx.flash());
        let report = auditor
            .evaluate(&self.artifacts.proposal, &request.company_name, &request.language)
            .await;

        self.artifacts.evaluation = report.markdown.clone();
        match &report.failure {
            Some(reason) => self.log.error(format!("Audit Error: {}", reason)),
            None => self
                .log
                .success(format!("Audit Complete. New Score: {}/100", report.score)),
        }
        Ok(report)
    }

    // ============ COST ============

    /// First cost estimation for the proposal, plus its infographic
    pub async fn estimate_cost(&mut self) -> Result<()> {
        let Some(request) = self.request.as_ref() else {
            return Err(missing(&mut self.log, "Generate the proposal before estimating cost."));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, "Generate the proposal before estimating cost."));
        }

        self.log
            .thinking("Initiating Execution Cost Estimation (Agentic)...");
        let estimation = estimator::generate_cost_estimation(
            &self.ctx,
            request,
            &self.artifacts.proposal,
            &self.rates,
            &mut self.log,
        )
        .await;

        match estimation {
            Ok(estimation) => {
                self.artifacts.cost = Some(estimation);
                self.log.success("Cost Estimation generated successfully.");
                render_into(&self.ctx, request, &mut self.artifacts, ImageKind::Cost, "", &mut self.log)
                    .await;
                Ok(())
            }
            Err(e) => {
                self.log
                    .error(format!("Error generating cost estimation: {}", e));
                Err(e)
            }
        }
    }

    /// Rework the cost plan following a user instruction
    pub async fn refine_cost(&mut self, instruction: &str) -> Result<()> {
        let (Some(request), Some(current)) = (self.request.as_ref(), self.artifacts.cost.as_ref())
        else {
            return Err(missing(&mut self.log, MISSING_FOR_REFINE_COST));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, MISSING_FOR_REFINE_COST));
        }

        self.log
            .thinking(format!("Refining cost plan: \"{}\"...", instruction));
        let refined = estimator::refine_cost_estimation(
            &self.ctx,
            request,
            current,
            instruction,
            &self.artifacts.proposal,
            &mut self.log,
        )
        .await;

        match refined {
            Ok(refined) => {
                self.artifacts.cost = Some(refined);
                self.log.success("Cost plan refined.");
                Ok(())
            }
            Err(e) => {
                self.log.error(format!("Error refining cost: {}", e));
                Err(e)
            }
        }
    }

    /// Store a manually edited estimation and redraw its infographic
    pub async fn save_cost_estimation(&mut self, edited: CostEstimation) -> Result<()> {
        let Some(request) = self.request.as_ref() else {
            return Err(missing(&mut self.log, "No proposal request."));
        };

        self.log.thinking("Saving cost estimation changes...");
        self.artifacts.cost = Some(edited);
        self.log
            .thinking("Regenerating cost infographic with updated plan...");
        render_into(&self.ctx, request, &mut self.artifacts, ImageKind::Cost, "", &mut self.log)
            .await;
        self.log
            .success("Cost estimation saved and infographic regenerated.");
        Ok(())
    }

    /// Team and timeline sections a sync would write, next to the current ones
    pub fn preview_cost_sync(&mut self) -> Result<SyncPreview> {
        let (Some(request), Some(cost)) = (self.request.as_ref(), self.artifacts.cost.as_ref())
        else {
            return Err(missing(&mut self.log, MISSING_FOR_SYNC));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, MISSING_FOR_SYNC));
        }

        let preview = proposal_sync::preview(&self.artifacts.proposal, cost, &request.language);
        self.log.thinking("Generating sync preview...");
        Ok(preview)
    }

    /// Rewrite the proposal's team and timeline sections from the estimation
    pub fn sync_proposal_with_cost(&mut self) -> Result<()> {
        let (Some(request), Some(cost)) = (self.request.as_ref(), self.artifacts.cost.as_ref())
        else {
            return Err(missing(&mut self.log, MISSING_FOR_SYNC));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, MISSING_FOR_SYNC));
        }

        self.artifacts.proposal =
            proposal_sync::apply(&self.artifacts.proposal, cost, &request.language);
        self.log
            .success("Proposal updated with Delivery Team and WBS from Cost Estimation.");
        Ok(())
    }

    // ============ METACOGNITION ============

    /// Three-perspective analysis, plus its infographic
    pub async fn analyze_metacognition(&mut self) -> Result<()> {
        let (Some(request), Some(research), Some(business), Some(design), Some(cost)) = (
            self.request.as_ref(),
            self.artifacts.research.as_ref(),
            self.artifacts.business.as_ref(),
            self.artifacts.design.as_ref(),
            self.artifacts.cost.as_ref(),
        ) else {
            return Err(missing(&mut self.log, MISSING_FOR_METACOGNITION));
        };
        if self.artifacts.proposal.trim().is_empty() {
            return Err(missing(&mut self.log, MISSING_FOR_METACOGNITION));
        }

        self.log.thinking("Starting Metacognition Analysis...");
        let inputs = MetacognitionInputs {
            request,
            research,
            business,
            design,
            cost,
        };
        let analysis = match metacognition::analyze_metacognition(&self.ctx, inputs, &mut self.log)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                self.log
                    .error(format!("Metacognition analysis failed: {}", e));
                return Err(e);
            }
        };
        self.artifacts.metacognition = Some(analysis);
        self.log.success("Metacognition analysis complete.");

        self.log
            .thinking("Generating Metacognition Infographic...");
        let image = render_into(
            &self.ctx,
            request,
            &mut self.artifacts,
            ImageKind::Metacognition,
            "",
            &mut self.log,
        )
        .await;
        if image.is_some() {
            self.log.success("Metacognition Infographic generated.");
        }
        Ok(())
    }

    // ============ EXPANSION ============

    /// Deep-dive on one section; the text is stored with its artifact and returned
    pub async fn expand_section(
        &mut self,
        target: ExpandTarget,
        section: &str,
        config: &ExpandConfig,
    ) -> Result<String> {
        let Some(request) = self.request.as_ref() else {
            return Err(missing(&mut self.log, "No proposal request."));
        };
        let language = request.language.as_str();

        match target {
            ExpandTarget::Kyc => {
                let Some(research) = self.artifacts.research.as_ref() else {
                    return Err(missing(&mut self.log, "No research to expand."));
                };
                self.log.thinking(format!(
                    "Expanding KYC section: {} (Density: {:?})...",
                    section, config.density
                ));
                let text = expander::expand_research_section(
                    &self.ctx,
                    &request.company_name,
                    section,
                    research,
                    language,
                    config,
                    &mut self.log,
                )
                .await;
                if let Some(research) = self.artifacts.research.as_mut() {
                    research
                        .expanded_content
                        .insert(section.to_string(), text.clone());
                }
                self.log
                    .success(format!("Section {} expanded successfully.", section));
                Ok(text)
            }
            ExpandTarget::Business => {
                let Some(analysis) = self.artifacts.business.as_ref() else {
                    return Err(missing(&mut self.log, "No business analysis to expand."));
                };
                self.log.thinking(format!(
                    "Expanding Business Case section: {} (Density: {:?})...",
                    section, config.density
                ));
                let text = expander::expand_business_section(
                    &self.ctx,
                    section,
                    analysis,
                    language,
                    config,
                    &mut self.log,
                )
                .await;
                if let Some(analysis) = self.artifacts.business.as_mut() {
                    analysis
                        .expanded_content
                        .insert(section.to_string(), text.clone());
                }
                self.log.success(format!(
                    "Business section {} expanded successfully.",
                    section
                ));
                Ok(text)
            }
            ExpandTarget::Design => {
                let Some(design) = self.artifacts.design.as_ref() else {
                    return Err(missing(&mut self.log, "No solution design to expand."));
                };
                self.log.thinking(format!(
                    "Expanding Architecture section: {} (Density: {:?})...",
                    section, config.density
                ));
                let text = expander::expand_design_section(
                    &self.ctx,
                    section,
                    design,
                    language,
                    config,
                    &mut self.log,
                )
                .await;
                if let Some(design) = self.artifacts.design.as_mut() {
                    design
                        .expanded_content
                        .insert(section.to_string(), text.clone());
                }
                self.log.success(format!(
                    "Architecture section {} expanded successfully.",
                    section
                ));
                Ok(text)
            }
            ExpandTarget::Proposal => {
                if self.artifacts.proposal.trim().is_empty() {
                    return Err(missing(&mut self.log, "No proposal to expand."));
                }
                self.log.thinking(format!(
                    "Expanding proposal section: {} (Density: {:?})...",
                    section, config.density
                ));
                let text = expander::expand_proposal_section(
                    &self.ctx,
                    section,
                    &self.artifacts.proposal,
                    &request.business_case,
                    language,
                    config,
                    &mut self.log,
                )
                .await;
                self.artifacts.proposal =
                    expander::insert_proposal_expansion(&self.artifacts.proposal, section, &text);
                self.log
                    .success(format!("Section '{}' expanded successfully.", section));
                Ok(text)
            }
            ExpandTarget::Metacognition => {
                let Some(analysis) = self.artifacts.metacognition.as_ref() else {
                    return Err(missing(&mut self.log, "No metacognition analysis to expand."));
                };
                self.log
                    .thinking(format!("Expanding metacognition section: {}...", section));
                let text = expander::expand_metacognition_section(
                    &self.ctx,
                    request,
                    section,
                    analysis,
                    &mut self.log,
                )
                .await;
                if let Some(analysis) = self.artifacts.metacognition.as_mut() {
                    analysis
                        .expanded_content
                        .insert(section.to_string(), text.clone());
                }
                self.log
                    .success(format!("Metacognition section '{}' expanded.", section));
                Ok(text)
            }
        }
    }

    /// Replace (`Some`) or delete (`None`) a stored expansion
    pub fn update_expanded(
        &mut self,
        target: ExpandTarget,
        section: &str,
        content: Option<String>,
    ) -> Result<()> {
        let (expanded, label) = match target {
            ExpandTarget::Kyc => (
                self.artifacts.research.as_mut().map(|r| &mut r.expanded_content),
                "KYC",
            ),
            ExpandTarget::Business => (
                self.artifacts.business.as_mut().map(|b| &mut b.expanded_content),
                "BUSINESS",
            ),
            ExpandTarget::Design => (
                self.artifacts.design.as_mut().map(|d| &mut d.expanded_content),
                "DESIGN",
            ),
            ExpandTarget::Metacognition => (
                self.artifacts
                    .metacognition
                    .as_mut()
                    .map(|m| &mut m.expanded_content),
                "METACOGNITION",
            ),
            ExpandTarget::Proposal => {
                return Err(BsaError::Other(
                    "Proposal sections are edited through update_proposal".to_string(),
                ))
            }
        };
        let Some(expanded) = expanded else {
            return Err(missing(
                &mut self.log,
                &format!("No {} artifact to update.", label.to_lowercase()),
            ));
        };

        let verb = match content {
            Some(content) => {
                expanded.insert(section.to_string(), content);
                "updated"
            }
            None => {
                expanded.remove(section);
                "deleted"
            }
        };
        self.log.info(format!(
            "{} section '{}' {} manually.",
            label, section, verb
        ));
        Ok(())
    }

    // ============ VISUALS ============

    /// Regenerate one visual, optionally steered by an instruction
    ///
    /// A new cover also refreshes the customer logo, and an image embedded in
    /// the proposal is swapped for the new one.
    pub async fn regenerate_image(
        &mut self,
        kind: ImageKind,
        instruction: &str,
    ) -> Result<Option<String>> {
        let Some(request) = self.request.as_ref() else {
            return Err(missing(&mut self.log, "No proposal request."));
        };
        if visualizer::image_prompt(kind, &self.artifacts.sources(request)).is_none() {
            return Err(missing(
                &mut self.log,
                &format!("Cannot regenerate {}: source artifact missing.", kind.label()),
            ));
        }

        self.log
            .thinking(format!("Regenerating {}...", kind.label()));
        let uri = match kind {
            ImageKind::Cover => {
                let art = {
                    let sources = self.artifacts.sources(request);
                    visualizer::generate_cover_with_logo(
                        &self.ctx,
                        &sources,
                        instruction,
                        self.logos.as_deref(),
                        &mut self.log,
                    )
                    .await
                };
                if art.logo.is_some() {
                    self.artifacts.images.customer_logo = art.logo;
                }
                self.artifacts.images.set(ImageKind::Cover, art.cover.clone());
                art.cover
            }
            _ => {
                render_into(
                    &self.ctx,
                    request,
                    &mut self.artifacts,
                    kind,
                    instruction,
                    &mut self.log,
                )
                .await
            }
        };

        match &uri {
            Some(uri) => {
                self.artifacts.proposal =
                    replace_embedded_image(&self.artifacts.proposal, kind.label(), uri);
                self.log
                    .success(format!("{} updated successfully.", kind.label()));
            }
            None => self
                .log
                .error(format!("Error regenerating {}.", kind.label())),
        }
        Ok(uri)
    }

    // ============ EXPERT CHAT ============

    /// One turn with the expert assistant; always yields a reply
    ///
    /// The assistant sees the current artifacts and recent logs, and may
    /// regenerate a visual, expand a KYC section or patch the design through
    /// tool calls. Both turns are kept in the chat history.
    pub async fn chat_with_expert(&mut self, message: &str, image: Option<String>) -> String {
        let request = {
            let inputs = ExpertInputs {
                research: self.artifacts.research.as_ref(),
                design: self.artifacts.design.as_ref(),
                proposal: &self.artifacts.proposal,
                cost: self.artifacts.cost.as_ref(),
                logs: self.log.entries(),
            };
            expert::chat_request(&inputs, &self.chat, message, image.as_deref())
        };
        let shown = match (message.trim().is_empty(), image.is_some()) {
            (true, true) => "[Image attached]",
            _ => message,
        };
        let turn = ChatMessage::new(ChatRole::User, shown).with_image(image);
        self.chat.push(turn);

        let ctx = self.ctx.clone();
        let reply = match expert::converse(&ctx, request, self).await {
            Ok(reply) => reply,
            Err(e) => {
                self.log.error(format!("Expert chat failed: {}", e));
                expert::OVERLOADED_REPLY.to_string()
            }
        };
        debug!("Expert reply: {} chars", reply.len());
        self.chat.push(ChatMessage::new(ChatRole::Model, &reply));
        reply
    }

    /// Switch the models used for the rest of the session
    pub fn update_models(&mut self, text_model: &str, image_model: &str) -> Result<()> {
        let Some(request) = self.request.as_mut() else {
            return Err(missing(&mut self.log, "No proposal request."));
        };
        request.text_model = text_model.to_string();
        request.image_model = image_model.to_string();
        self.log.info(format!(
            "Configuration updated: Text=[{}], Image=[{}]",
            text_model, image_model
        ));
        Ok(())
    }
}

#[async_trait(?Send)]
impl ExpertActions for Pipeline {
    async fn perform(&mut self, action: &ExpertAction) -> Result<()> {
        match action {
            ExpertAction::RegenerateImage { kind, instruction } => {
                self.regenerate_image(*kind, instruction).await.map(|_| ())
            }
            ExpertAction::ExpandKycSection { section } => {
                let config = ExpandConfig {
                    instruction: String::new(),
                    density: ExpandDensity::High,
                };
                self.expand_section(ExpandTarget::Kyc, section, &config)
                    .await
                    .map(|_| ())
            }
            ExpertAction::UpdateDesign(patch) => self.update_design(patch),
        }
    }
}
