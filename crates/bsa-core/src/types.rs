//! Artifact types shared by every pipeline stage

use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Expanded Markdown blocks keyed by section name
pub type ExpandedContent = BTreeMap<String, String>;

/// Cloud provider the solution is designed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HyperScaler {
    #[default]
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
    #[serde(rename = "OCI")]
    Oci,
}

impl fmt::Display for HyperScaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperScaler::Aws => write!(f, "AWS"),
            HyperScaler::Azure => write!(f, "Azure"),
            HyperScaler::Gcp => write!(f, "GCP"),
            HyperScaler::Oci => write!(f, "OCI"),
        }
    }
}

impl FromStr for HyperScaler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(HyperScaler::Aws),
            "azure" => Ok(HyperScaler::Azure),
            "gcp" => Ok(HyperScaler::Gcp),
            "oci" => Ok(HyperScaler::Oci),
            _ => Err(format!(
                "Invalid hyperscaler: {}. Use aws, azure, gcp, or oci.",
                s
            )),
        }
    }
}

/// How much upstream detail is forwarded into downstream prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextDensity {
    Low,
    Medium,
    #[default]
    High,
}

impl fmt::Display for ContextDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextDensity::Low => write!(f, "low"),
            ContextDensity::Medium => write!(f, "medium"),
            ContextDensity::High => write!(f, "high"),
        }
    }
}

impl FromStr for ContextDensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ContextDensity::Low),
            "medium" => Ok(ContextDensity::Medium),
            "high" => Ok(ContextDensity::High),
            _ => Err(format!(
                "Invalid context density: {}. Use low, medium, or high.",
                s
            )),
        }
    }
}

/// User input that starts a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalRequest {
    pub company_name: String,
    pub business_case: String,
    pub hyper_scaler: HyperScaler,
    pub language: String,
    /// Primary reasoning model; empty means the configured default
    pub text_model: String,
    pub image_model: String,
    pub context_density: ContextDensity,
    /// Seconds to pause before every model call
    pub api_delay: u64,
}

// ============ KYC RESEARCH ============

/// A cited web source from a grounded call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competitors {
    #[serde(deserialize_with = "lenient::string_list")]
    pub global: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub local: Vec<String>,
}

impl Competitors {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.local.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Swot {
    #[serde(deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub opportunities: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub threats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailedAnalysis {
    pub industry_landscape: String,
    /// Challenges, prohibitions and consequences of inaction
    #[serde(deserialize_with = "lenient::string_list")]
    pub challenges_and_risks: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub key_stakeholders: Vec<String>,
    pub hyperscaler_affinity: String,
    pub business_maturity: String,
    pub ea_maturity: String,
    pub gen_ai_maturity: String,
    pub competitors: Competitors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swot: Option<Swot>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub regulatory_constraints: Vec<String>,
}

/// KYC findings for the client company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchResult {
    pub summary: String,
    #[serde(deserialize_with = "lenient::list")]
    pub sources: Vec<Source>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub strategic_goals: Vec<String>,
    pub detailed_analysis: DetailedAnalysis,
    pub expanded_content: ExpandedContent,
}

impl ResearchResult {
    /// Sparse research lacks risks or competitors and earns one repair pass
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.detailed_analysis.challenges_and_risks.is_empty() {
            Some("Challenges & Risks")
        } else if self.detailed_analysis.competitors.is_empty() {
            Some("Competitors")
        } else {
            None
        }
    }
}

// ============ BUSINESS ANALYSIS ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessValue {
    pub roi: String,
    pub efficiency_gains: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub other_benefits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessAnalysis {
    pub problem_statement: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub root_cause_analysis: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub current_process_flaws: Vec<String>,
    pub expected_business_value: BusinessValue,
    #[serde(deserialize_with = "lenient::string_list")]
    pub key_pain_points: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub user_stories: Vec<String>,
    pub mermaid_diagram: String,
    pub expanded_content: ExpandedContent,
}

// ============ SOLUTION DESIGN ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessTechMap {
    pub business_goal: String,
    pub technical_solution: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolutionDesign {
    pub architecture_overview: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub key_components: Vec<String>,
    pub rationale: String,
    pub mermaid_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_process: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub business_mapping: Vec<BusinessTechMap>,
    pub expanded_content: ExpandedContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
}

/// Verdict of the design validator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Completeness score, 0-10
    pub score: f32,
    /// What the design is missing, addressed to the architect
    pub critique: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub missing_requirements: Vec<String>,
}

// ============ COST ESTIMATION ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stress {
    pub level: StressLevel,
    /// 1 = sustainable, 10 = burnout
    #[serde(deserialize_with = "lenient::whole_number")]
    pub score: u8,
    pub note: String,
}

/// Hours in a full-time week, used to turn allocation percentages into cost
pub const HOURS_PER_WEEK: f64 = 40.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleAllocation {
    pub role: String,
    pub hourly_rate: f64,
    /// Week number (as string key) to allocation percentage 0-100
    pub allocations: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<Stress>,
}

impl RoleAllocation {
    /// Total billable hours across all weeks
    pub fn hours(&self) -> f64 {
        self.allocations
            .values()
            .map(|pct| pct / 100.0 * HOURS_PER_WEEK)
            .sum()
    }

    pub fn cost(&self) -> f64 {
        self.hours() * self.hourly_rate
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyPlan {
    #[serde(deserialize_with = "lenient::whole_number")]
    pub total_weeks: u32,
    #[serde(deserialize_with = "lenient::list")]
    pub roles: Vec<RoleAllocation>,
    pub total_cost: f64,
    /// Markdown explanation of role selection and phasing
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friction_analysis: Option<String>,
}

impl WeeklyPlan {
    /// Cost recomputed from rates and allocations
    pub fn computed_total_cost(&self) -> f64 {
        self.roles.iter().map(RoleAllocation::cost).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalComparison {
    #[serde(deserialize_with = "lenient::whole_number")]
    pub proposed_weeks: u32,
    #[serde(deserialize_with = "lenient::whole_number")]
    pub optimal_weeks: u32,
    #[serde(deserialize_with = "lenient::whole_number")]
    pub weeks_difference: i64,
    pub cost_difference: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostEstimation {
    pub optimal_plan: WeeklyPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_comparison: Option<ProposalComparison>,
    /// Set when the plan was edited after generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dirty: Option<bool>,
}

// ============ METACOGNITION ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerPerspective {
    #[serde(deserialize_with = "lenient::string_list")]
    pub stated_goals: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub implicit_assumptions: Vec<String>,
    pub risk_tolerance: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub organizational_constraints: Vec<String>,
    pub success_definition: String,
}

/// The delivery team's own view of the engagement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderPerspective {
    #[serde(deserialize_with = "lenient::string_list")]
    pub delivery_strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub potential_gaps: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub resource_considerations: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub commercial_factors: Vec<String>,
    pub experience_relevance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalPerspective {
    #[serde(deserialize_with = "lenient::string_list")]
    pub promised_outcomes: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub implicit_commitments: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub scope_boundaries: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub dependency_assumptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsonanceItem {
    pub dimension: String,
    pub customer_view: String,
    pub proposal_promise: String,
    #[serde(alias = "nubiralCapability")]
    pub provider_capability: String,
    /// 1 = conflict, 5 = perfect alignment
    #[serde(deserialize_with = "lenient::whole_number")]
    pub alignment_score: u8,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DissonanceAlert {
    pub severity: String,
    pub description: String,
    pub customer_expectation: String,
    pub reality: String,
    pub mitigation_strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TensionItem {
    pub tension: String,
    pub left_force: String,
    pub right_force: String,
    pub current_balance: String,
    pub recommendation: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub checkpoints: Vec<String>,
}

/// Stakeholder-perspective alignment and tension report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetacognitionAnalysis {
    pub customer_perspective: CustomerPerspective,
    #[serde(alias = "nubiralPerspective")]
    pub provider_perspective: ProviderPerspective,
    pub proposal_perspective: ProposalPerspective,
    #[serde(deserialize_with = "lenient::list")]
    pub consonance_matrix: Vec<ConsonanceItem>,
    #[serde(deserialize_with = "lenient::list")]
    pub dissonance_alerts: Vec<DissonanceAlert>,
    #[serde(deserialize_with = "lenient::list")]
    pub tension_management: Vec<TensionItem>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub delivery_recommendations: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub grounding_sources: Vec<String>,
    pub expanded_content: ExpandedContent,
}

// ============ IMAGES ============

/// Data URIs for every generated visual
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalImages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_infographic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_infographic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture_infographic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_infographic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metacognition_infographic: Option<String>,
    /// Customer logo found alongside the cover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_logo: Option<String>,
}

/// Which visual a generation call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Kyc,
    Business,
    Architecture,
    Cost,
    Metacognition,
    Cover,
}

impl ImageKind {
    pub fn label(&self) -> &'static str {
        match self {
            ImageKind::Kyc => "KYC Infographic",
            ImageKind::Business => "Business Infographic",
            ImageKind::Architecture => "Architecture Infographic",
            ImageKind::Cost => "Cost Infographic",
            ImageKind::Metacognition => "Metacognition Infographic",
            ImageKind::Cover => "Cover Image",
        }
    }
}

impl ProposalImages {
    /// Store a generated image in its slot; `None` leaves the slot untouched
    pub fn set(&mut self, kind: ImageKind, uri: Option<String>) {
        if uri.is_none() {
            return;
        }
        let slot = match kind {
            ImageKind::Kyc => &mut self.kyc_infographic,
            ImageKind::Business => &mut self.business_infographic,
            ImageKind::Architecture => &mut self.architecture_infographic,
            ImageKind::Cost => &mut self.cost_infographic,
            ImageKind::Metacognition => &mut self.metacognition_infographic,
            ImageKind::Cover => &mut self.cover_image,
        };
        *slot = uri;
    }
}

// ============ SECTION EXPANSION ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpandDensity {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for ExpandDensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ExpandDensity::Low),
            "medium" => Ok(ExpandDensity::Medium),
            "high" => Ok(ExpandDensity::High),
            _ => Err(format!("Invalid expand density: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandConfig {
    pub instruction: String,
    pub density: ExpandDensity,
}

/// Artifact that owns an expandable section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandTarget {
    Kyc,
    Business,
    Design,
    Proposal,
    Metacognition,
}

impl FromStr for ExpandTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kyc" | "research" => Ok(ExpandTarget::Kyc),
            "business" => Ok(ExpandTarget::Business),
            "design" | "architecture" => Ok(ExpandTarget::Design),
            "proposal" => Ok(ExpandTarget::Proposal),
            "metacognition" => Ok(ExpandTarget::Metacognition),
            _ => Err(format!(
                "Invalid expand target: {}. Use kyc, business, design, proposal, or metacognition.",
                s
            )),
        }
    }
}

// ============ LOGS & UI PHASE ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    #[default]
    Info,
    Success,
    Thinking,
    Error,
    Paused,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Info => write!(f, "info"),
            LogKind::Success => write!(f, "success"),
            LogKind::Thinking => write!(f, "thinking"),
            LogKind::Error => write!(f, "error"),
            LogKind::Paused => write!(f, "paused"),
        }
    }
}

/// One user-visible log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

impl AgentLog {
    pub fn new(message: impl Into<String>, kind: LogKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            timestamp: Utc::now(),
            message: message.into(),
            kind,
        }
    }
}

/// UI-visible phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppStep {
    #[default]
    Input,
    Processing,
    Result,
}

// ============ EXPERT CHAT ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    #[default]
    User,
    Model,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Model => write!(f, "model"),
        }
    }
}

/// One turn of the expert conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Attached image as a data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            role,
            text: text.into(),
            image: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

// ============ SESSION SNAPSHOT ============

/// Everything a pipeline run has produced so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    pub request: Option<ProposalRequest>,
    pub research: Option<ResearchResult>,
    pub business: Option<BusinessAnalysis>,
    pub design: Option<SolutionDesign>,
    pub proposal_markdown: String,
    pub cost_estimation: Option<CostEstimation>,
    pub metacognition: Option<MetacognitionAnalysis>,
    pub images: ProposalImages,
    /// Latest audit report
    pub evaluation_markdown: String,
    pub step: AppStep,
    pub logs: Vec<AgentLog>,
    pub chat_history: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_data_tolerates_missing_fields() {
        let data: SessionData =
            serde_json::from_str(r##"{"proposalMarkdown":"# Draft","step":"RESULT"}"##).unwrap();
        assert_eq!(data.proposal_markdown, "# Draft");
        assert_eq!(data.step, AppStep::Result);
        assert!(data.request.is_none());
        assert!(data.logs.is_empty());
    }

    #[test]
    fn test_sparse_research_deserializes_with_defaults() {
        let research: ResearchResult = serde_json::from_str(
            r#"{"summary":"Acme is a retailer","detailedAnalysis":{"challengesAndRisks":[]}}"#,
        )
        .unwrap();
        assert_eq!(research.summary, "Acme is a retailer");
        assert!(research.strategic_goals.is_empty());
        assert!(research.detailed_analysis.competitors.is_empty());
        assert_eq!(research.missing_field(), Some("Challenges & Risks"));
    }

    #[test]
    fn test_mistyped_list_keeps_other_research_fields() {
        let research: ResearchResult = serde_json::from_str(
            r#"{"summary":"Acme is big","strategicGoals":"Grow","detailedAnalysis":{"competitors":{"global":"Rival"}}}"#,
        )
        .unwrap();
        assert_eq!(research.summary, "Acme is big");
        assert_eq!(research.strategic_goals, vec!["Grow".to_string()]);
        assert_eq!(
            research.detailed_analysis.competitors.global,
            vec!["Rival".to_string()]
        );
    }

    #[test]
    fn test_cost_estimation_accepts_float_counts() {
        let estimation: CostEstimation = serde_json::from_str(
            r#"{
                "optimalPlan": {
                    "totalWeeks": 12.0,
                    "roles": [
                        {"role": "Tech Lead", "hourlyRate": 80, "allocations": {"1": 50},
                         "stress": {"level": "High", "score": 6.5, "note": "tight"}},
                        "not a role"
                    ],
                    "totalCost": 1600
                },
                "proposalComparison": {"proposedWeeks": "10", "optimalWeeks": 12.0, "weeksDifference": 2.0}
            }"#,
        )
        .unwrap();
        let plan = &estimation.optimal_plan;
        assert_eq!(plan.total_weeks, 12);
        assert_eq!(plan.roles.len(), 1);
        assert_eq!(plan.roles[0].stress.as_ref().unwrap().score, 7);
        let comparison = estimation.proposal_comparison.unwrap();
        assert_eq!(comparison.proposed_weeks, 10);
        assert_eq!(comparison.weeks_difference, 2);
    }

    #[test]
    fn test_alignment_score_accepts_float() {
        let analysis: MetacognitionAnalysis = serde_json::from_str(
            r#"{"consonanceMatrix":[{"dimension":"Scope","alignmentScore":3.6}],"deliveryRecommendations":"Add a buffer sprint"}"#,
        )
        .unwrap();
        assert_eq!(analysis.consonance_matrix[0].alignment_score, 4);
        assert_eq!(analysis.delivery_recommendations, vec!["Add a buffer sprint".to_string()]);
    }

    #[test]
    fn test_missing_field_reports_competitors() {
        let mut research = ResearchResult::default();
        research.detailed_analysis.challenges_and_risks = vec!["Legacy".to_string()];
        assert_eq!(research.missing_field(), Some("Competitors"));

        research.detailed_analysis.competitors.local = vec!["Rival".to_string()];
        assert_eq!(research.missing_field(), None);
    }

    #[test]
    fn test_hyperscaler_round_trip_names() {
        assert_eq!("aws".parse::<HyperScaler>().unwrap(), HyperScaler::Aws);
        assert_eq!("GCP".parse::<HyperScaler>().unwrap(), HyperScaler::Gcp);
        assert!("ibm".parse::<HyperScaler>().is_err());
        assert_eq!(
            serde_json::to_string(&HyperScaler::Azure).unwrap(),
            "\"Azure\""
        );
    }

    #[test]
    fn test_role_cost_from_allocations() {
        let role = RoleAllocation {
            role: "Cloud Engineer".to_string(),
            hourly_rate: 50.0,
            allocations: [("1".to_string(), 100.0), ("2".to_string(), 50.0)]
                .into_iter()
                .collect(),
            stress: None,
        };
        assert_eq!(role.hours(), 60.0);
        assert_eq!(role.cost(), 3000.0);
    }

    #[test]
    fn test_images_set_ignores_none() {
        let mut images = ProposalImages::default();
        images.set(ImageKind::Cover, Some("data:image/png;base64,AAA".to_string()));
        images.set(ImageKind::Cover, None);
        assert_eq!(
            images.cover_image.as_deref(),
            Some("data:image/png;base64,AAA")
        );
    }

    #[test]
    fn test_metacognition_accepts_legacy_perspective_key() {
        let analysis: MetacognitionAnalysis = serde_json::from_str(
            r#"{"nubiralPerspective":{"deliveryStrengths":["Cloud"]},"consonanceMatrix":[{"dimension":"Scope","nubiralCapability":"High","alignmentScore":4}]}"#,
        )
        .unwrap();
        assert_eq!(
            analysis.provider_perspective.delivery_strengths,
            vec!["Cloud".to_string()]
        );
        assert_eq!(analysis.consonance_matrix[0].provider_capability, "High");
        assert_eq!(analysis.consonance_matrix[0].alignment_score, 4);
    }

    #[test]
    fn test_chat_history_defaults_for_older_sessions() {
        let data: SessionData = serde_json::from_str(r#"{"step":"INPUT"}"#).unwrap();
        assert!(data.chat_history.is_empty());

        let message = ChatMessage::new(ChatRole::Model, "Hi").with_image(None);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "model");
        assert!(value.get("image").is_none());
    }

    #[test]
    fn test_agent_log_serializes_kind_as_type() {
        let log = AgentLog::new("hello", LogKind::Thinking);
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["type"], "thinking");
        assert_eq!(log.id.len(), 8);
    }
}
