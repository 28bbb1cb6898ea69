//! SMART proposal audit
//!
//! The auditor produces a Markdown report. The score and the improvement list
//! are mined back out of that report by the pure functions below.

use bsa_agent::normalize::{extract_markdown, strip_images_for_context};
use bsa_agent::{GenerateRequest, Gateway, Part};
use regex::Regex;
use std::sync::OnceLock;

/// Report returned when the audit call fails
pub const AUDIT_ERROR_MARKER: &str = "# Error in Evaluation service";

/// Improvement text used when the report has no improvements section
pub const DEFAULT_IMPROVEMENTS: &str = "Please review the proposal for completeness.";

fn score_row() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\|\s*\*\*\*Nota:\*\*\*\s*\|\s*(\d+)").expect("valid regex"))
}

fn improvements_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)##\s+.*(?:Improve|Mejorar|Crític|Critic).*").expect("valid regex")
    })
}

fn critical_cell() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\|\s*(?:\*\*CRÍTICO\*\*|CRÍTICO|\*\*CRITICAL\*\*|CRITICAL)\s*\|")
            .expect("valid regex")
    })
}

/// Score from the `| ***Nota:*** | <n> |` row; 0 when absent
pub fn parse_evaluation_score(markdown: &str) -> u32 {
    score_row()
        .captures(markdown)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Improvements section of an audit report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Improvements {
    pub text: String,
    /// A table cell is exactly CRITICAL or CRÍTICO (optionally bold)
    pub has_critical: bool,
}

/// Text between the first improvements header and the next such header
pub fn extract_improvements(markdown: &str) -> Improvements {
    let mut parts = improvements_header().split(markdown);
    let _before = parts.next();
    let text = parts.next().unwrap_or("");

    Improvements {
        has_critical: critical_cell().is_match(text),
        text: if text.is_empty() {
            DEFAULT_IMPROVEMENTS.to_string()
        } else {
            text.to_string()
        },
    }
}

/// Audit report with the mined fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub markdown: String,
    pub score: u32,
    pub improvements: Improvements,
    /// Set when the audit call failed and `markdown` is the error marker
    pub failure: Option<String>,
}

impl AuditReport {
    pub fn from_markdown(markdown: String) -> Self {
        Self {
            score: parse_evaluation_score(&markdown),
            improvements: extract_improvements(&markdown),
            markdown,
            failure: None,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            failure: Some(reason),
            ..Self::from_markdown(AUDIT_ERROR_MARKER.to_string())
        }
    }
}

/// SMART-criteria proposal auditor
pub struct Auditor {
    gateway: Gateway,
    model: String,
    retries: u32,
}

impl Auditor {
    pub fn new(gateway: Gateway, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            retries: 2,
        }
    }

    /// Audit a proposal; inline images are stripped before sending
    pub async fn evaluate(&self, proposal: &str, project_name: &str, language: &str) -> AuditReport {
        let request = GenerateRequest::text(build_audit_prompt(project_name, language))
            .with_part(Part::text(strip_images_for_context(proposal)));

        match self.gateway.generate(&self.model, request, self.retries).await {
            Ok(response) => {
                let report = AuditReport::from_markdown(extract_markdown(
                    response.text_or("# Error generating evaluation"),
                ));
                tracing::info!(
                    "Audit complete: score {} (critical: {})",
                    report.score,
                    report.improvements.has_critical
                );
                report
            }
            Err(e) => {
                tracing::warn!("Audit failed: {}", e);
                AuditReport::failed(e.to_string())
            }
        }
    }
}

/// SMART audit instructions; the proposal follows as a separate part
pub fn build_audit_prompt(project_name: &str, language: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("# TECHNICAL PROPOSAL AUDIT\n\n");
    prompt.push_str(
        "Act as a senior solutions architect. Evaluate the technical proposal that \
         follows against the quality standard below.\n\n",
    );
    prompt.push_str(&format!("**Respond in this language: {}**\n\n", language));

    prompt.push_str("## CRITERIA\n\n");
    for criterion in [
        "Professional Cover: client, author, version, project name, date",
        "Executive Summary: challenge, pain, value proposition, ROI",
        "Background & Objectives: understanding of the need, SMART objectives",
        "Scope: precise scope and acceptance criteria",
        "Solution Architecture: design, diagrams, justification, Well-Architected alignment",
        "Work Plan: phases, tasks, timeline",
        "Deliverables: explicit tangible outputs",
        "Roles & Dependencies: responsibilities and dependencies",
        "Governance & Support: service delivery, reporting, support plan",
        "Success Criteria: quantifiable KPIs",
    ] {
        prompt.push_str(&format!("- {}\n", criterion));
    }
    prompt.push('\n');

    prompt.push_str("## REPORT FORMAT (translate headers)\n\n");
    prompt.push_str(&format!(
        "# Technical Proposal Evaluation: {}\n\
         ## General Verdict\n\
         ## Criteria Analysis\n\
         | Criterion | Status | Observations |\n\n\
         | Criterion | Score |\n\
         | :--- | :--- |\n\
         | ***Nota:***|  [0-100] |\n\n\
         ## Strengths\n\
         ## Critical Improvements Needed\n\
         | Priority | Weakness Description | Suggestion |\n\
         | **CRITICAL** | ... | ... |\n\
         | **RECOMMENDED** | ... | ... |\n\n",
        project_name
    ));

    prompt.push_str("## RULES\n\n");
    prompt.push_str(
        "1. The score row must read exactly `| ***Nota:***|  <number> |` in every language.\n\
         2. Missing essential parts go in the improvements table with priority CRITICAL.\n\
         3. Return clean Markdown.\n",
    );

    prompt
}
