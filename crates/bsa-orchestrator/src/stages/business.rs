//! Business case analyst

use super::StageContext;
use crate::activity_log::ActivityLog;
use crate::prompts::researcher::build_business_prompt;
use bsa_agent::normalize::parse_json;
use bsa_agent::GenerateRequest;
use bsa_core::{BusinessAnalysis, BusinessValue};

/// Analysis used when the model call or the parse fails
pub fn fallback_analysis(business_case: &str) -> BusinessAnalysis {
    BusinessAnalysis {
        problem_statement: business_case.to_string(),
        expected_business_value: BusinessValue {
            roi: "Unknown".to_string(),
            efficiency_gains: "Unknown".to_string(),
            other_benefits: Vec::new(),
        },
        ..Default::default()
    }
}

/// Deconstruct the business case into drivers, pain points and value
pub async fn analyze_business_case(
    ctx: &StageContext,
    company: &str,
    business_case: &str,
    language: &str,
    log: &mut ActivityLog,
) -> BusinessAnalysis {
    log.thinking(
        "[Business Analyst] Deconstructing business case and identifying ROI opportunities...",
    );

    let request =
        GenerateRequest::text(build_business_prompt(company, business_case, language)).json_mode();

    let parsed = match ctx.gateway.generate(ctx.flash(), request, 1).await {
        Ok(response) => parse_json::<BusinessAnalysis>(response.text_or("{}")),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(mut analysis) => {
            analysis.expanded_content.clear();
            analysis
        }
        Err(e) => {
            log.error(format!("Business Analysis failed: {}", e));
            fallback_analysis(business_case)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::mock_context;
    use bsa_agent::MockTransport;

    #[tokio::test]
    async fn test_analysis_parsed_from_fenced_json() {
        let mock = MockTransport::new();
        mock.push_text(
            "```json\n{\"problemStatement\":\"Slow checkout\",\"keyPainPoints\":[\"Abandoned carts\"],\"expandedContent\":{\"stale\":\"x\"}}\n```",
        );
        let (mock, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let analysis =
            analyze_business_case(&ctx, "Acme", "Modernize checkout", "English", &mut log).await;

        assert_eq!(analysis.problem_statement, "Slow checkout");
        assert_eq!(analysis.key_pain_points, vec!["Abandoned carts".to_string()]);
        assert!(analysis.expanded_content.is_empty());
        assert!(mock.calls()[0].1.config.response_mime_type.is_some());
    }

    #[tokio::test]
    async fn test_parse_failure_falls_back_to_business_case() {
        let mock = MockTransport::new();
        mock.push_text("not json");
        let (_, ctx) = mock_context(mock);
        let mut log = ActivityLog::new();

        let analysis =
            analyze_business_case(&ctx, "Acme", "Modernize checkout", "English", &mut log).await;

        assert_eq!(analysis, fallback_analysis("Modernize checkout"));
        assert_eq!(analysis.expected_business_value.roi, "Unknown");
        assert!(log.messages()[1].starts_with("Business Analysis failed"));
    }
}
