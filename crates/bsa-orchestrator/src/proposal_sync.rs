//! Proposal ↔ cost sync
//!
//! Regenerates the team (`## 4.`) and execution timeline (`## 5.`) sections of
//! a proposal from a cost estimation. Pure text functions, no model calls.

use bsa_core::CostEstimation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const TEAM_PATTERN: &str = r"(?:Equipo|Delivery Team|Project Team|Team)";
const WBS_PATTERN: &str = r"(?:Cronograma|Desglose de Actividades|Timeline|Execution Timeline)";
const NOT_FOUND: &str = "[Section not found]";
const DEFAULT_WEEKS: u32 = 8;
const ACTIVITY_CHARS: usize = 60;

/// Role keyword, English responsibility, Spanish responsibility
const RESPONSIBILITIES: [(&str, &str, &str); 11] = [
    ("tech lead", "Technical leadership and code review", "Liderazgo técnico y revisión de código"),
    ("cloud engineer", "Cloud infrastructure implementation", "Implementación de infraestructura cloud"),
    ("devops", "CI/CD, automation and monitoring", "CI/CD, automatización y monitoreo"),
    ("data engineer", "Data pipelines and ETL", "Pipelines de datos y ETL"),
    ("backend", "API and service development", "Desarrollo de APIs y servicios"),
    ("frontend", "User interface development", "Desarrollo de interfaz de usuario"),
    ("data scientist", "ML/AI models and advanced analytics", "Modelos ML/AI y análisis avanzado"),
    ("security", "Security, compliance and hardening", "Seguridad, compliance y hardening"),
    ("qa", "Testing and quality assurance", "Testing y aseguramiento de calidad"),
    ("delivery", "Project and stakeholder management", "Gestión de proyecto y stakeholders"),
    ("sdm", "Delivery management and coordination", "Gestión de entrega y coordinación"),
];

/// Name, activities, deliverables
const DEFAULT_PHASES_EN: [(&str, &str, &str); 7] = [
    ("Phase 1: Initiation", "Kick-off, scope definition", "Project Charter"),
    ("Phase 2: Design", "Architecture, technical design", "Design Document"),
    ("Phase 3: Development", "Core implementation", "Working code"),
    ("Phase 4: Integration", "Integration and testing", "Integrated system"),
    ("Phase 5: Validation", "UAT and adjustments", "UAT Approval"),
    ("Phase 6: Go-Live", "Deployment and stabilization", "Production system"),
    ("Phase 7: Closure", "Documentation and handover", "Final documentation"),
];

const DEFAULT_PHASES_ES: [(&str, &str, &str); 7] = [
    ("Fase 1: Inicio", "Kick-off, definición de alcance", "Project Charter"),
    ("Fase 2: Diseño", "Arquitectura, diseño técnico", "Documento de Diseño"),
    ("Fase 3: Desarrollo", "Implementación core", "Código funcional"),
    ("Fase 4: Integración", "Integración y pruebas", "Sistema integrado"),
    ("Fase 5: Validación", "UAT y ajustes", "Aprobación UAT"),
    ("Fase 6: Go-Live", "Despliegue y estabilización", "Sistema en producción"),
    ("Fase 7: Cierre", "Documentación y handover", "Documentación final"),
];

fn phase_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:fase|phase)\s*(\d+)[:\s]*([^\n]+)").expect("valid regex"))
}

fn next_section() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^##\s").expect("valid regex"))
}

/// Whether generated text should be Spanish
pub fn is_spanish(language: &str) -> bool {
    let language = language.to_lowercase();
    language.contains("spanish") || language.contains("español")
}

/// One row of the execution timeline table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: String,
    pub weeks: String,
    pub activities: String,
    pub deliverables: String,
}

/// Generated sections next to the ones currently in the proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPreview {
    pub team_section: String,
    pub wbs_section: String,
    pub original_team_section: String,
    pub original_wbs_section: String,
}

fn responsibility(role: &str, spanish: bool) -> &'static str {
    let role = role.to_lowercase();
    RESPONSIBILITIES
        .iter()
        .find(|(key, _, _)| role.contains(key))
        .map(|(_, en, es)| if spanish { *es } else { *en })
        .unwrap_or(if spanish {
            "Soporte técnico especializado"
        } else {
            "Specialized technical support"
        })
}

/// Team table built from the estimation roles; empty when there are none
///
/// Rates and allocations stay out of the proposal.
pub fn team_markdown(cost: &CostEstimation, language: &str) -> String {
    let roles = &cost.optimal_plan.roles;
    if roles.is_empty() {
        return String::new();
    }

    let spanish = is_spanish(language);
    let (section, role_header, responsibility_header) = if spanish {
        ("Equipo de Entrega", "Rol", "Responsabilidad Clave")
    } else {
        ("Delivery Team", "Role", "Key Responsibility")
    };

    let mut md = format!("## 4. {}\n\n", section);
    md.push_str(&format!("| {} | {} |\n", role_header, responsibility_header));
    md.push_str("|------|-------------------------|\n");
    for role in roles {
        md.push_str(&format!(
            "| {} | {} |\n",
            role.role,
            responsibility(&role.role, spanish)
        ));
    }
    md
}

/// Phases named in the plan reasoning, or the default table spread over the plan
pub fn extract_phases(reasoning: &str, total_weeks: u32, spanish: bool) -> Vec<Phase> {
    let matches: Vec<(String, String)> = phase_line()
        .captures_iter(reasoning)
        .filter_map(|c| Some((c.get(1)?.as_str().to_string(), c.get(2)?.as_str().to_string())))
        .collect();
    let week_label = if spanish { "Sem" } else { "Wk" };

    if matches.len() >= 3 {
        return matches
            .into_iter()
            .enumerate()
            .map(|(idx, (number, text))| {
                let idx = idx as u32;
                Phase {
                    name: format!("{} {}", if spanish { "Fase" } else { "Phase" }, number),
                    weeks: format!("{} {}-{}", week_label, idx + 1, (idx + 2).min(total_weeks)),
                    activities: text.chars().take(ACTIVITY_CHARS).collect::<String>().trim().to_string(),
                    deliverables: if spanish { "Ver detalle" } else { "See details" }.to_string(),
                }
            })
            .collect();
    }

    let defaults = if spanish {
        &DEFAULT_PHASES_ES
    } else {
        &DEFAULT_PHASES_EN
    };
    let count = (total_weeks as usize).clamp(1, defaults.len());
    let per_phase = total_weeks.max(1).div_ceil(count as u32);

    defaults[..count]
        .iter()
        .enumerate()
        .filter_map(|(idx, (name, activities, deliverables))| {
            let start = idx as u32 * per_phase + 1;
            if start > total_weeks.max(1) {
                return None;
            }
            let end = ((idx as u32 + 1) * per_phase).min(total_weeks.max(1));
            let weeks = if start == end {
                format!("{} {}", week_label, start)
            } else {
                format!("{} {}-{}", week_label, start, end)
            };
            Some(Phase {
                name: name.to_string(),
                weeks,
                activities: activities.to_string(),
                deliverables: deliverables.to_string(),
            })
        })
        .collect()
}

/// Execution timeline section with its phase table
pub fn wbs_markdown(cost: &CostEstimation, language: &str) -> String {
    let total_weeks = match cost.optimal_plan.total_weeks {
        0 => DEFAULT_WEEKS,
        weeks => weeks,
    };
    let spanish = is_spanish(language);
    let phases = extract_phases(&cost.optimal_plan.reasoning, total_weeks, spanish);

    let mut md = if spanish {
        format!(
            "## 5. Cronograma de Ejecución\n\n**Duración Total:** {} semanas\n\n",
            total_weeks
        )
    } else {
        format!(
            "## 5. Execution Timeline\n\n**Total Duration:** {} weeks\n\n",
            total_weeks
        )
    };
    if spanish {
        md.push_str("| Fase | Semana | Actividades Principales | Entregables |\n");
    } else {
        md.push_str("| Phase | Week | Main Activities | Deliverables |\n");
    }
    md.push_str("|------|---------|------------------------|-------------|\n");
    for phase in phases {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            phase.name, phase.weeks, phase.activities, phase.deliverables
        ));
    }
    md
}

/// Byte range of the `## [N.] <pattern>` section, up to the next `## ` header
fn section_span(markdown: &str, pattern: &str) -> Option<(usize, usize)> {
    let header = Regex::new(&format!(r"(?im)^##\s*\d*\.?\s*{}", pattern)).ok()?;
    let start = header.find(markdown)?;
    let end = next_section()
        .find_at(markdown, start.end())
        .map(|m| m.start())
        .unwrap_or(markdown.len());
    Some((start.start(), end))
}

/// Current text of a section, if the proposal has it
pub fn find_section<'a>(markdown: &'a str, pattern: &str) -> Option<&'a str> {
    section_span(markdown, pattern).map(|(start, end)| &markdown[start..end])
}

/// Replace a section, or append `content` when the proposal lacks it
pub fn replace_section(markdown: &str, pattern: &str, content: &str) -> String {
    match section_span(markdown, pattern) {
        Some((start, end)) => format!(
            "{}{}\n\n{}",
            &markdown[..start],
            content.trim_end(),
            &markdown[end..]
        ),
        None => format!("{}\n\n{}", markdown, content),
    }
}

/// Sections a sync would write, next to the current ones
pub fn preview(markdown: &str, cost: &CostEstimation, language: &str) -> SyncPreview {
    SyncPreview {
        team_section: team_markdown(cost, language),
        wbs_section: wbs_markdown(cost, language),
        original_team_section: find_section(markdown, TEAM_PATTERN)
            .unwrap_or(NOT_FOUND)
            .to_string(),
        original_wbs_section: find_section(markdown, WBS_PATTERN)
            .unwrap_or(NOT_FOUND)
            .to_string(),
    }
}

/// Proposal with team and timeline sections rewritten from the estimation
pub fn apply(markdown: &str, cost: &CostEstimation, language: &str) -> String {
    let team = team_markdown(cost, language);
    let updated = if team.is_empty() {
        markdown.to_string()
    } else {
        replace_section(markdown, TEAM_PATTERN, &team)
    };
    replace_section(&updated, WBS_PATTERN, &wbs_markdown(cost, language))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsa_core::{RoleAllocation, WeeklyPlan};

    fn cost(total_weeks: u32, reasoning: &str) -> CostEstimation {
        CostEstimation {
            optimal_plan: WeeklyPlan {
                total_weeks,
                roles: vec![
                    RoleAllocation {
                        role: "Tech Lead".to_string(),
                        hourly_rate: 65.0,
                        ..Default::default()
                    },
                    RoleAllocation {
                        role: "Solutions Architect".to_string(),
                        hourly_rate: 60.0,
                        ..Default::default()
                    },
                ],
                reasoning: reasoning.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    const PROPOSAL: &str = "# Technical Proposal\n\n## 3. Scope\nScope text\n\n## 4. Delivery Team\n| Role |\n| Old |\n\n## 5. Execution Timeline\n### Detail\nOld plan\n\n## 6. Deliverables\nDocs\n";

    #[test]
    fn test_language_detection() {
        assert!(is_spanish("Spanish"));
        assert!(is_spanish("Español (Chile)"));
        assert!(!is_spanish("English"));
    }

    #[test]
    fn test_team_table_hides_rates() {
        let md = team_markdown(&cost(6, ""), "English");
        assert!(md.starts_with("## 4. Delivery Team\n\n| Role | Key Responsibility |"));
        assert!(md.contains("| Tech Lead | Technical leadership and code review |"));
        assert!(md.contains("| Solutions Architect | Specialized technical support |"));
        assert!(!md.contains("65"));

        let es = team_markdown(&cost(6, ""), "Spanish");
        assert!(es.contains("| Tech Lead | Liderazgo técnico y revisión de código |"));
        assert_eq!(team_markdown(&CostEstimation::default(), "English"), "");
    }

    #[test]
    fn test_phases_from_reasoning() {
        let reasoning = "Phase 1: Discovery workshops\nPhase 2: Landing zone\nPhase 3: Migration waves";
        let phases = extract_phases(reasoning, 10, false);
        assert_eq!(phases.len(), 3);
        assert_eq!(phases[0].name, "Phase 1");
        assert_eq!(phases[0].weeks, "Wk 1-2");
        assert_eq!(phases[2].activities, "Migration waves");
    }

    #[test]
    fn test_default_phases_spread_over_plan() {
        let phases = extract_phases("Two phases only", 14, false);
        assert_eq!(phases.len(), 7);
        assert_eq!(phases[0].weeks, "Wk 1-2");
        assert_eq!(phases[6].weeks, "Wk 13-14");

        let short = extract_phases("", 3, true);
        assert_eq!(short.len(), 3);
        assert_eq!(short[0].name, "Fase 1: Inicio");
        assert_eq!(short[2].weeks, "Sem 3");

        // 8 weeks over 7 phases leaves no room for the last one
        let uneven = extract_phases("", 8, false);
        assert_eq!(uneven.len(), 4);
        assert_eq!(uneven[3].weeks, "Wk 7-8");
    }

    #[test]
    fn test_wbs_defaults_to_eight_weeks() {
        let md = wbs_markdown(&CostEstimation::default(), "English");
        assert!(md.contains("**Total Duration:** 8 weeks"));
    }

    #[test]
    fn test_apply_replaces_both_sections() {
        let updated = apply(PROPOSAL, &cost(6, ""), "English");
        assert!(!updated.contains("| Old |"));
        assert!(!updated.contains("Old plan"));
        assert!(updated.contains("| Tech Lead | Technical leadership and code review |"));
        assert!(updated.contains("**Total Duration:** 6 weeks"));
        assert!(updated.contains("## 3. Scope\nScope text"));
        assert!(updated.contains("## 6. Deliverables\nDocs"));
        assert_eq!(updated.matches("## 4.").count(), 1);
    }

    #[test]
    fn test_missing_sections_are_appended() {
        let updated = apply("# Proposal", &cost(4, ""), "English");
        assert!(updated.starts_with("# Proposal\n\n## 4. Delivery Team"));
        assert!(updated.contains("## 5. Execution Timeline"));
    }

    #[test]
    fn test_preview_shows_original_sections() {
        let preview = preview(PROPOSAL, &cost(6, ""), "English");
        assert_eq!(
            preview.original_team_section,
            "## 4. Delivery Team\n| Role |\n| Old |\n\n"
        );
        assert!(preview.original_wbs_section.contains("### Detail\nOld plan"));

        let empty = super::preview("# Nothing", &cost(6, ""), "English");
        assert_eq!(empty.original_team_section, NOT_FOUND);
    }
}
