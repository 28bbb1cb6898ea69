//! Pure state machine for the discovery pipeline
//!
//! This module implements a pure functional state machine with NO I/O.
//! All state transitions are deterministic and testable.
//!
//! Key design principles:
//! - Pure function: transition(state, event) -> (state, actions)
//! - No async, no I/O, no model calls
//! - Invalid transitions go to Failed state (never panic)
//! - The UI phase is derived from the state, never stored beside it

use bsa_core::{AppStep, ImageKind, LogKind};

/// Discovery pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    /// No run in progress
    #[default]
    Idle,
    /// KYC research for the company
    Researching { company: String },
    /// Business case analysis
    AnalyzingBusiness,
    /// First architecture pass
    Designing,
    /// Logic check of the first design
    Validating,
    /// Single corrective pass driven by the validator critique
    Redesigning,
    /// Design ready; proposal generation is a user action
    AwaitingApproval,
    /// Failed with error; `step` is the UI phase reached before failing
    Failed { error: String, step: AppStep },
}

impl State {
    /// UI phase shown for this state
    pub fn app_step(&self) -> AppStep {
        match self {
            State::Idle => AppStep::Input,
            State::Researching { .. } | State::AnalyzingBusiness => AppStep::Processing,
            State::Designing
            | State::Validating
            | State::Redesigning
            | State::AwaitingApproval => AppStep::Result,
            State::Failed { step, .. } => *step,
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start a discovery run
    Start { company: String, language: String },
    ResearchComplete,
    BusinessComplete,
    DesignComplete,
    ValidationPassed { score: f32 },
    ValidationFailed { score: f32, critique: String },
    /// Error occurred
    Error { message: String },
}

/// Actions to execute as side effects of transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RunResearch,
    RenderInfographic(ImageKind),
    RunBusinessAnalysis,
    /// Architect pass; `feedback` carries the validator critique on a redesign
    RunDesign { feedback: Option<String> },
    RunValidation,
    /// Append to the user-visible activity log
    Log { message: String, kind: LogKind },
}

fn log(message: impl Into<String>, kind: LogKind) -> Action {
    Action::Log {
        message: message.into(),
        kind,
    }
}

fn design_finished() -> Vec<Action> {
    vec![
        Action::RenderInfographic(ImageKind::Architecture),
        log(
            "Design Phase Complete. Waiting for user approval to generate proposal...",
            LogKind::Success,
        ),
    ]
}

/// Pure state transition function
///
/// Takes current state and event, returns new state and actions to execute.
/// This function is completely deterministic and has no side effects.
///
/// # Invalid Transitions
/// Any invalid transition results in a Failed state with descriptive error.
/// This function never panics.
pub fn transition(state: State, event: Event) -> (State, Vec<Action>) {
    match (state, event) {
        // From Idle state
        (State::Idle, Event::Start { company, language }) => {
            let actions = vec![
                log(
                    format!(
                        "Starting KYC Research using Google Search Grounding (Language: {})...",
                        language
                    ),
                    LogKind::Thinking,
                ),
                Action::RunResearch,
            ];
            (State::Researching { company }, actions)
        }

        // From Researching state
        (State::Researching { .. }, Event::ResearchComplete) => {
            let actions = vec![
                log(
                    "Research complete. Identified strategic goals and SWOT analysis.",
                    LogKind::Success,
                ),
                Action::RenderInfographic(ImageKind::Kyc),
                log("Analyzing Business Case & ROI...", LogKind::Thinking),
                Action::RunBusinessAnalysis,
            ];
            (State::AnalyzingBusiness, actions)
        }

        // From AnalyzingBusiness state
        (State::AnalyzingBusiness, Event::BusinessComplete) => {
            let actions = vec![
                log("Business Case Analysis Complete.", LogKind::Success),
                Action::RenderInfographic(ImageKind::Business),
                log("Designing Architecture...", LogKind::Thinking),
                Action::RunDesign { feedback: None },
            ];
            (State::Designing, actions)
        }

        // From Designing state
        (State::Designing, Event::DesignComplete) => {
            let actions = vec![
                log(
                    "Validating Architecture Logic against Business Requirements...",
                    LogKind::Thinking,
                ),
                Action::RunValidation,
            ];
            (State::Validating, actions)
        }

        // From Validating state
        (State::Validating, Event::ValidationPassed { score }) => {
            let mut actions = vec![log(
                format!("Architecture Logic Validated (Score: {}/10).", score),
                LogKind::Success,
            )];
            actions.extend(design_finished());
            (State::AwaitingApproval, actions)
        }

        (State::Validating, Event::ValidationFailed { score, critique }) => {
            let actions = vec![
                log(
                    format!("Architecture Logic Check Failed (Score: {}/10).", score),
                    LogKind::Error,
                ),
                log(format!("Critique: \"{}\"", critique), LogKind::Info),
                log(
                    "Re-designing architecture with corrective feedback...",
                    LogKind::Thinking,
                ),
                Action::RunDesign {
                    feedback: Some(critique),
                },
            ];
            (State::Redesigning, actions)
        }

        // From Redesigning state; the corrected design is not re-validated
        (State::Redesigning, Event::DesignComplete) => {
            let mut actions = vec![log("Re-design complete.", LogKind::Success)];
            actions.extend(design_finished());
            (State::AwaitingApproval, actions)
        }

        // Error events from any non-terminal state
        (state @ State::Idle, Event::Error { message })
        | (state @ State::Researching { .. }, Event::Error { message })
        | (state @ State::AnalyzingBusiness, Event::Error { message })
        | (state @ State::Designing, Event::Error { message })
        | (state @ State::Validating, Event::Error { message })
        | (state @ State::Redesigning, Event::Error { message }) => {
            let actions = vec![log(format!("Critical Error: {}", message), LogKind::Error)];
            (
                State::Failed {
                    error: message,
                    step: state.app_step(),
                },
                actions,
            )
        }

        // Terminal states - no valid transitions
        (State::AwaitingApproval, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from AwaitingApproval state on event: {:?}",
                    event
                ),
                step: AppStep::Result,
            },
            vec![],
        ),

        (State::Failed { error, step }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Failed state (error: {}) on event: {:?}",
                    error, event
                ),
                step,
            },
            vec![],
        ),

        // All other invalid transitions
        (state, event) => {
            let step = state.app_step();
            (
                State::Failed {
                    error: format!(
                        "Invalid state transition: {:?} cannot handle event {:?}",
                        state, event
                    ),
                    step,
                },
                vec![],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> Event {
        Event::Start {
            company: "Acme".to_string(),
            language: "English".to_string(),
        }
    }

    fn non_log(actions: &[Action]) -> Vec<Action> {
        actions
            .iter()
            .filter(|a| !matches!(a, Action::Log { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn test_happy_path_full_flow() {
        let (state, actions) = transition(State::Idle, start());
        assert_eq!(
            state,
            State::Researching {
                company: "Acme".to_string()
            }
        );
        assert_eq!(non_log(&actions), vec![Action::RunResearch]);

        let (state, actions) = transition(state, Event::ResearchComplete);
        assert_eq!(state, State::AnalyzingBusiness);
        assert_eq!(
            non_log(&actions),
            vec![
                Action::RenderInfographic(ImageKind::Kyc),
                Action::RunBusinessAnalysis
            ]
        );

        let (state, actions) = transition(state, Event::BusinessComplete);
        assert_eq!(state, State::Designing);
        assert_eq!(state.app_step(), AppStep::Result);
        assert_eq!(
            non_log(&actions),
            vec![
                Action::RenderInfographic(ImageKind::Business),
                Action::RunDesign { feedback: None }
            ]
        );

        let (state, actions) = transition(state, Event::DesignComplete);
        assert_eq!(state, State::Validating);
        assert_eq!(non_log(&actions), vec![Action::RunValidation]);

        let (state, actions) = transition(state, Event::ValidationPassed { score: 9.0 });
        assert_eq!(state, State::AwaitingApproval);
        assert_eq!(
            non_log(&actions),
            vec![Action::RenderInfographic(ImageKind::Architecture)]
        );
    }

    #[test]
    fn test_failed_validation_redesigns_once() {
        let (state, actions) = transition(
            State::Validating,
            Event::ValidationFailed {
                score: 4.0,
                critique: "No caching layer".to_string(),
            },
        );
        assert_eq!(state, State::Redesigning);
        assert_eq!(
            non_log(&actions),
            vec![Action::RunDesign {
                feedback: Some("No caching layer".to_string())
            }]
        );
        assert!(actions.contains(&Action::Log {
            message: "Architecture Logic Check Failed (Score: 4/10).".to_string(),
            kind: LogKind::Error,
        }));

        let (state, actions) = transition(state, Event::DesignComplete);
        assert_eq!(state, State::AwaitingApproval);
        assert!(!non_log(&actions).contains(&Action::RunValidation));
    }

    #[test]
    fn test_app_step_derivation() {
        assert_eq!(State::Idle.app_step(), AppStep::Input);
        assert_eq!(State::AnalyzingBusiness.app_step(), AppStep::Processing);
        assert_eq!(State::AwaitingApproval.app_step(), AppStep::Result);
    }

    #[test]
    fn test_error_from_any_state() {
        for state in [
            State::Idle,
            State::Researching {
                company: "Acme".to_string(),
            },
            State::AnalyzingBusiness,
            State::Designing,
            State::Validating,
            State::Redesigning,
        ] {
            let expected_step = state.app_step();
            let (next, actions) = transition(
                state,
                Event::Error {
                    message: "boom".to_string(),
                },
            );
            assert_eq!(
                next,
                State::Failed {
                    error: "boom".to_string(),
                    step: expected_step,
                }
            );
            assert!(matches!(
                &actions[0],
                Action::Log { kind: LogKind::Error, .. }
            ));
        }
    }

    #[test]
    fn test_invalid_transition_never_panics() {
        // Start while a run is in progress
        let (state, _) = transition(State::Designing, start());
        assert!(matches!(state, State::Failed { .. }));

        // Validation result without a validation
        let (state, actions) = transition(State::Idle, Event::ValidationPassed { score: 8.0 });
        assert!(matches!(state, State::Failed { .. }));
        assert!(actions.is_empty());

        // Terminal states stay failed
        let (state, _) = transition(State::AwaitingApproval, Event::ResearchComplete);
        assert!(matches!(
            state,
            State::Failed {
                step: AppStep::Result,
                ..
            }
        ));
        let (state, _) = transition(state, start());
        assert!(matches!(state, State::Failed { .. }));
    }
}
