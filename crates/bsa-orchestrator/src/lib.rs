//! # bsa-orchestrator
//!
//! Multi-stage proposal pipeline.
//!
//! This crate provides:
//! - Stage agents (research, business analysis, architecture, writing,
//!   cost estimation, metacognition, visuals, section expansion)
//! - Expert assistant chat that can act on the session through tool calls
//! - Context-density filtering of upstream artifacts
//! - Pure discovery state machine and the `Pipeline` controller
//! - Proposal ↔ cost sync of the team and timeline sections
//! - User-visible activity log

mod activity_log;
pub mod context_filter;
mod pipeline;
pub mod prompts;
pub mod proposal_sync;
pub mod stages;
mod state_machine;

pub use activity_log::ActivityLog;
pub use context_filter::apply_context_filter;
pub use pipeline::{Artifacts, Pipeline};
pub use proposal_sync::SyncPreview;
pub use stages::expert::DesignPatch;
pub use stages::StageContext;
pub use state_machine::{transition, Action, Event, State};
