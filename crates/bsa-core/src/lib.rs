//! # bsa-core
//!
//! Core artifacts for the BSA proposal pipeline.
//!
//! Every stage of the pipeline produces one typed artifact that the next stage
//! consumes:
//!
//! - `ResearchResult` (KYC) and `BusinessAnalysis` feed the architect
//! - `SolutionDesign` feeds the validator and the proposal writer
//! - the proposal Markdown feeds the estimator and the auditor
//! - `CostEstimation` plus the proposal feed the metacognition analyst
//!
//! Artifacts deserialize leniently (missing fields take defaults) because they
//! come straight out of model responses.

pub mod config;
mod error;
pub mod fail_open;
pub mod lenient;
mod types;

pub use config::BsaConfig;
pub use error::{BsaError, Result};
pub use types::*;
