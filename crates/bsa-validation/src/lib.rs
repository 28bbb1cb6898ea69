//! # bsa-validation
//!
//! Quality gates for the BSA proposal pipeline.
//!
//! This crate provides:
//! - Design validator (design vs. business requirements, fails open)
//! - SMART proposal auditor and report mining (score, critical improvements)

mod auditor;
mod validator;

pub use auditor::{
    build_audit_prompt, extract_improvements, parse_evaluation_score, AuditReport, Auditor,
    Improvements, AUDIT_ERROR_MARKER, DEFAULT_IMPROVEMENTS,
};
pub use validator::{
    build_validation_prompt, DesignValidator, ValidationVerdict, ValidatorConfig,
    FAIL_OPEN_CRITIQUE, FAIL_OPEN_SCORE,
};
