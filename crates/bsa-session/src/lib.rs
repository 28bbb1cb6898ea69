//! # bsa-session
//!
//! Saved proposal sessions.
//!
//! This crate provides:
//! - `SavedSession` records wrapping a pipeline snapshot
//! - A JSON-file session store (one file per session id)
//! - Lightweight summaries for listing

mod store;

pub use store::{SavedSession, SessionStore, SessionSummary};
