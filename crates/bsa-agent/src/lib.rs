//! # bsa-agent
//!
//! Model gateway for the BSA proposal pipeline.
//!
//! - [`LlmTransport`]: one raw model call (REST implementation and a scripted mock)
//! - [`Gateway`]: pacing plus bounded linear-backoff retries over a transport
//! - [`normalize`]: JSON/Markdown recovery from free-form model text
//! - [`logo`]: customer logo lookup for cover images

mod auth;
mod client;
pub mod logo;
pub mod mock;
pub mod normalize;
mod types;

pub use auth::{get_api_key, FALLBACK_KEY_ENV};
pub use client::{Gateway, GeminiTransport, LlmTransport};
pub use logo::{LogoFetcher, LogoSource};
pub use mock::MockTransport;
pub use types::*;
