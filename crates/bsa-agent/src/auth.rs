//! API key resolution
//!
//! Priority:
//! 1. The configured variable (`gateway.api_key_env`, `GEMINI_API_KEY` by default)
//! 2. `API_KEY`

use bsa_core::{BsaError, Result};
use std::env;

/// Fallback variable checked after the configured one
pub const FALLBACK_KEY_ENV: &str = "API_KEY";

/// Resolve the API key from the environment
pub fn get_api_key(primary_env: &str) -> Result<String> {
    for var in [primary_env, FALLBACK_KEY_ENV] {
        if let Ok(key) = env::var(var) {
            if !key.trim().is_empty() {
                tracing::info!("Using {}", var);
                return Ok(key);
            }
        }
    }

    Err(BsaError::Auth(format!(
        "No API key found. Set {} (or {}) to a generative language API key.",
        primary_env, FALLBACK_KEY_ENV
    )))
}
