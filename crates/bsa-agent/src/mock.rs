//! Scripted transport for testing
//!
//! Responses come from two places, checked in order:
//! 1. Rules: a prompt substring mapped to a fixed reply, never consumed
//! 2. A FIFO queue of replies and errors
//!
//! Every call is recorded so tests can inspect models and request configs.

use crate::client::LlmTransport;
use crate::types::{GenerateRequest, GenerateResponse, InlineData};
use async_trait::async_trait;
use bsa_core::{BsaError, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

enum Scripted {
    Reply(GenerateResponse),
    Fail(BsaError),
}

struct Rule {
    needle: String,
    reply: std::result::Result<GenerateResponse, String>,
}

/// Mock transport for testing
#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Scripted>>,
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<(String, GenerateRequest)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(GenerateResponse::from_text(text));
    }

    pub fn push_response(&self, response: GenerateResponse) {
        lock(&self.queue).push_back(Scripted::Reply(response));
    }

    pub fn push_error(&self, error: BsaError) {
        lock(&self.queue).push_back(Scripted::Fail(error));
    }

    /// Queue a reply carrying one inline PNG
    pub fn push_image(&self, base64_data: &str) {
        self.push_response(GenerateResponse {
            images: vec![InlineData {
                mime_type: "image/png".to_string(),
                data: base64_data.to_string(),
            }],
            ..Default::default()
        });
    }

    /// Answer every prompt containing `needle` with `text`
    pub fn with_rule(self, needle: &str, text: impl Into<String>) -> Self {
        self.add_rule(needle, Ok(GenerateResponse::from_text(text)));
        self
    }

    /// Answer every prompt containing `needle` with a full response
    pub fn with_rule_response(self, needle: &str, response: GenerateResponse) -> Self {
        self.add_rule(needle, Ok(response));
        self
    }

    /// Fail every prompt containing `needle`
    pub fn with_failing_rule(self, needle: &str, message: &str) -> Self {
        self.add_rule(needle, Err(message.to_string()));
        self
    }

    fn add_rule(&self, needle: &str, reply: std::result::Result<GenerateResponse, String>) {
        lock(&self.rules).push(Rule {
            needle: needle.to_string(),
            reply,
        });
    }

    /// Recorded `(model, request)` pairs in call order
    pub fn calls(&self) -> Vec<(String, GenerateRequest)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls whose prompt contains `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(_, request)| request.prompt_text().contains(needle))
            .count()
    }
}

#[async_trait]
impl LlmTransport for MockTransport {
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        lock(&self.calls).push((model.to_string(), request.clone()));
        let prompt = request.prompt_text();

        if let Some(rule) = lock(&self.rules)
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
        {
            return rule.reply.clone().map_err(BsaError::Api);
        }

        match lock(&self.queue).pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(BsaError::Api(format!(
                "No mock response for {} call: {}",
                model,
                prompt.chars().take(80).collect::<String>()
            ))),
        }
    }
}
