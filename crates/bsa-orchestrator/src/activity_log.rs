//! Activity log - user-visible narration of a pipeline run
//!
//! Every entry is kept in memory (it is persisted with the session) and
//! mirrored to `tracing`:
//! - `error` entries at ERROR
//! - `thinking` entries at DEBUG
//! - everything else at INFO

use bsa_core::{AgentLog, LogKind};

/// Ordered log of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLog {
    entries: Vec<AgentLog>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and mirror it to tracing
    pub fn push(&mut self, message: impl Into<String>, kind: LogKind) {
        let entry = AgentLog::new(message, kind);
        match kind {
            LogKind::Error => tracing::error!(kind = %kind, "{}", entry.message),
            LogKind::Thinking => tracing::debug!(kind = %kind, "{}", entry.message),
            _ => tracing::info!(kind = %kind, "{}", entry.message),
        }
        self.entries.push(entry);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Success);
    }

    pub fn thinking(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Thinking);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Error);
    }

    pub fn paused(&mut self, message: impl Into<String>) {
        self.push(message, LogKind::Paused);
    }

    pub fn entries(&self) -> &[AgentLog] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages only, oldest first
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_entries(self) -> Vec<AgentLog> {
        self.entries
    }
}

impl From<Vec<AgentLog>> for ActivityLog {
    fn from(entries: Vec<AgentLog>) -> Self {
        Self { entries }
    }
}
