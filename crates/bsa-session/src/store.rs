//! JSON-file session store

use bsa_core::{BsaError, Result, SessionData};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const UNTITLED: &str = "Untitled Proposal";

/// One saved proposal session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub id: String,
    pub name: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Last save, epoch milliseconds
    pub last_modified: i64,
    pub data: SessionData,
}

impl SavedSession {
    /// New session named after the request's company
    pub fn new(data: SessionData) -> Self {
        let name = data
            .request
            .as_ref()
            .map(|r| r.company_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();
        let now = Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            timestamp: now,
            last_modified: now,
            data,
        }
    }

    /// Replace the snapshot and bump `last_modified`
    pub fn update(&mut self, data: SessionData) {
        self.data = data;
        self.last_modified = Utc::now().timestamp_millis();
    }

    pub fn summary(&self) -> SessionSummary {
        let preview_text = match &self.data.request {
            Some(request) => {
                let company = match request.company_name.trim() {
                    "" => "Draft",
                    name => name,
                };
                format!("{} - {}", company, request.hyper_scaler)
            }
            None => "Draft".to_string(),
        };
        SessionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            timestamp: self.timestamp,
            last_modified: self.last_modified,
            preview_text,
        }
    }
}

/// Listing entry without the (large) session payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub timestamp: i64,
    pub last_modified: i64,
    pub preview_text: String,
}

/// Sessions stored as `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BsaError::SessionNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Create or overwrite a session
    pub async fn save(&self, session: &SavedSession) -> Result<()> {
        let path = self.path_for(&session.id)?;
        fs::create_dir_all(&self.dir).await?;

        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        debug!("Saved session {} to {:?}", session.id, path);
        Ok(())
    }

    pub async fn load(&self, id: &str) -> Result<SavedSession> {
        let path = self.path_for(id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BsaError::SessionNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Remove a session; `false` when there was nothing to delete
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted session {}", id);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Summaries of every readable session, most recently modified first
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<SavedSession>(&content) {
                Ok(session) => summaries.push(session.summary()),
                Err(e) => debug!("Skipping unreadable session {:?}: {}", path, e),
            }
        }

        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsa_core::{AppStep, HyperScaler, ProposalRequest};
    use tempfile::tempdir;

    fn data(company: &str) -> SessionData {
        SessionData {
            request: Some(ProposalRequest {
                company_name: company.to_string(),
                hyper_scaler: HyperScaler::Gcp,
                ..Default::default()
            }),
            proposal_markdown: "# Draft".to_string(),
            step: AppStep::Result,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));

        let session = SavedSession::new(data("Acme"));
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.name, "Acme");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let mut session = SavedSession::new(data("Acme"));
        store.save(&session).await.unwrap();
        session.update(data("Acme Corp"));
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap();
        let company = loaded.data.request.unwrap().company_name;
        assert_eq!(company, "Acme Corp");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, BsaError::SessionNotFound(_)));
        assert!(!store.delete("nope").await.unwrap());
        // path components are never accepted as ids
        assert!(store.load("../config").await.is_err());
    }

    #[tokio::test]
    async fn test_list_sorted_by_last_modified() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let mut older = SavedSession::new(data("Older"));
        older.last_modified = 1_000;
        let mut newer = SavedSession::new(data(""));
        newer.last_modified = 2_000;
        let mut draft = SavedSession::new(SessionData::default());
        draft.last_modified = 1_500;
        for session in [&older, &newer, &draft] {
            store.save(session).await.unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let summaries = store.list().await.unwrap();
        let previews: Vec<&str> = summaries.iter().map(|s| s.preview_text.as_str()).collect();
        assert_eq!(previews, vec!["Draft - GCP", "Draft", "Older - GCP"]);
        assert_eq!(summaries[0].name, UNTITLED);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let session = SavedSession::new(data("Acme"));
        store.save(&session).await.unwrap();

        assert!(store.delete(&session.id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_without_directory() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("missing"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let session = SavedSession::new(data("Acme"));
        let json = serde_json::to_value(session.summary()).unwrap();
        assert_eq!(json["previewText"], "Acme - GCP");
        assert!(json.get("lastModified").is_some());
    }
}
