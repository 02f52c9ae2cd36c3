use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::session::{SessionKind, TranscriptEntry};

/// Finalization payload persisted when a session ends.
#[derive(Debug, Clone, Serialize)]
pub struct SessionFinalization {
    pub transcript: Vec<TranscriptEntry>,
    pub duration_seconds: u64,
    pub status: String,
}

/// A previously persisted session, fetched for continuation context.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredSession {
    pub id: String,
    #[serde(default)]
    pub session_type: Option<SessionKind>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub transcript: Option<Vec<TranscriptEntry>>,
}

/// Client for the backend session store.
#[derive(Clone)]
pub struct SessionStore {
    http: reqwest::Client,
    api_base: String,
}

impl SessionStore {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/api/sessions/{}", self.api_base, session_id)
    }

    /// Load a prior session when the user continues from it.
    pub async fn load(&self, session_id: &str) -> Result<StoredSession> {
        let response = self
            .http
            .get(self.session_url(session_id))
            .send()
            .await
            .context("session fetch failed")?
            .error_for_status()
            .context("session fetch rejected")?;

        response.json().await.context("malformed session record")
    }

    /// Persist the finished session's transcript and duration.
    pub async fn finalize(&self, session_id: &str, body: &SessionFinalization) -> Result<()> {
        self.http
            .patch(self.session_url(session_id))
            .json(body)
            .send()
            .await
            .context("session finalization failed")?
            .error_for_status()
            .context("session finalization rejected")?;

        info!(
            "session {} persisted ({} entries, {}s)",
            session_id,
            body.transcript.len(),
            body.duration_seconds
        );

        Ok(())
    }

    /// Ask the backend to generate feedback/analysis for a finished session.
    ///
    /// Callers fire-and-forget this; a lost analysis is recoverable, a
    /// blocked teardown is not.
    pub async fn request_analysis(&self, session_id: &str) -> Result<()> {
        self.http
            .post(self.session_url(session_id))
            .send()
            .await
            .context("analysis request failed")?
            .error_for_status()
            .context("analysis request rejected")?;

        Ok(())
    }
}
