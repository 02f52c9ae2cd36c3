use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::session::SessionRequest;

/// Short-lived credential minted by the application backend.
///
/// The backend creates the session record server-side and returns its id
/// together with everything needed to open the realtime connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    pub model: String,
    pub system_instruction: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// Client for the backend token endpoint.
#[derive(Clone)]
pub struct CredentialClient {
    http: reqwest::Client,
    api_base: String,
}

impl CredentialClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    /// Request a credential for a new session.
    ///
    /// A non-2xx response body `{ error }` is surfaced verbatim so the user
    /// sees exactly what the backend rejected.
    pub async fn request(&self, request: &SessionRequest) -> Result<TokenGrant> {
        let url = format!("{}/api/tutor/token", self.api_base);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("credential request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ApiError>().await {
                Ok(body) => body.error,
                Err(_) => format!("credential endpoint returned {}", status),
            };
            anyhow::bail!("{}", message);
        }

        let grant: TokenGrant = response
            .json()
            .await
            .context("malformed credential response")?;

        info!("credential issued for session {}", grant.session_id);

        Ok(grant)
    }
}
