//! GitHub App installation API client

use github_models::InstallationAccessToken;

use crate::errors::AgentError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Exchange an app JWT for an installation access token
    pub async fn create_installation_token(
        &self,
        installation_id: u64,
        app_jwt: &str,
    ) -> Result<InstallationAccessToken, AgentError> {
        let path = format!("/app/installations/{}/access_tokens", installation_id);
        self.post(&path, app_jwt, &serde_json::json!({})).await
    }
}
