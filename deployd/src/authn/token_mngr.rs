//! Installation token minting

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{debug, info};

use crate::authn::app_jwt::AppJwtSigner;
use crate::errors::AgentError;
use crate::http::client::HttpClient;

/// Source of installation tokens, a trait so tests can stand one in
#[async_trait]
pub trait InstallationTokenProvider: Send + Sync {
    /// Mint a fresh token for `installation_id`
    async fn installation_token(&self, installation_id: u64) -> Result<SecretString, AgentError>;
}

/// Mints tokens by exchanging a signed app JWT with the GitHub API.
///
/// Tokens are never cached: each deployment gets its own.
pub struct GithubAppTokenProvider {
    http_client: Arc<HttpClient>,
    signer: AppJwtSigner,
}

impl GithubAppTokenProvider {
    pub fn new(http_client: Arc<HttpClient>, signer: AppJwtSigner) -> Self {
        Self {
            http_client,
            signer,
        }
    }
}

#[async_trait]
impl InstallationTokenProvider for GithubAppTokenProvider {
    async fn installation_token(&self, installation_id: u64) -> Result<SecretString, AgentError> {
        debug!(
            "Minting installation token for app {} installation {}",
            self.signer.app_id(),
            installation_id
        );

        let app_jwt = self.signer.sign()?;
        let token = self
            .http_client
            .create_installation_token(installation_id, &app_jwt)
            .await
            .map_err(|e| AgentError::TokenError(format!("Failed to mint installation token: {}", e)))?;

        info!(
            "Minted installation token for installation {}, expires at {}",
            installation_id, token.expires_at
        );
        Ok(SecretString::from(token.token))
    }
}
