//! Deployment status reporting

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};

use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentStatus, DeploymentTarget};

/// Status sink for one deployment
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, status: DeploymentStatus) -> Result<(), AgentError>;
}

/// Builds reporters for deployments as they come in
pub trait StatusReporterFactory: Send + Sync {
    fn for_deployment(
        &self,
        target: DeploymentTarget,
        token: &SecretString,
    ) -> Arc<dyn StatusReporter>;
}

/// Report and log the result; failures are never retried or escalated
pub async fn report_best_effort(reporter: &dyn StatusReporter, status: DeploymentStatus) {
    match reporter.report(status).await {
        Ok(()) => info!("Reported deployment status: {}", status),
        Err(e) => error!("Failed to report deployment status {}: {}", status, e),
    }
}

/// Reports to the GitHub Deployments API
pub struct GithubStatusReporter {
    client: Arc<HttpClient>,
    target: DeploymentTarget,
    token: SecretString,
}

impl GithubStatusReporter {
    pub fn new(client: Arc<HttpClient>, target: DeploymentTarget, token: SecretString) -> Self {
        Self {
            client,
            target,
            token,
        }
    }
}

#[async_trait]
impl StatusReporter for GithubStatusReporter {
    async fn report(&self, status: DeploymentStatus) -> Result<(), AgentError> {
        self.client
            .create_deployment_status(&self.target, self.token.expose_secret(), status)
            .await
    }
}

/// Factory producing [`GithubStatusReporter`]s sharing one HTTP client
pub struct GithubStatusReporterFactory {
    client: Arc<HttpClient>,
}

impl GithubStatusReporterFactory {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

impl StatusReporterFactory for GithubStatusReporterFactory {
    fn for_deployment(
        &self,
        target: DeploymentTarget,
        token: &SecretString,
    ) -> Arc<dyn StatusReporter> {
        Arc::new(GithubStatusReporter::new(
            self.client.clone(),
            target,
            SecretString::from(token.expose_secret().to_string()),
        ))
    }
}
