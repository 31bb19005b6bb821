//! Deployment status API client

use github_models::CreateDeploymentStatus;

use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentStatus, DeploymentTarget};

impl HttpClient {
    /// Create a deployment status
    pub async fn create_deployment_status(
        &self,
        target: &DeploymentTarget,
        token: &str,
        status: DeploymentStatus,
    ) -> Result<(), AgentError> {
        let path = format!(
            "/repos/{}/{}/deployments/{}/statuses",
            target.owner, target.repo, target.deployment_id
        );
        let body = CreateDeploymentStatus {
            state: status.as_str().to_string(),
            description: Some(status.description().to_string()),
            log_url: None,
        };
        let _: serde_json::Value = self.post(&path, token, &body).await?;
        Ok(())
    }
}
