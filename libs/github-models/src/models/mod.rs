//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `deployment` webhook event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEvent {
    /// Event action, `created` for new deployments
    pub action: String,
    pub deployment: Deployment,
    pub repository: Repository,
    /// Present for events delivered to a GitHub App
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

/// Deployment object embedded in webhook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,
    pub sha: String,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    pub environment: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Repository object embedded in webhook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Account,
}

/// User or organisation account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

/// Installation reference embedded in webhook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

/// Body of `POST /repos/{owner}/{repo}/deployments/{id}/statuses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeploymentStatus {
    /// One of `error`, `failure`, `inactive`, `in_progress`, `queued`,
    /// `pending`, `success`
    pub state: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

/// Response of `POST /app/installations/{id}/access_tokens`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}
