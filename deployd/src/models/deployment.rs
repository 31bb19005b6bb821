//! Deployment models

use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default GitHub REST API base URL
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default base URL git remotes are built from
pub const DEFAULT_GIT_URL: &str = "https://github.com";

/// Everything a worker needs to run one deployment.
///
/// Crosses the dispatcher/worker process boundary exactly once, as a single
/// JSON line on the worker's stdin.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Working directory holding the git checkout
    pub dir: PathBuf,

    /// Target revision to deploy
    pub commit: String,

    /// Ordered deploy steps
    pub steps: Vec<Step>,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Deployment ID on the status service
    pub deployment_id: u64,

    /// Installation token scoped to this deployment
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub token: SecretString,

    /// Endpoints for status reports and fetches
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Extra structured log fields
    #[serde(default)]
    pub log_context: LogContext,
}

impl DeploymentRequest {
    /// The deployment this request reports against
    pub fn target(&self) -> DeploymentTarget {
        DeploymentTarget {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            deployment_id: self.deployment_id,
        }
    }

    /// Span carrying the structured context every deployment log line gets
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "deployment",
            owner = %self.owner,
            repo = %self.repo,
            deployment_id = self.deployment_id,
            commit = %self.commit,
            environment = self.log_context.environment.as_deref().unwrap_or(""),
            delivery = self.log_context.delivery_id.as_deref().unwrap_or(""),
        )
    }
}

fn serialize_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::from(raw))
}

/// Owner/repo/deployment triple a status report is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub owner: String,
    pub repo: String,
    pub deployment_id: u64,
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.deployment_id)
    }
}

/// GitHub endpoints used by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_git_url")]
    pub git_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_git_url() -> String {
    DEFAULT_GIT_URL.to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            git_url: default_git_url(),
        }
    }
}

/// Log fields that are not part of the deployment identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Webhook delivery GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
}

/// A single deploy command: program followed by its arguments.
///
/// Never empty; deserialization rejects `[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Step(Vec<String>);

impl Step {
    pub fn new<I, S>(parts: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_from(parts.into_iter().map(Into::into).collect::<Vec<_>>())
    }

    /// Executable name
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }
}

impl TryFrom<Vec<String>> for Step {
    type Error = String;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        if parts.is_empty() {
            return Err("step must contain at least a program name".to_string());
        }
        Ok(Step(parts))
    }
}

impl From<Step> for Vec<String> {
    fn from(step: Step) -> Self {
        step.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Deployment status as understood by the status service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    InProgress,
    Success,
    Failure,
    Error,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgress => "in_progress",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failure => "failure",
            DeploymentStatus::Error => "error",
        }
    }

    /// Human readable description sent along with the state
    pub fn description(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgress => "Deployment started",
            DeploymentStatus::Success => "Deployment succeeded",
            DeploymentStatus::Failure => "Deploy steps failed, rollback attempted",
            DeploymentStatus::Error => "Deployment failed before running steps",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof-of-life sent once from worker to dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    /// True when the worker has taken ownership of status reporting
    pub ack: bool,
}
