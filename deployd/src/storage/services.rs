//! Deployable service definitions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::deployment::Step;

/// A repository/environment pair deployd knows how to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// `owner/name`
    pub repo: String,

    /// Deployment environment this entry handles, e.g. `production`
    pub environment: String,

    /// Git checkout the steps run in
    pub dir: PathBuf,

    pub steps: Vec<Step>,
}

impl ServiceConfig {
    /// Whether this entry handles deployments of `repo` to `environment`
    pub fn matches(&self, repo: &str, environment: &str) -> bool {
        self.repo == repo && self.environment == environment
    }
}

/// First service handling `repo` in `environment`
pub fn find_service<'a>(
    services: &'a [ServiceConfig],
    repo: &str,
    environment: &str,
) -> Option<&'a ServiceConfig> {
    services.iter().find(|s| s.matches(repo, environment))
}
