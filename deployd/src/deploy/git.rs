//! Git checkout controller

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use crate::deploy::executor::CommandExecutor;
use crate::errors::{AgentError, ExecutionError};

/// Refspec used for authenticated fetches; keeps `origin/*` up to date
/// without touching the configured remote.
const FETCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

/// Where to fetch from and with which credential
#[derive(Debug)]
pub struct GitRemote {
    /// Base URL such as `https://github.com`
    pub base_url: String,
    pub owner: String,
    pub repo: String,
    pub token: SecretString,
}

impl GitRemote {
    /// Remote URL with the token embedded as userinfo.
    ///
    /// Only ever passed as a process argument; never written to git config.
    fn authenticated_url(&self) -> Result<String, AgentError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AgentError::ConfigError(format!("Invalid git base URL: {}", e)))?;

        let path = format!(
            "{}/{}/{}.git",
            url.path().trim_end_matches('/'),
            self.owner,
            self.repo
        );
        url.set_path(&path);
        url.set_username("x-access-token")
            .and_then(|_| url.set_password(Some(self.token.expose_secret())))
            .map_err(|_| {
                AgentError::ConfigError(format!(
                    "Git base URL cannot carry credentials: {}",
                    self.base_url
                ))
            })?;

        Ok(url.to_string())
    }
}

/// Revision operations on one working directory
pub struct GitCheckout {
    executor: Arc<dyn CommandExecutor>,
    dir: PathBuf,
    remote: GitRemote,
}

impl GitCheckout {
    pub fn new(executor: Arc<dyn CommandExecutor>, dir: impl Into<PathBuf>, remote: GitRemote) -> Self {
        Self {
            executor,
            dir: dir.into(),
            remote,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, ExecutionError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.executor.execute("git", &args, &self.dir).await
    }

    /// Revision currently checked out
    pub async fn current_revision(&self) -> Result<String, AgentError> {
        let stdout = self.git(&["rev-parse", "HEAD"]).await?;
        let revision = stdout.trim_end().to_string();
        debug!("Current revision: {}", revision);
        Ok(revision)
    }

    /// Pull remote history into the local repository
    pub async fn fetch(&self) -> Result<(), AgentError> {
        info!("Fetching {}/{}", self.remote.owner, self.remote.repo);
        let url = self.remote.authenticated_url()?;
        self.git(&["fetch", "--quiet", &url, FETCH_REFSPEC]).await?;
        Ok(())
    }

    /// Switch the working tree to `revision`
    pub async fn checkout(&self, revision: &str) -> Result<(), AgentError> {
        info!("Checking out {}", revision);
        self.git(&["checkout", revision, "--quiet"]).await?;
        Ok(())
    }
}
