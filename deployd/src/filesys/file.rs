//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::AgentError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_string(&self) -> Result<String, AgentError> {
        let contents = fs::read_to_string(&self.path).await?;
        Ok(contents)
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, AgentError> {
        let contents = fs::read(&self.path).await?;
        Ok(contents)
    }

    /// Read and parse the file as JSON, naming the file in parse errors
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        let contents = self.read_string().await?;
        serde_json::from_str(&contents).map_err(|e| {
            AgentError::ConfigError(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }
}
