//! Error types for deployd

use thiserror::Error;

/// Main error type for deployd
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("GitHub API error: {status}: {message}")]
    GithubApi { status: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Handshake error: {0}")]
    HandshakeError(String),

    #[error("Invalid deployment request: {0}")]
    InvalidRequest(String),

    #[error("Deployment error: {0}")]
    DeployError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Internal(err.to_string())
    }
}

/// Failure of a single external command
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process could not be started at all
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited non-zero (-1 when killed by a signal)
    #[error("`{command}` exited with code {exit_code}")]
    Exit { command: String, exit_code: i32 },
}

impl ExecutionError {
    /// Exit code of the failed process, if it got far enough to have one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::Spawn { .. } => None,
            ExecutionError::Exit { exit_code, .. } => Some(*exit_code),
        }
    }
}
