//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;
use crate::models::deployment::{Endpoints, DEFAULT_API_URL, DEFAULT_GIT_URL};
use crate::storage::services::ServiceConfig;

/// deployd settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub github: GithubSettings,

    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    /// Services in match order
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Webhook listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// GitHub App settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL clone remotes are built from
    #[serde(default = "default_git_url")]
    pub git_url: String,

    #[serde(default)]
    pub app_id: u64,

    /// PEM encoded RSA key of the app
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    /// Shared secret for `X-Hub-Signature-256`; unsigned deliveries are
    /// accepted when absent
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_git_url() -> String {
    DEFAULT_GIT_URL.to_string()
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("/etc/deployd/app-key.pem")
}

impl GithubSettings {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_url: self.api_url.clone(),
            git_url: self.git_url.clone(),
        }
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            git_url: default_git_url(),
            app_id: 0,
            private_key_path: default_private_key_path(),
            webhook_secret: None,
        }
    }
}

/// Worker handoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Worker binary; the running executable when absent
    #[serde(default)]
    pub worker_program: Option<PathBuf>,
}

fn default_handshake_timeout_ms() -> u64 {
    1000
}

impl DispatcherSettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            worker_program: None,
        }
    }
}
