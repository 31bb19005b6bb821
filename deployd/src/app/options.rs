//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::dispatcher;
use crate::logs::LogLevel;
use crate::models::deployment::Endpoints;
use crate::storage::services::ServiceConfig;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    pub server: ServerOptions,
    pub github: GithubOptions,
    pub dispatcher: dispatcher::Options,
    pub worker: WorkerOptions,
    pub services: Vec<ServiceConfig>,
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            github: GithubOptions {
                endpoints: settings.github.endpoints(),
                app_id: settings.github.app_id,
                private_key_path: settings.github.private_key_path.clone(),
                webhook_secret: settings
                    .github
                    .webhook_secret
                    .clone()
                    .map(SecretString::from),
            },
            dispatcher: dispatcher::Options {
                handshake_timeout: settings.dispatcher.handshake_timeout(),
            },
            worker: WorkerOptions {
                program: settings.dispatcher.worker_program.clone(),
                log_level: settings.log_level.clone(),
                json_logs: settings.json_logs,
            },
            services: settings.services.clone(),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Webhook server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// GitHub App credentials and endpoints
#[derive(Debug)]
pub struct GithubOptions {
    pub endpoints: Endpoints,
    pub app_id: u64,
    pub private_key_path: PathBuf,
    pub webhook_secret: Option<SecretString>,
}

/// How worker processes are started
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Worker binary; the running executable when `None`
    pub program: Option<PathBuf>,
    pub log_level: LogLevel,
    pub json_logs: bool,
}

impl WorkerOptions {
    /// Command line that puts the binary in worker mode
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--worker".to_string(),
            format!("--log-level={}", self.log_level.to_filter_string()),
        ];
        if self.json_logs {
            args.push("--json-logs".to_string());
        }
        args
    }
}
