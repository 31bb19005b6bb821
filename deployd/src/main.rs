//! deployd entry point
//!
//! Serves GitHub deployment webhooks by default. With `--worker` it runs a
//! single deployment read from stdin instead.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use deployd::app::options::AppOptions;
use deployd::app::run::run;
use deployd::filesys::file::File;
use deployd::logs::{init_logging, LogLevel, LogOptions, LogTarget};
use deployd::storage::layout::StorageLayout;
use deployd::storage::settings::Settings;
use deployd::utils::version_info;
use deployd::workers::deployer::run_worker_process;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_args(env::args().skip(1));

    if cli_args.contains_key("version") {
        return match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render version info: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if cli_args.contains_key("worker") {
        return worker_main(&cli_args).await;
    }

    server_main(&cli_args).await
}

/// `--key=value` and bare `--flag` arguments, keyed without the dashes
fn parse_args(args: impl Iterator<Item = String>) -> HashMap<String, String> {
    let mut cli_args = HashMap::new();
    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }
    cli_args
}

async fn worker_main(cli_args: &HashMap<String, String>) -> ExitCode {
    let log_level = cli_args
        .get("log-level")
        .and_then(|l| l.parse::<LogLevel>().ok())
        .unwrap_or_default();

    // stdout carries the handshake
    let log_options = LogOptions {
        log_level,
        target: LogTarget::Stderr,
        json_format: cli_args.contains_key("json-logs"),
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run_worker_process().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Deployment worker failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn server_main(cli_args: &HashMap<String, String>) -> ExitCode {
    let settings_file = match cli_args.get("config") {
        Some(path) => File::new(PathBuf::from(path)),
        None => StorageLayout::default().settings_file(),
    };
    let settings = match settings_file.read_json::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {e}",
                settings_file.path().display()
            );
            return ExitCode::FAILURE;
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        target: LogTarget::Stdout,
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let options = AppOptions::from_settings(&settings);
    info!(
        version = %version_info().version,
        services = options.services.len(),
        "Running deployd with options: {:?}",
        options
    );

    match run(options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run deployd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
