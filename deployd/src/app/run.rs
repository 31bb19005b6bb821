//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::authn::app_jwt::AppJwtSigner;
use crate::authn::token_mngr::GithubAppTokenProvider;
use crate::deploy::dispatcher::{Dispatcher, ProcessLauncher};
use crate::deploy::reporter::GithubStatusReporterFactory;
use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the webhook server until `shutdown_signal` resolves.
///
/// Workers already handed off keep running after the server stops.
pub async fn run(
    mut options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    info!("Initializing deployd...");

    let state = init_server_state(&mut options).await?;

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let mut server_handle = serve(&options.server, Arc::new(state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
        joined = &mut server_handle => {
            error!("Webhook server stopped unexpectedly");
            return joined.map_err(|e| AgentError::ServerError(e.to_string()))?;
        }
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(options.max_shutdown_delay, server_handle).await {
        Ok(joined) => joined.map_err(|e| AgentError::ServerError(e.to_string()))??,
        Err(_) => {
            return Err(AgentError::ServerError(format!(
                "Shutdown timed out after {:?}",
                options.max_shutdown_delay
            )));
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn init_server_state(options: &mut AppOptions) -> Result<ServerState, AgentError> {
    let github = &options.github;

    let pem = File::new(&github.private_key_path)
        .read_bytes()
        .await
        .map_err(|e| {
            AgentError::ConfigError(format!(
                "Unable to read app private key {}: {}",
                github.private_key_path.display(),
                e
            ))
        })?;
    let signer = AppJwtSigner::from_pem(github.app_id, &pem)?;

    let http_client = Arc::new(HttpClient::new(&github.endpoints.api_url)?);
    let token_provider = Arc::new(GithubAppTokenProvider::new(http_client.clone(), signer));
    let reporters = Arc::new(GithubStatusReporterFactory::new(http_client));

    let worker_args = options.worker.args();
    let launcher = match &options.worker.program {
        Some(program) => ProcessLauncher::new(program, worker_args),
        None => ProcessLauncher::current_exe(worker_args)?,
    };
    let dispatcher = Dispatcher::new(Arc::new(launcher), options.dispatcher.clone());

    if options.services.is_empty() {
        info!("No services configured, every deployment will be skipped");
    }

    Ok(ServerState {
        webhook_secret: options.github.webhook_secret.take(),
        services: options.services.clone(),
        endpoints: options.github.endpoints.clone(),
        token_provider,
        reporters,
        dispatcher: Arc::new(dispatcher),
    })
}
