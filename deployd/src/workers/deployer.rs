//! Deployment worker
//!
//! Owns one deployment from handshake to final status report: capture the
//! baseline revision, fetch and check out the target, run the steps, and
//! roll back by restoring the baseline and replaying the steps if any of
//! them fail.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncWrite, BufReader};
use tracing::{error, info, warn, Instrument};

use crate::deploy::channel::{HandshakeSender, RequestReceiver};
use crate::deploy::executor::{CommandExecutor, ProcessExecutor};
use crate::deploy::fsm::{WorkerEvent, WorkerFsm, WorkerState};
use crate::deploy::git::{GitCheckout, GitRemote};
use crate::deploy::reporter::{report_best_effort, GithubStatusReporter, StatusReporter};
use crate::deploy::steps::StepRunner;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::deployment::{DeploymentRequest, DeploymentStatus, HandshakeMessage, Step};

/// Drives the checkout, run and rollback lifecycle for one request
pub struct DeploymentWorker {
    commit: String,
    steps: Vec<Step>,
    checkout: GitCheckout,
    runner: StepRunner,
    reporter: Arc<dyn StatusReporter>,
    fsm: WorkerFsm,
}

impl DeploymentWorker {
    pub fn new(
        request: DeploymentRequest,
        executor: Arc<dyn CommandExecutor>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let DeploymentRequest {
            dir,
            commit,
            steps,
            owner,
            repo,
            token,
            endpoints,
            ..
        } = request;

        let remote = GitRemote {
            base_url: endpoints.git_url,
            owner,
            repo,
            token,
        };

        Self {
            commit,
            steps,
            checkout: GitCheckout::new(executor.clone(), dir.clone(), remote),
            runner: StepRunner::new(executor, dir),
            reporter,
            fsm: WorkerFsm::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> &WorkerState {
        self.fsm.state()
    }

    /// Run the lifecycle to completion, sending the handshake first.
    ///
    /// Returns the single status that was reported.
    pub async fn run<W>(mut self, handshake: HandshakeSender<W>) -> DeploymentStatus
    where
        W: AsyncWrite + Unpin,
    {
        // Proof of life before touching the working tree. If this fails the
        // dispatcher times out and reports on its own.
        if let Err(e) = handshake.send(&HandshakeMessage { ack: true }).await {
            warn!("Failed to send handshake: {}", e);
        }
        self.transition(WorkerEvent::HandshakeSent);

        if self.prepare_checkout().await {
            self.deploy().await;
        }

        let status = self.fsm.outcome().unwrap_or(DeploymentStatus::Error);
        report_best_effort(self.reporter.as_ref(), status).await;
        self.transition(WorkerEvent::Terminate);
        status
    }

    /// Capture the baseline then move to the target revision.
    ///
    /// Returns false once the FSM has settled on an error report.
    async fn prepare_checkout(&mut self) -> bool {
        let baseline = match self.checkout.current_revision().await {
            Ok(revision) => revision,
            Err(e) => {
                error!("Failed to read current revision: {}", e);
                self.transition(WorkerEvent::CheckoutFailed(e.to_string()));
                return false;
            }
        };
        info!("Baseline revision: {}", baseline);
        self.transition(WorkerEvent::BaselineCaptured(baseline));

        let result = match self.checkout.fetch().await {
            Ok(()) => self.checkout.checkout(&self.commit).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("Failed to checkout commit {}: {}", self.commit, e);
            self.transition(WorkerEvent::CheckoutFailed(e.to_string()));
            return false;
        }

        self.transition(WorkerEvent::CheckedOut);
        true
    }

    /// Run the steps, rolling back on failure
    async fn deploy(&mut self) {
        match self.runner.run_steps(&self.steps).await {
            Ok(()) => {
                info!("All {} steps succeeded", self.steps.len());
                self.transition(WorkerEvent::StepsSucceeded);
                self.transition(WorkerEvent::Reported);
            }
            Err(e) => {
                error!("Failed to run steps, rolling back: {}", e);
                self.transition(WorkerEvent::StepsFailed(e.to_string()));
                match self.rollback().await {
                    Ok(()) => {
                        info!("Rolled back to {}", self.fsm.baseline().unwrap_or("?"));
                        self.transition(WorkerEvent::RollbackSucceeded);
                    }
                    Err(e) => {
                        error!("Failed to roll back: {}", e);
                        self.transition(WorkerEvent::RollbackFailed(e.to_string()));
                    }
                }
            }
        }
    }

    /// Restore the baseline revision and replay every step from the start
    async fn rollback(&self) -> Result<(), AgentError> {
        let baseline = self
            .fsm
            .baseline()
            .ok_or_else(|| AgentError::Internal("no baseline revision captured".to_string()))?;
        self.checkout.checkout(baseline).await?;
        self.runner.run_steps(&self.steps).await?;
        Ok(())
    }

    fn transition(&mut self, event: WorkerEvent) {
        if let Err(e) = self.fsm.process(event) {
            // Only reachable through a bug in the lifecycle above
            error!("{}", e);
        }
    }
}

/// Worker process entry point.
///
/// Reads one request from stdin, acknowledges on stdout and runs the
/// lifecycle. Any panic inside the lifecycle is logged without a second
/// status report.
pub async fn run_worker_process() -> Result<(), AgentError> {
    let stdout = tokio::io::stdout();

    let request = match RequestReceiver::new(BufReader::new(tokio::io::stdin()))
        .recv()
        .await
    {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read deployment request: {}", e);
            send_nack(stdout).await;
            return Err(AgentError::InvalidRequest(e.to_string()));
        }
    };

    let span = request.span();
    let client = match HttpClient::new(&request.endpoints.api_url) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            span.in_scope(|| error!("Failed to build status client: {}", e));
            send_nack(stdout).await;
            return Err(e);
        }
    };

    let reporter: Arc<dyn StatusReporter> = Arc::new(GithubStatusReporter::new(
        client,
        request.target(),
        SecretString::from(request.token.expose_secret().to_string()),
    ));
    let worker = DeploymentWorker::new(request, Arc::new(ProcessExecutor::new()), reporter);

    let lifecycle = tokio::spawn(
        async move { worker.run(HandshakeSender::new(stdout)).await }.instrument(span.clone()),
    );

    let result = lifecycle.await;
    span.in_scope(|| match result {
        Ok(status) => {
            info!("Deployment finished: {}", status);
            Ok(())
        }
        Err(e) => {
            error!("Deployment worker crashed: {}", e);
            Err(AgentError::Internal(e.to_string()))
        }
    })
}

async fn send_nack<W: AsyncWrite + Unpin>(writer: W) {
    if let Err(e) = HandshakeSender::new(writer)
        .send(&HandshakeMessage { ack: false })
        .await
    {
        warn!("Failed to send handshake: {}", e);
    }
}
