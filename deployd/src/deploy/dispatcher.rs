//! Worker dispatcher
//!
//! Launches a detached worker process for each deployment and waits a
//! bounded time for its handshake. After an `ack: true` the worker owns
//! status reporting and the dispatcher steps aside; otherwise the
//! dispatcher reports `error` itself.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error, info, warn, Instrument};

use crate::deploy::channel::{HandshakeReceiver, RequestSender};
use crate::deploy::reporter::{report_best_effort, StatusReporter};
use crate::errors::AgentError;
use crate::models::deployment::{DeploymentRequest, DeploymentStatus, HandshakeMessage};

/// Dispatcher options
#[derive(Debug, Clone)]
pub struct Options {
    /// How long a freshly spawned worker has to acknowledge
    pub handshake_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(1000),
        }
    }
}

/// A launched worker as seen from the dispatcher
#[async_trait]
pub trait WorkerProcess: Send {
    /// Wait for the worker's single handshake message
    async fn recv_handshake(&mut self) -> Result<HandshakeMessage, AgentError>;

    /// Exit code if the process has already exited
    fn exit_code(&mut self) -> Option<i32>;

    /// Drop every handle to the process without signalling it
    fn release(self: Box<Self>);
}

/// Starts worker processes
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Start a worker and hand it `request` as its first message
    async fn launch(&self, request: DeploymentRequest)
        -> Result<Box<dyn WorkerProcess>, AgentError>;
}

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Worker acknowledged and owns reporting
    HandedOff,
    /// Worker reported that it could not initialize
    InitFailed,
    /// Worker exited before acknowledging
    ExitedEarly(i32),
    /// Worker still running but silent past the timeout
    TimedOut,
    /// Worker process could not be created
    LaunchFailed(String),
}

impl DispatchOutcome {
    /// Whether the dispatcher reported `error` for this outcome
    pub fn reported_error(&self) -> bool {
        !matches!(self, DispatchOutcome::HandedOff)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::HandedOff => f.write_str("handed_off"),
            DispatchOutcome::InitFailed => f.write_str("init_failed"),
            DispatchOutcome::ExitedEarly(code) => write!(f, "exited_early({})", code),
            DispatchOutcome::TimedOut => f.write_str("timed_out"),
            DispatchOutcome::LaunchFailed(_) => f.write_str("launch_failed"),
        }
    }
}

enum Race {
    Handshake(Result<HandshakeMessage, AgentError>),
    Timeout,
}

/// Hands deployments off to worker processes
pub struct Dispatcher {
    launcher: Arc<dyn WorkerLauncher>,
    options: Options,
}

impl Dispatcher {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, options: Options) -> Self {
        Self { launcher, options }
    }

    /// Report `in_progress`, launch a worker for `request` and settle who
    /// owns the final status report.
    pub async fn dispatch(
        &self,
        request: DeploymentRequest,
        reporter: &dyn StatusReporter,
    ) -> DispatchOutcome {
        let span = request.span();
        self.dispatch_inner(request, reporter).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        request: DeploymentRequest,
        reporter: &dyn StatusReporter,
    ) -> DispatchOutcome {
        report_best_effort(reporter, DeploymentStatus::InProgress).await;

        let mut worker = match self.launcher.launch(request).await {
            Ok(worker) => worker,
            Err(e) => {
                error!("Failed to launch deployment worker: {}", e);
                report_best_effort(reporter, DeploymentStatus::Error).await;
                return DispatchOutcome::LaunchFailed(e.to_string());
            }
        };

        let timer = tokio::time::sleep(self.options.handshake_timeout);
        tokio::pin!(timer);

        let race = tokio::select! {
            result = worker.recv_handshake() => Race::Handshake(result),
            _ = &mut timer => Race::Timeout,
        };

        let handshake = match race {
            Race::Handshake(Ok(message)) => Some(message),
            Race::Handshake(Err(e)) => {
                // Not a handshake; let the timer decide like any silent worker
                warn!("No usable handshake from worker: {}", e);
                (&mut timer).await;
                None
            }
            Race::Timeout => None,
        };

        match handshake {
            Some(HandshakeMessage { ack: true }) => {
                worker.release();
                info!("Running deployment");
                DispatchOutcome::HandedOff
            }
            Some(HandshakeMessage { ack: false }) => {
                worker.release();
                error!("Deployment init failed");
                report_best_effort(reporter, DeploymentStatus::Error).await;
                DispatchOutcome::InitFailed
            }
            None => match worker.exit_code() {
                Some(code) => {
                    // Already gone, nothing to release
                    error!("Deployment worker exited with code {}", code);
                    report_best_effort(reporter, DeploymentStatus::Error).await;
                    DispatchOutcome::ExitedEarly(code)
                }
                None => {
                    worker.release();
                    error!(
                        "Deployment init timed out after {:?}",
                        self.options.handshake_timeout
                    );
                    report_best_effort(reporter, DeploymentStatus::Error).await;
                    DispatchOutcome::TimedOut
                }
            },
        }
    }
}

/// Launches workers as detached child processes.
///
/// The request goes in on the child's stdin, the handshake comes back on
/// its stdout, and its stderr is shared with ours.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the running binary in worker mode
    pub fn current_exe(args: Vec<String>) -> Result<Self, AgentError> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, args))
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn launch(
        &self,
        request: DeploymentRequest,
    ) -> Result<Box<dyn WorkerProcess>, AgentError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        // Own process group: signals aimed at the server don't reach it
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            AgentError::DeployError(format!(
                "Failed to spawn worker {}: {}",
                self.program.display(),
                e
            ))
        })?;
        debug!(pid = child.id(), "Spawned deployment worker");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Internal("worker stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Internal("worker stdout not piped".to_string()))?;

        // Written in the background so a worker that never reads cannot stall
        // the handshake race
        tokio::spawn(
            async move {
                if let Err(e) = RequestSender::new(stdin).send(&request).await {
                    warn!("Failed to send deployment request to worker: {}", e);
                }
            }
            .in_current_span(),
        );

        Ok(Box::new(ChildWorker {
            child,
            stdout: Some(stdout),
        }))
    }
}

struct ChildWorker {
    child: Child,
    stdout: Option<ChildStdout>,
}

#[async_trait]
impl WorkerProcess for ChildWorker {
    async fn recv_handshake(&mut self) -> Result<HandshakeMessage, AgentError> {
        let stdout = self.stdout.take().ok_or_else(|| {
            AgentError::HandshakeError("handshake already consumed".to_string())
        })?;
        HandshakeReceiver::new(BufReader::new(stdout)).recv().await
    }

    fn exit_code(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to poll worker process: {}", e);
                None
            }
        }
    }

    fn release(self: Box<Self>) {
        let ChildWorker { child, stdout } = *self;
        drop(stdout);
        debug!(pid = child.id(), "Released deployment worker");
        // kill_on_drop is off, so dropping leaves the process running
        drop(child);
    }
}
