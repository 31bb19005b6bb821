//! Finite State Machine for the deployment worker lifecycle

use serde::{Deserialize, Serialize};

use crate::models::deployment::DeploymentStatus;

/// Worker lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Started, handshake not yet sent
    Initializing,

    /// Recording the revision to roll back to
    CapturingBaseline,

    /// Fetching and switching to the target revision
    Checkout,

    /// Running deploy steps
    Running,

    /// All steps passed
    Success,

    /// A step failed; restoring the baseline and replaying steps
    RollingBack,

    ReportedSuccess,
    ReportedFailure,
    ReportedError,

    Terminated,
}

/// Worker lifecycle event
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Handshake sent to the dispatcher
    HandshakeSent,

    /// Baseline revision captured
    BaselineCaptured(String),

    /// Target revision checked out
    CheckedOut,

    /// Baseline capture, fetch or checkout failed
    CheckoutFailed(String),

    /// Every step exited 0
    StepsSucceeded,

    /// A step exited non-zero
    StepsFailed(String),

    /// Baseline restored and steps replayed cleanly
    RollbackSucceeded,

    /// Rollback checkout or replay failed
    RollbackFailed(String),

    /// Success is about to be reported
    Reported,

    /// Done
    Terminate,
}

/// Worker lifecycle FSM
#[derive(Debug, Clone)]
pub struct WorkerFsm {
    state: WorkerState,
    baseline: Option<String>,
    error: Option<String>,
    rollback_error: Option<String>,
}

impl WorkerFsm {
    /// Create a new FSM in the initializing state
    pub fn new() -> Self {
        Self {
            state: WorkerState::Initializing,
            baseline: None,
            error: None,
            rollback_error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Revision captured before checkout
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Cause of the checkout or step failure, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Cause of a failed rollback, if any
    pub fn rollback_error(&self) -> Option<&str> {
        self.rollback_error.as_deref()
    }

    /// Status owed to the status service; `Some` only in the `Reported*` states
    pub fn outcome(&self) -> Option<DeploymentStatus> {
        match self.state {
            WorkerState::ReportedSuccess => Some(DeploymentStatus::Success),
            WorkerState::ReportedFailure => Some(DeploymentStatus::Failure),
            WorkerState::ReportedError => Some(DeploymentStatus::Error),
            _ => None,
        }
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: WorkerEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (WorkerState::Initializing, WorkerEvent::HandshakeSent) => {
                WorkerState::CapturingBaseline
            }

            (WorkerState::CapturingBaseline, WorkerEvent::BaselineCaptured(revision)) => {
                self.baseline = Some(revision.clone());
                WorkerState::Checkout
            }

            // No known-good state to return to, so no rollback
            (
                WorkerState::CapturingBaseline | WorkerState::Checkout,
                WorkerEvent::CheckoutFailed(err),
            ) => {
                self.error = Some(err.clone());
                WorkerState::ReportedError
            }

            (WorkerState::Checkout, WorkerEvent::CheckedOut) => WorkerState::Running,

            (WorkerState::Running, WorkerEvent::StepsSucceeded) => WorkerState::Success,
            (WorkerState::Running, WorkerEvent::StepsFailed(err)) => {
                self.error = Some(err.clone());
                WorkerState::RollingBack
            }

            (WorkerState::Success, WorkerEvent::Reported) => WorkerState::ReportedSuccess,

            // Rollback outcome never changes the reported category
            (WorkerState::RollingBack, WorkerEvent::RollbackSucceeded) => {
                WorkerState::ReportedFailure
            }
            (WorkerState::RollingBack, WorkerEvent::RollbackFailed(err)) => {
                self.rollback_error = Some(err.clone());
                WorkerState::ReportedFailure
            }

            (
                WorkerState::ReportedSuccess
                | WorkerState::ReportedFailure
                | WorkerState::ReportedError,
                WorkerEvent::Terminate,
            ) => WorkerState::Terminated,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    /// Whether the lifecycle has finished
    pub fn is_terminated(&self) -> bool {
        self.state == WorkerState::Terminated
    }
}

impl Default for WorkerFsm {
    fn default() -> Self {
        Self::new()
    }
}
