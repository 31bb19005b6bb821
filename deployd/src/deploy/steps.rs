//! Sequential step runner

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::deploy::executor::CommandExecutor;
use crate::errors::ExecutionError;
use crate::models::deployment::Step;

/// Runs deploy steps one after another, stopping at the first failure.
///
/// Holds no state between runs, so replaying the same list during a
/// rollback is just another call.
pub struct StepRunner {
    executor: Arc<dyn CommandExecutor>,
    dir: PathBuf,
}

impl StepRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            dir: dir.into(),
        }
    }

    pub async fn run_steps(&self, steps: &[Step]) -> Result<(), ExecutionError> {
        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            info!("Running step {}/{}: {}", index + 1, total, step.program());
            if let Err(e) = self
                .executor
                .execute(step.program(), step.args(), &self.dir)
                .await
            {
                error!("Step {}/{} failed: {}", index + 1, total, e);
                return Err(e);
            }
        }
        Ok(())
    }
}
