//! Runs the steps of a full update in order.

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

/// What to do when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop; later steps are reported as skipped
    Abort,
    /// Record the failure and run the remaining steps
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded(String),
    Failed(String),
    Skipped,
}

pub struct PipelineStep<'a> {
    pub name: &'static str,
    pub action: Box<dyn FnMut() -> anyhow::Result<String> + 'a>,
    /// Pause after the step succeeds
    pub pause_after: Duration,
}

impl<'a> PipelineStep<'a> {
    pub fn new<F>(name: &'static str, action: F) -> Self
    where
        F: FnMut() -> anyhow::Result<String> + 'a,
    {
        Self {
            name,
            action: Box::new(action),
            pause_after: Duration::ZERO,
        }
    }

    pub fn pause_after(mut self, pause: Duration) -> Self {
        self.pause_after = pause;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub steps: Vec<(&'static str, StepStatus)>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|(_, status)| matches!(status, StepStatus::Succeeded(_)))
    }

    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, status)| matches!(status, StepStatus::Failed(_)))
            .count()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, status)) in self.steps.iter().enumerate() {
            let line = match status {
                StepStatus::Succeeded(detail) => format!("OK      {detail}"),
                StepStatus::Failed(err) => format!("FAILED  {err}"),
                StepStatus::Skipped => "SKIPPED".to_string(),
            };
            writeln!(f, "  {}. {name}: {line}", i + 1)?;
        }
        Ok(())
    }
}

/// Runs `steps` in order under `policy` and reports every step's outcome.
pub fn run_pipeline(steps: Vec<PipelineStep<'_>>, policy: FailurePolicy) -> PipelineReport {
    let total = steps.len();
    let mut report = PipelineReport::default();
    let mut aborted = false;

    for (i, mut step) in steps.into_iter().enumerate() {
        let number = i + 1;
        if aborted {
            report.steps.push((step.name, StepStatus::Skipped));
            continue;
        }
        info!("Step {number}/{total}: {}", step.name);
        match (step.action)() {
            Ok(detail) => {
                info!("Step {number}/{total} ({}) done: {detail}", step.name);
                report.steps.push((step.name, StepStatus::Succeeded(detail)));
                if !step.pause_after.is_zero() && number < total {
                    info!(
                        "Waiting {}s before the next step",
                        step.pause_after.as_secs()
                    );
                    thread::sleep(step.pause_after);
                }
            }
            Err(e) => {
                error!("Step {number}/{total} ({}) failed: {e:#}", step.name);
                report
                    .steps
                    .push((step.name, StepStatus::Failed(format!("{e:#}"))));
                match policy {
                    FailurePolicy::Abort => {
                        error!("Aborting the remaining steps");
                        aborted = true;
                    }
                    FailurePolicy::Continue => {
                        warn!("Continuing despite the failure; later steps may use stale data");
                    }
                }
            }
        }
    }
    report
}
