//! Step runner and per-scenario step accumulator.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::observer::ProbeObserver;
use crate::result::StepResult;
use crate::scenario::Scenario;

/// Run one probe with timing and error capture.
///
/// Never fails: an `Err` or a panic inside `f` yields a failed step and no
/// value.
pub async fn run_step<T, F, Fut>(name: &str, task: Option<&str>, f: F) -> (Option<T>, StepResult)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut step = StepResult::new(name, task);
    let start = Instant::now();
    let outcome = AssertUnwindSafe(async move { f().await })
        .catch_unwind()
        .await;
    step.duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(value)) => (Some(value), step),
        Ok(Err(err)) => {
            step.fail(format!("{:#}", err));
            (None, step)
        }
        Err(payload) => {
            step.fail(format!("step panicked: {}", panic_message(payload.as_ref())));
            (None, step)
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Ordered step results of one scenario.
///
/// Steps are appended strictly in execution order; each append notifies the
/// observer.
pub struct StepLog {
    scenario: Option<Scenario>,
    observer: Arc<dyn ProbeObserver>,
    steps: Vec<StepResult>,
}

impl StepLog {
    pub fn new(scenario: Option<Scenario>, observer: Arc<dyn ProbeObserver>) -> Self {
        Self {
            scenario,
            observer,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: StepResult) {
        self.observer.step_finished(self.scenario, &step);
        self.steps.push(step);
    }

    /// Run `f` as a step, record it, and hand back its value.
    pub async fn run<T, F, Fut>(&mut self, name: &str, task: Option<&str>, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let (value, step) = run_step(name, task, f).await;
        self.record(step);
        value
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Most recent `created_id`, if any step produced one.
    pub fn last_created_id(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| s.created_id.as_deref())
    }

    pub fn into_steps(self) -> Vec<StepResult> {
        self.steps
    }
}
