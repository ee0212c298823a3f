//! Structured observability hooks for harness runs.
//!
//! The orchestrator and scenario modules report through an injected
//! [`ProbeObserver`] instead of a global logger. [`TracingObserver`] emits
//! `tracing` events at `info!` level; [`NoopObserver`] discards everything.

use tracing::{info, warn};

use crate::catalog::SkippedScenario;
use crate::result::{StepResult, SuiteResult, TestResult};
use crate::scenario::Scenario;

/// Receives lifecycle notifications for one harness run.
///
/// Every method defaults to doing nothing.
pub trait ProbeObserver: Send + Sync {
    fn discovery_finished(&self, _agent_url: &str, _step: &StepResult) {}

    fn scenario_skipped(&self, _skipped: &SkippedScenario) {}

    fn scenario_started(&self, _scenario: Scenario) {}

    fn step_finished(&self, _scenario: Option<Scenario>, _step: &StepResult) {}

    fn scenario_finished(&self, _result: &TestResult) {}

    fn suite_finished(&self, _suite: &SuiteResult) {}
}

/// Discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProbeObserver for NoopObserver {}

/// Emits one `tracing` event per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProbeObserver for TracingObserver {
    fn discovery_finished(&self, agent_url: &str, step: &StepResult) {
        if step.passed {
            info!(
                event = "discovery.finished",
                agent_url = %agent_url,
                duration_ms = step.duration_ms,
                warnings = step.warnings.len(),
            );
        } else {
            warn!(
                event = "discovery.failed",
                agent_url = %agent_url,
                error = step.error.as_deref().unwrap_or("unknown"),
            );
        }
    }

    fn scenario_skipped(&self, skipped: &SkippedScenario) {
        info!(
            event = "scenario.skipped",
            scenario = %skipped.scenario,
            reason = %skipped.reason,
        );
    }

    fn scenario_started(&self, scenario: Scenario) {
        info!(event = "scenario.started", scenario = %scenario);
    }

    fn step_finished(&self, scenario: Option<Scenario>, step: &StepResult) {
        let scenario = scenario.map(|s| s.as_str()).unwrap_or("-");
        if step.passed {
            info!(
                event = "step.passed",
                scenario = %scenario,
                step = %step.step,
                task = step.task.as_deref().unwrap_or("-"),
                duration_ms = step.duration_ms,
            );
        } else {
            warn!(
                event = "step.failed",
                scenario = %scenario,
                step = %step.step,
                task = step.task.as_deref().unwrap_or("-"),
                duration_ms = step.duration_ms,
                error = step.error.as_deref().unwrap_or("unknown"),
            );
        }
    }

    fn scenario_finished(&self, result: &TestResult) {
        info!(
            event = "scenario.finished",
            scenario = %result.scenario,
            passed = result.overall_passed,
            steps = result.steps.len(),
            duration_ms = result.total_duration_ms,
        );
    }

    fn suite_finished(&self, suite: &SuiteResult) {
        info!(
            event = "suite.finished",
            agent_url = %suite.agent_url,
            passed = suite.overall_passed,
            passed_count = suite.passed_count,
            failed_count = suite.failed_count,
            skipped_count = suite.scenarios_skipped.len(),
            duration_ms = suite.total_duration_ms,
        );
    }
}

/// Span tagging every event of one run with its session id.
pub fn run_span(session_id: &str, agent_url: &str) -> tracing::Span {
    tracing::info_span!("adcp.run", session_id = %session_id, agent_url = %agent_url)
}
