//! Step, test and suite result types.
//!
//! Pass/fail is always derived: a test passes iff it has no failed step and
//! at least one passed step; a suite passes iff no test failed and at least
//! one passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SkippedScenario;
use crate::profile::AgentProfile;
use crate::scenario::Scenario;

/// Longest response preview kept on a step.
pub const PREVIEW_LIMIT: usize = 500;

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub passed: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    /// Identifier of a resource created by this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StepResult {
    /// A passed step with no timing.
    pub fn new(step: impl Into<String>, task: Option<&str>) -> Self {
        Self {
            step: step.into(),
            task: task.map(str::to_string),
            passed: true,
            ..Self::default()
        }
    }

    /// Failed step that never ran a probe, e.g. an unknown scenario.
    pub fn synthetic_failure(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            passed: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn pass(&mut self, details: impl Into<String>) -> &mut Self {
        self.passed = true;
        self.error = None;
        self.details = Some(details.into());
        self
    }

    pub fn fail(&mut self, error: impl Into<String>) -> &mut Self {
        self.passed = false;
        self.error = Some(error.into());
        self
    }

    pub fn details(&mut self, details: impl Into<String>) -> &mut Self {
        self.details = Some(details.into());
        self
    }

    pub fn warn(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn created(&mut self, id: impl Into<String>) -> &mut Self {
        self.created_id = Some(id.into());
        self
    }

    /// Store a truncated JSON rendering of `value`.
    pub fn preview<T: Serialize>(&mut self, value: &T) -> &mut Self {
        if let Ok(rendered) = serde_json::to_string(value) {
            self.response_preview = Some(truncate_preview(&rendered));
        }
        self
    }
}

fn truncate_preview(s: &str) -> String {
    if s.len() <= PREVIEW_LIMIT {
        return s.to_string();
    }
    let mut end = PREVIEW_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Result of one scenario against one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub agent_url: String,
    pub scenario: Scenario,
    pub overall_passed: bool,
    pub steps: Vec<StepResult>,
    pub summary: String,
    pub total_duration_ms: u64,
    pub tested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_profile: Option<AgentProfile>,
    pub dry_run: bool,
}

impl TestResult {
    pub fn new(
        agent_url: &str,
        scenario: Scenario,
        steps: Vec<StepResult>,
        agent_profile: Option<AgentProfile>,
        dry_run: bool,
        total_duration_ms: u64,
    ) -> Self {
        let passed = steps.iter().filter(|s| s.passed).count();
        let failed = steps.len() - passed;
        let overall_passed = failed == 0 && passed > 0;
        let summary = if steps.is_empty() {
            "No steps executed".to_string()
        } else if overall_passed {
            format!("All {} steps passed", passed)
        } else {
            format!("{} of {} steps failed", failed, steps.len())
        };
        Self {
            agent_url: agent_url.to_string(),
            scenario,
            overall_passed,
            steps,
            summary,
            total_duration_ms,
            tested_at: Utc::now(),
            agent_profile,
            dry_run,
        }
    }

    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.len() - self.passed_steps()
    }
}

/// Aggregate of every scenario run against one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub agent_url: String,
    pub agent_profile: AgentProfile,
    pub scenarios_run: Vec<Scenario>,
    pub scenarios_skipped: Vec<SkippedScenario>,
    pub results: Vec<TestResult>,
    pub overall_passed: bool,
    pub passed_count: usize,
    pub failed_count: usize,
    pub total_duration_ms: u64,
    pub tested_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Why capability discovery failed, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_error: Option<String>,
}

impl SuiteResult {
    /// Fold test results into a suite.
    pub fn from_results(
        agent_url: &str,
        agent_profile: AgentProfile,
        results: Vec<TestResult>,
        scenarios_skipped: Vec<SkippedScenario>,
        dry_run: bool,
        total_duration_ms: u64,
    ) -> Self {
        let passed_count = results.iter().filter(|r| r.overall_passed).count();
        let failed_count = results.len() - passed_count;
        Self {
            agent_url: agent_url.to_string(),
            agent_profile,
            scenarios_run: results.iter().map(|r| r.scenario).collect(),
            scenarios_skipped,
            results,
            overall_passed: failed_count == 0 && passed_count > 0,
            passed_count,
            failed_count,
            total_duration_ms,
            tested_at: Utc::now(),
            dry_run,
            discovery_error: None,
        }
    }

    /// Empty failed suite for an agent that could not be introspected.
    pub fn discovery_failed(
        agent_url: &str,
        error: impl Into<String>,
        dry_run: bool,
        total_duration_ms: u64,
    ) -> Self {
        let mut suite = Self::from_results(
            agent_url,
            AgentProfile::default(),
            Vec::new(),
            Vec::new(),
            dry_run,
            total_duration_ms,
        );
        suite.discovery_error = Some(error.into());
        suite
    }
}
