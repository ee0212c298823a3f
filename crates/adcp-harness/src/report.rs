//! Human-readable and structured renderings of run results.
//!
//! Rendering is presentation only; pass/fail values are printed as computed.

use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::result::{StepResult, SuiteResult, TestResult};

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn render_step(out: &mut String, step: &StepResult) {
    let mark = if step.passed { "✓" } else { "✗" };
    out.push_str(&format!("  {} {} ({} ms)", mark, step.step, step.duration_ms));
    if let Some(details) = &step.details {
        out.push_str(&format!(": {}", details));
    }
    out.push('\n');
    if let Some(error) = &step.error {
        out.push_str(&format!("      error: {}\n", error));
    }
    for warning in &step.warnings {
        out.push_str(&format!("      warning: {}\n", warning));
    }
    if let Some(id) = &step.created_id {
        out.push_str(&format!("      created: {}\n", id));
    }
}

/// Plain-text report for one scenario.
pub fn render_test_result(result: &TestResult) -> String {
    let mut out = format!(
        "[{}] {} ({} steps, {} ms): {}\n",
        verdict(result.overall_passed),
        result.scenario,
        result.steps.len(),
        result.total_duration_ms,
        result.summary
    );
    for step in &result.steps {
        render_step(&mut out, step);
    }
    out
}

/// Plain-text report for a whole suite.
pub fn render_suite_result(suite: &SuiteResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("AdCP conformance: {}\n", suite.agent_url));
    if !suite.agent_profile.name.is_empty() {
        out.push_str(&format!(
            "Agent: {} ({} tools)\n",
            suite.agent_profile.name,
            suite.agent_profile.tools.len()
        ));
    }
    out.push_str(&format!(
        "Result: {} ({} passed, {} failed, {} skipped) in {} ms{}\n",
        verdict(suite.overall_passed),
        suite.passed_count,
        suite.failed_count,
        suite.scenarios_skipped.len(),
        suite.total_duration_ms,
        if suite.dry_run { ", dry run" } else { "" }
    ));
    if let Some(error) = &suite.discovery_error {
        out.push_str(&format!("Discovery failed: {}\n", error));
    }

    for result in &suite.results {
        out.push('\n');
        out.push_str(&render_test_result(result));
    }

    if !suite.scenarios_skipped.is_empty() {
        out.push_str("\nSkipped:\n");
        for skipped in &suite.scenarios_skipped {
            out.push_str(&format!("  - {}: {}\n", skipped.scenario, skipped.reason));
        }
    }
    out
}

/// Markdown summary for CI job summaries and PR comments.
pub fn render_suite_markdown(suite: &SuiteResult) -> String {
    let mut out = String::new();
    out.push_str("# AdCP Conformance Report\n\n");
    out.push_str(&format!("- agent: `{}`\n", suite.agent_url));
    if !suite.agent_profile.name.is_empty() {
        out.push_str(&format!("- name: {}\n", suite.agent_profile.name));
    }
    out.push_str(&format!("- result: **{}**\n", verdict(suite.overall_passed)));
    out.push_str(&format!(
        "- scenarios: {} passed, {} failed, {} skipped\n",
        suite.passed_count,
        suite.failed_count,
        suite.scenarios_skipped.len()
    ));
    out.push_str(&format!("- dry run: {}\n", suite.dry_run));
    out.push_str(&format!("- duration: {} ms\n", suite.total_duration_ms));
    if let Some(error) = &suite.discovery_error {
        out.push_str(&format!("- discovery error: {}\n", error));
    }
    out.push('\n');

    if !suite.results.is_empty() {
        out.push_str("## Scenarios\n\n");
        out.push_str("| Scenario | Result | Steps passed | Duration |\n");
        out.push_str("|---|---|---|---|\n");
        for result in &suite.results {
            out.push_str(&format!(
                "| `{}` | {} | {}/{} | {} ms |\n",
                result.scenario,
                verdict(result.overall_passed),
                result.passed_steps(),
                result.steps.len(),
                result.total_duration_ms
            ));
        }
        out.push('\n');
    }

    let failures: Vec<(&TestResult, &StepResult)> = suite
        .results
        .iter()
        .flat_map(|r| r.steps.iter().filter(|s| !s.passed).map(move |s| (r, s)))
        .collect();
    if !failures.is_empty() {
        out.push_str("## Failures\n\n");
        for (result, step) in failures {
            out.push_str(&format!(
                "- `{}` / {}: {}\n",
                result.scenario,
                step.step,
                step.error.as_deref().unwrap_or("failed")
            ));
        }
        out.push('\n');
    }

    if !suite.scenarios_skipped.is_empty() {
        out.push_str("## Skipped\n\n");
        out.push_str("| Scenario | Missing operations |\n");
        out.push_str("|---|---|\n");
        for skipped in &suite.scenarios_skipped {
            let missing = if skipped.missing_tools.is_empty() {
                skipped.reason.clone()
            } else {
                skipped
                    .missing_tools
                    .iter()
                    .map(|t| format!("`{}`", t))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            out.push_str(&format!("| `{}` | {} |\n", skipped.scenario, missing));
        }
    }
    out
}

/// Lossless pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a suite as pretty JSON.
pub fn write_suite_json(path: &Path, suite: &SuiteResult) -> Result<()> {
    std::fs::write(path, to_json(suite)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SkippedScenario;
    use crate::profile::AgentProfile;
    use crate::scenario::Scenario;

    fn sample_suite() -> SuiteResult {
        let mut ok = StepResult::new("Get products", Some("get_products"));
        ok.details("Found 2 products");
        ok.duration_ms = 12;
        let mut bad = StepResult::new("Reject negative budget", Some("create_media_buy"));
        bad.fail("CRITICAL: agent accepted a negative budget");
        bad.duration_ms = 8;

        let passed = TestResult::new("http://agent", Scenario::Discovery, vec![ok.clone()], None, true, 12);
        let failed = TestResult::new(
            "http://agent",
            Scenario::CreateMediaBuy,
            vec![ok, bad],
            None,
            true,
            20,
        );
        let skipped = SkippedScenario {
            scenario: Scenario::SignalsFlow,
            missing_tools: vec!["get_signals".to_string()],
            reason: "agent does not expose: get_signals".to_string(),
        };
        SuiteResult::from_results(
            "http://agent",
            AgentProfile::new("Seller", ["get_products", "create_media_buy"]),
            vec![passed, failed],
            vec![skipped],
            true,
            40,
        )
    }

    #[test]
    fn test_render_test_result() {
        let suite = sample_suite();
        let text = render_test_result(&suite.results[1]);
        let expected = "[FAIL] create_media_buy (2 steps, 20 ms): 1 of 2 steps failed\n  \
                        ✓ Get products (12 ms): Found 2 products\n  \
                        ✗ Reject negative budget (8 ms)\n      \
                        error: CRITICAL: agent accepted a negative budget\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_suite_text_lists_skipped_with_reason() {
        let text = render_suite_result(&sample_suite());
        assert!(text.starts_with("AdCP conformance: http://agent\nAgent: Seller (2 tools)\n"));
        assert!(text.contains("Result: FAIL (1 passed, 1 failed, 1 skipped) in 40 ms, dry run"));
        assert!(text.contains("Skipped:\n  - signals_flow: agent does not expose: get_signals\n"));
    }

    #[test]
    fn test_suite_markdown() {
        let md = render_suite_markdown(&sample_suite());
        assert!(md.starts_with("# AdCP Conformance Report\n\n"));
        assert!(md.contains("| `discovery` | PASS | 1/1 | 12 ms |"));
        assert!(md.contains("| `create_media_buy` | FAIL | 1/2 | 20 ms |"));
        assert!(md.contains(
            "- `create_media_buy` / Reject negative budget: CRITICAL: agent accepted a negative budget"
        ));
        assert!(md.contains("| `signals_flow` | `get_signals` |"));
    }

    #[test]
    fn test_discovery_failure_rendering() {
        let suite = SuiteResult::discovery_failed("http://down", "connection refused", true, 3);
        let text = render_suite_result(&suite);
        assert!(text.contains("Result: FAIL (0 passed, 0 failed, 0 skipped)"));
        assert!(text.contains("Discovery failed: connection refused"));
        assert!(!text.contains("Agent:"));
    }

    #[test]
    fn test_json_is_lossless() {
        let suite = sample_suite();
        let json = to_json(&suite).expect("serialize");
        let back: SuiteResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, suite);
    }
}
