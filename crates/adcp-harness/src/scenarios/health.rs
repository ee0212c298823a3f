//! Health check: the agent answers introspection with a usable tool list.

use adcp_client::operations::ALL_OPERATIONS;
use adcp_client::AgentInfo;

use super::{ScenarioContext, ScenarioOutcome};
use crate::result::StepResult;
use crate::step::run_step;

pub async fn health_check(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let client = ctx.client.clone();
    let (info, mut step) = run_step("Agent info", None, || async move {
        Ok(client.get_agent_info().await?)
    })
    .await;

    let Some(info) = info else {
        ctx.record(step);
        return ctx.finish();
    };
    if info.tools.is_empty() {
        step.fail("Agent advertises no tools");
    } else {
        step.details(format!("{} exposes {} tools", info.name, info.tools.len()));
    }
    step.preview(&info.tool_names());
    ctx.record(step);

    let mut step = StepResult::new("Recognised operations", None);
    let unknown = unrecognised_tools(&info);
    if unknown.is_empty() {
        step.details("All advertised tools are protocol operations");
    } else {
        step.details(format!("{} tools outside the protocol", unknown.len()));
        for name in unknown {
            step.warn(format!("Unrecognised tool '{}'", name));
        }
    }
    ctx.record(step);

    ctx.finish()
}

fn unrecognised_tools(info: &AgentInfo) -> Vec<String> {
    info.tools
        .iter()
        .map(|t| t.name.clone())
        .filter(|name| !ALL_OPERATIONS.contains(&name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use crate::scenarios::testing;
    use adcp_client::fakes::ScriptedAgent;
    use serde_json::json;

    #[tokio::test]
    async fn test_health_check_passes_with_tools() {
        let agent = ScriptedAgent::new("seller")
            .with_success("get_products", json!({}))
            .with_success("custom_debug_tool", json!({}));
        let outcome = health_check(testing::context(Scenario::HealthCheck, &agent).await).await;

        assert!(outcome.steps.iter().all(|s| s.passed));
        let recognised = testing::step(&outcome, "Recognised operations");
        assert_eq!(recognised.warnings, vec!["Unrecognised tool 'custom_debug_tool'"]);
    }

    #[tokio::test]
    async fn test_health_check_fails_without_tools() {
        let agent = ScriptedAgent::new("empty");
        let outcome = health_check(testing::context(Scenario::HealthCheck, &agent).await).await;
        assert!(!testing::step(&outcome, "Agent info").passed);
    }
}
