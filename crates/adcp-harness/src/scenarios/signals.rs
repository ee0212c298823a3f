//! Signals protocol: discovery and activation.

use adcp_client::operations::{ActivateSignal, GetSignals};
use adcp_client::types::Signal;
use adcp_client::Operation;
use serde_json::{json, Value};

use super::{track_created, ScenarioContext, ScenarioOutcome};
use crate::probes::Severity;

const UNKNOWN_SIGNAL_ID: &str = "signal-nonexistent-conformance-000";

fn signals_request(ctx: &ScenarioContext) -> Value {
    let mut params = json!({
        "signal_spec": ctx.options.brief_text(),
        "deliver_to": { "platforms": "all", "countries": ["US"] },
    });
    if !ctx.options.signal_types.is_empty() {
        params["filters"] = json!({ "catalog_types": ctx.options.signal_types });
    }
    params
}

fn activation_request(segment_id: &str, signal: Option<&Signal>) -> Value {
    let platform = signal
        .and_then(|s| s.deployments.first())
        .and_then(|d| d.platform.clone())
        .unwrap_or_else(|| "conformance-dsp".to_string());
    json!({
        "signal_agent_segment_id": segment_id,
        "platform": platform,
    })
}

pub async fn signals_flow(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let params = signals_request(&ctx);
    let (response, mut step) = ctx.require::<GetSignals>("Discover signals", params).await;
    let signals = response.map(|r| r.signals).unwrap_or_default();
    if step.passed {
        let unnamed = signals
            .iter()
            .filter(|s| s.signal_agent_segment_id.is_empty())
            .count();
        if unnamed > 0 {
            step.fail(format!(
                "{} of {} signals lack signal_agent_segment_id",
                unnamed,
                signals.len()
            ));
        } else {
            step.details(format!("Found {} signals", signals.len()));
            if signals.is_empty() {
                step.warn("Agent returned no signals for the brief");
            }
        }
        if !ctx.options.signal_types.is_empty() {
            let off_type: Vec<&str> = signals
                .iter()
                .filter(|s| {
                    s.signal_type
                        .as_ref()
                        .is_some_and(|t| !ctx.options.signal_types.contains(t))
                })
                .map(|s| s.signal_agent_segment_id.as_str())
                .collect();
            if !off_type.is_empty() {
                step.warn(format!(
                    "Signals outside the requested types: {}",
                    off_type.join(", ")
                ));
            }
        }
    }
    ctx.record(step);

    if !ctx.has_tool(ActivateSignal::NAME) {
        return ctx.finish();
    }

    match signals.iter().find(|s| !s.signal_agent_segment_id.is_empty()) {
        Some(signal) => {
            let request = activation_request(&signal.signal_agent_segment_id, Some(signal));
            let (response, mut step) = ctx
                .require::<ActivateSignal>("Activate signal", request)
                .await;
            if let Some(response) = response {
                if !response.errors.is_empty() {
                    step.fail(format!("activate_signal reported errors: {}", json!(response.errors)));
                } else {
                    track_created(&mut step, response.decisioning_platform_segment_id.as_deref());
                    step.details(format!(
                        "Activated {} ({} deployments)",
                        signal.signal_agent_segment_id,
                        response.deployments.len()
                    ));
                }
            }
            ctx.record(step);
        }
        None => ctx.note("Activate signal", "No signals to activate; probe skipped"),
    }

    ctx.expect_rejection(
        "Reject unknown signal activation",
        ActivateSignal::NAME,
        activation_request(UNKNOWN_SIGNAL_ID, None),
        "activation of an unknown signal",
        Severity::Normal,
    )
    .await;

    ctx.finish()
}
