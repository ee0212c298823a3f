//! Structured capability declaration checks.

use adcp_client::operations::GetAdcpCapabilities;
use adcp_client::types::GetAdcpCapabilitiesResponse;
use serde_json::json;

use super::{ScenarioContext, ScenarioOutcome};
use crate::profile::{cross_validate_protocols, synthesize_protocols, ProtocolFamily};
use crate::result::StepResult;

/// Families the tool list implies but the declaration omits.
fn undeclared_families(ctx: &ScenarioContext, declared: &[String]) -> Vec<ProtocolFamily> {
    let declared: Vec<ProtocolFamily> = declared
        .iter()
        .filter_map(|name| ProtocolFamily::parse(name))
        .collect();
    synthesize_protocols(&ctx.profile.tools)
        .into_iter()
        .filter(|family| !declared.contains(family))
        .collect()
}

pub async fn capability_discovery(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let (response, mut step) = ctx
        .require::<GetAdcpCapabilities>("Get AdCP capabilities", json!({}))
        .await;
    let declared: Option<GetAdcpCapabilitiesResponse> = response;
    if let Some(caps) = &declared {
        step.preview(caps);
        if caps.supported_protocols.is_empty() {
            step.fail("get_adcp_capabilities declares no supported_protocols");
        } else {
            step.details(format!(
                "Declares {} (AdCP {})",
                caps.supported_protocols.join(", "),
                caps.version_label().as_deref().unwrap_or("unversioned")
            ));
        }
        if caps.version_label().is_none() {
            step.warn("No adcp.major_versions or version declared");
        }
    }
    ctx.record(step);

    let Some(caps) = declared.filter(|c| !c.supported_protocols.is_empty()) else {
        return ctx.finish();
    };

    let mut step = StepResult::new("Declared protocols match tools", None);
    let mut warnings = cross_validate_protocols(&caps.supported_protocols, &ctx.profile.tools);
    for family in undeclared_families(&ctx, &caps.supported_protocols) {
        warnings.push(format!(
            "Agent exposes {} operations but does not declare the protocol",
            family
        ));
    }
    if warnings.is_empty() {
        step.details("Every declared protocol is backed by exposed operations");
    } else {
        step.details(format!("{} mismatches between declaration and tools", warnings.len()));
        for w in warnings {
            step.warn(w);
        }
    }
    ctx.record(step);

    let (repeat, mut step) = ctx
        .require::<GetAdcpCapabilities>("Capabilities stable across calls", json!({}))
        .await;
    if let Some(repeat) = repeat {
        if repeat.supported_protocols != caps.supported_protocols
            || repeat.version_label() != caps.version_label()
        {
            step.fail("get_adcp_capabilities changed between consecutive calls");
        } else {
            step.details("Identical declaration on repeat");
        }
    }
    ctx.record(step);

    let mut profile = ctx.profile.clone();
    profile.adcp_version = caps.version_label().or(profile.adcp_version);
    profile.set_protocols(caps.supported_protocols);
    ctx.finish_with_profile(profile)
}
