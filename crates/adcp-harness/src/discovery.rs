//! Capability discovery.
//!
//! One introspection call builds the [`AgentProfile`]. Structured
//! capabilities are cross-validated against the tool list when the agent
//! exposes them and synthesized from tool names when it does not. Sample
//! queries then enrich the profile; their failures are warnings only.

use adcp_client::operations::{GetAdcpCapabilities, GetProducts, GetSignals, ListCreativeFormats};
use adcp_client::types::{GetAdcpCapabilitiesResponse, GetProductsResponse};
use adcp_client::{Operation, TaskExecutor, TaskExecutorExt, TaskResult};
use serde_json::json;
use std::time::Instant;

use crate::options::HarnessOptions;
use crate::profile::{
    cross_validate_protocols, distinct, format_id_label, synthesize_protocols, AgentProfile,
};
use crate::result::StepResult;
use crate::step::run_step;

pub const DISCOVERY_STEP: &str = "Discover agent capabilities";

/// Profile (absent when introspection failed) plus the discovery step.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub profile: Option<AgentProfile>,
    pub step: StepResult,
}

pub async fn discover_agent_profile(
    client: &dyn TaskExecutor,
    options: &HarnessOptions,
) -> DiscoveryOutcome {
    let start = Instant::now();
    let (info, mut step) =
        run_step(DISCOVERY_STEP, None, || async { Ok(client.get_agent_info().await?) }).await;
    let Some(info) = info else {
        return DiscoveryOutcome {
            profile: None,
            step,
        };
    };

    let tools = info.tool_names();
    let mut profile = AgentProfile::new(info.name, tools);
    let mut warnings = Vec::new();

    if profile.has_tool(GetAdcpCapabilities::NAME) {
        apply_declared_capabilities(client, &mut profile, &mut warnings).await;
    } else {
        let synthesized = synthesize_protocols(&profile.tools);
        profile.set_protocols(synthesized.iter().map(|f| f.as_str().to_string()).collect());
    }

    if profile.has_tool(GetProducts::NAME) {
        enrich_from_products(client, options, &mut profile, &mut warnings).await;
    }
    if profile.has_tool(ListCreativeFormats::NAME) {
        match client.call::<ListCreativeFormats>(json!({})).await {
            Ok(TaskResult::Success(resp)) => {
                profile.supported_formats =
                    distinct(resp.formats.iter().filter_map(|f| format_id_label(&f.format_id)));
            }
            Ok(TaskResult::Failure { error }) => {
                warnings.push(format!("list_creative_formats sample failed: {}", error))
            }
            Err(err) => warnings.push(format!("list_creative_formats sample failed: {}", err)),
        }
    }
    if profile.has_tool(GetSignals::NAME) {
        let params = json!({
            "signal_spec": options.brief_text(),
            "deliver_to": { "platforms": "all", "countries": ["US"] },
        });
        match client.call::<GetSignals>(params).await {
            Ok(TaskResult::Success(resp)) => {
                profile.supported_signals = distinct(resp.signals.into_iter().map(|s| {
                    s.signal_type
                        .unwrap_or(s.signal_agent_segment_id)
                }));
            }
            Ok(TaskResult::Failure { error }) => {
                warnings.push(format!("get_signals sample failed: {}", error))
            }
            Err(err) => warnings.push(format!("get_signals sample failed: {}", err)),
        }
    }

    step.details(format!(
        "{} ({} tools: {})",
        profile.name,
        profile.tools.len(),
        profile.tools.iter().cloned().collect::<Vec<_>>().join(", ")
    ));
    step.preview(&profile);
    for warning in warnings {
        step.warn(warning);
    }
    step.duration_ms = start.elapsed().as_millis() as u64;

    DiscoveryOutcome {
        profile: Some(profile),
        step,
    }
}

async fn apply_declared_capabilities(
    client: &dyn TaskExecutor,
    profile: &mut AgentProfile,
    warnings: &mut Vec<String>,
) {
    let declared: Option<GetAdcpCapabilitiesResponse> =
        match client.call::<GetAdcpCapabilities>(json!({})).await {
            Ok(TaskResult::Success(caps)) => Some(caps),
            Ok(TaskResult::Failure { error }) => {
                warnings.push(format!("get_adcp_capabilities failed: {}", error));
                None
            }
            Err(err) => {
                warnings.push(format!("get_adcp_capabilities failed: {}", err));
                None
            }
        };

    match declared {
        Some(caps) if !caps.supported_protocols.is_empty() => {
            warnings.extend(cross_validate_protocols(
                &caps.supported_protocols,
                &profile.tools,
            ));
            profile.adcp_version = caps.version_label();
            profile.set_protocols(caps.supported_protocols);
        }
        other => {
            if let Some(caps) = other {
                profile.adcp_version = caps.version_label();
                warnings.push(
                    "get_adcp_capabilities declared no protocols; synthesized from tools"
                        .to_string(),
                );
            }
            let synthesized = synthesize_protocols(&profile.tools);
            profile.set_protocols(synthesized.iter().map(|f| f.as_str().to_string()).collect());
        }
    }
}

async fn enrich_from_products(
    client: &dyn TaskExecutor,
    options: &HarnessOptions,
    profile: &mut AgentProfile,
    warnings: &mut Vec<String>,
) {
    let params = json!({
        "brief": options.brief_text(),
        "brand": options.brand_json(),
    });
    match client.call::<GetProducts>(params).await {
        Ok(TaskResult::Success(resp)) => apply_product_sample(profile, &resp),
        Ok(TaskResult::Failure { error }) => {
            warnings.push(format!("get_products sample failed: {}", error))
        }
        Err(err) => warnings.push(format!("get_products sample failed: {}", err)),
    }
}

/// Derive channels, pricing models, delivery types and formats from a
/// product sample.
pub fn apply_product_sample(profile: &mut AgentProfile, sample: &GetProductsResponse) {
    let products = &sample.products;
    profile.channels = distinct(products.iter().flat_map(|p| p.channels.iter().cloned()));
    profile.pricing_models = distinct(
        products
            .iter()
            .flat_map(|p| p.pricing_options.iter().map(|o| o.pricing_model.clone())),
    );
    profile.delivery_types = distinct(products.iter().filter_map(|p| p.delivery_type.clone()));
    profile.format_ids = distinct(
        products
            .iter()
            .flat_map(|p| p.format_ids.iter().filter_map(format_id_label)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_client::fakes::ScriptedAgent;

    fn products_payload() -> serde_json::Value {
        json!({
            "products": [
                {
                    "product_id": "p1",
                    "channels": ["display", "olv"],
                    "delivery_type": "guaranteed",
                    "format_ids": [{ "agent_url": "https://c.example", "id": "display_300x250" }],
                    "pricing_options": [{ "pricing_option_id": "o1", "pricing_model": "cpm", "rate": 10.0 }]
                },
                {
                    "product_id": "p2",
                    "channels": ["display"],
                    "delivery_type": "non_guaranteed",
                    "pricing_options": [{ "pricing_option_id": "o2", "pricing_model": "vcpm", "floor_price": 2.0 }]
                }
            ]
        })
    }

    /// Test: introspection failure yields no profile and a failed step
    #[tokio::test]
    async fn test_introspection_failure() {
        let agent = ScriptedAgent::new("down").with_introspection_error("connection refused");
        let outcome = discover_agent_profile(&agent, &HarnessOptions::default()).await;
        assert!(outcome.profile.is_none());
        assert!(!outcome.step.passed);
        assert!(outcome.step.error.unwrap().contains("connection refused"));
    }

    /// Test: tools populate the profile and a product sample enriches it
    #[tokio::test]
    async fn test_enrichment_from_products() {
        let agent = ScriptedAgent::new("seller").with_success("get_products", products_payload());
        let outcome = discover_agent_profile(&agent, &HarnessOptions::default()).await;
        let profile = outcome.profile.expect("profile");

        assert!(outcome.step.passed);
        assert!(profile.has_tool("get_products"));
        assert_eq!(
            profile.channels,
            Some(vec!["display".to_string(), "olv".to_string()])
        );
        assert_eq!(
            profile.pricing_models,
            Some(vec!["cpm".to_string(), "vcpm".to_string()])
        );
        assert_eq!(profile.format_ids, Some(vec!["display_300x250".to_string()]));
        assert_eq!(profile.supported_protocols, Some(vec!["media_buy".to_string()]));
    }

    /// Test: a failing sample query is a warning, not a failure
    #[tokio::test]
    async fn test_enrichment_failure_is_warning() {
        let agent = ScriptedAgent::new("seller").with_failure("get_products", "brief required");
        let outcome = discover_agent_profile(&agent, &HarnessOptions::default()).await;
        assert!(outcome.step.passed);
        assert_eq!(outcome.step.warnings.len(), 1);
        assert!(outcome.step.warnings[0].contains("brief required"));
        assert!(outcome.profile.expect("profile").channels.is_none());
    }

    /// Test: declared protocols without matching tools produce warnings
    #[tokio::test]
    async fn test_capabilities_cross_validation() {
        let agent = ScriptedAgent::new("seller")
            .with_success(
                "get_adcp_capabilities",
                json!({
                    "adcp": { "major_versions": [2] },
                    "supported_protocols": ["media_buy", "governance"]
                }),
            )
            .with_success("get_products", json!({ "products": [] }));
        let outcome = discover_agent_profile(&agent, &HarnessOptions::default()).await;
        let profile = outcome.profile.expect("profile");

        assert!(outcome.step.passed);
        assert_eq!(profile.adcp_version.as_deref(), Some("2.x"));
        assert_eq!(profile.supports_governance, Some(true));
        assert!(outcome
            .step
            .warnings
            .iter()
            .any(|w| w.contains("governance")));
    }

    /// Test: signals and formats enrich their own profile fields
    #[tokio::test]
    async fn test_enrichment_from_formats_and_signals() {
        let agent = ScriptedAgent::new("multi")
            .with_success(
                "list_creative_formats",
                json!({ "formats": [{ "format_id": { "agent_url": "https://c", "id": "video_15s" } }] }),
            )
            .with_success(
                "get_signals",
                json!({ "signals": [{ "signal_agent_segment_id": "seg-1", "signal_type": "marketplace" }] }),
            );
        let profile = discover_agent_profile(&agent, &HarnessOptions::default())
            .await
            .profile
            .expect("profile");
        assert_eq!(profile.supported_formats, Some(vec!["video_15s".to_string()]));
        assert_eq!(profile.supported_signals, Some(vec!["marketplace".to_string()]));
    }
}
