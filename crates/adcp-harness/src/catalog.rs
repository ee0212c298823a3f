//! Scenario catalog and applicability matching.
//!
//! Pure functions only: deciding which scenarios to run never touches the
//! network, so the whole matching layer is testable without an agent.

use adcp_client::operations::*;
use adcp_client::Operation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scenario::Scenario;

/// Scenarios run when the caller supplies no allow-list.
///
/// Leaves out `creative_inline` (covered by `create_media_buy` plus
/// `creative_sync`) and `creative_reference` (not implemented).
pub const DEFAULT_SCENARIOS: &[Scenario] = &[
    Scenario::HealthCheck,
    Scenario::Discovery,
    Scenario::CapabilityDiscovery,
    Scenario::CreateMediaBuy,
    Scenario::FullSalesFlow,
    Scenario::CreativeSync,
    Scenario::CreativeFlow,
    Scenario::PricingEdgeCases,
    Scenario::ErrorHandling,
    Scenario::Validation,
    Scenario::TemporalValidation,
    Scenario::BehaviorAnalysis,
    Scenario::ResponseConsistency,
    Scenario::SignalsFlow,
    Scenario::GovernancePropertyLists,
    Scenario::GovernanceContentStandards,
    Scenario::SiAvailability,
    Scenario::SiSessionLifecycle,
];

/// Operations a scenario needs. `None` means the scenario is not in the
/// catalog and is never applicable.
pub fn required_tools(scenario: Scenario) -> Option<&'static [&'static str]> {
    let tools: &'static [&'static str] = match scenario {
        Scenario::HealthCheck => &[],
        Scenario::Discovery
        | Scenario::ErrorHandling
        | Scenario::Validation
        | Scenario::BehaviorAnalysis
        | Scenario::ResponseConsistency => &[GetProducts::NAME],
        Scenario::CreateMediaBuy
        | Scenario::CreativeInline
        | Scenario::PricingEdgeCases
        | Scenario::TemporalValidation => &[GetProducts::NAME, CreateMediaBuy::NAME],
        Scenario::FullSalesFlow => &[GetProducts::NAME, CreateMediaBuy::NAME, UpdateMediaBuy::NAME],
        Scenario::CreativeSync => &[SyncCreatives::NAME],
        Scenario::CreativeFlow => &[ListCreativeFormats::NAME, BuildCreative::NAME],
        Scenario::SignalsFlow => &[GetSignals::NAME],
        Scenario::GovernancePropertyLists => &[
            CreatePropertyList::NAME,
            GetPropertyList::NAME,
            ListPropertyLists::NAME,
            DeletePropertyList::NAME,
        ],
        Scenario::GovernanceContentStandards => &[ListContentStandards::NAME],
        Scenario::SiSessionLifecycle => &[
            SiInitiateSession::NAME,
            SiSendMessage::NAME,
            SiTerminateSession::NAME,
        ],
        Scenario::SiAvailability => &[SiGetOffering::NAME],
        Scenario::CapabilityDiscovery => &[GetAdcpCapabilities::NAME],
        Scenario::CreativeReference => return None,
    };
    Some(tools)
}

/// Every required operation of `scenario` is present in `tools`.
pub fn is_applicable(scenario: Scenario, tools: &BTreeSet<String>) -> bool {
    match required_tools(scenario) {
        Some(required) => required.iter().all(|t| tools.contains(*t)),
        None => false,
    }
}

/// Required operations of `scenario` absent from `tools`.
pub fn missing_tools(scenario: Scenario, tools: &BTreeSet<String>) -> Vec<String> {
    required_tools(scenario)
        .unwrap_or(&[])
        .iter()
        .filter(|t| !tools.contains(**t))
        .map(|t| t.to_string())
        .collect()
}

/// Applicable subset of `candidates` (default set when `None`), in order.
pub fn get_applicable_scenarios(
    tools: &BTreeSet<String>,
    candidates: Option<&[Scenario]>,
) -> Vec<Scenario> {
    candidates
        .unwrap_or(DEFAULT_SCENARIOS)
        .iter()
        .copied()
        .filter(|s| is_applicable(*s, tools))
        .collect()
}

/// A scenario left out of a run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedScenario {
    pub scenario: Scenario,
    /// Required operations the agent does not expose.
    pub missing_tools: Vec<String>,
    pub reason: String,
}

/// Candidates split into those to run and those skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioPlan {
    pub applicable: Vec<Scenario>,
    pub skipped: Vec<SkippedScenario>,
}

/// Partition `candidates` against `tools`, preserving candidate order in
/// both halves.
pub fn plan_scenarios(tools: &BTreeSet<String>, candidates: Option<&[Scenario]>) -> ScenarioPlan {
    let mut plan = ScenarioPlan::default();
    for &scenario in candidates.unwrap_or(DEFAULT_SCENARIOS) {
        if is_applicable(scenario, tools) {
            plan.applicable.push(scenario);
            continue;
        }
        let missing = missing_tools(scenario, tools);
        let reason = if required_tools(scenario).is_none() {
            "no implementation available".to_string()
        } else {
            format!("agent does not expose: {}", missing.join(", "))
        };
        plan.skipped.push(SkippedScenario {
            scenario,
            missing_tools: missing,
            reason,
        });
    }
    plan
}
