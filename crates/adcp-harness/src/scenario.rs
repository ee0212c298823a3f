//! Scenario identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HarnessError;

/// A named, fixed sequence of probes exercising one aspect of an agent.
///
/// Identifiers are stateless definitions; the catalog decides which ones are
/// meaningful for a given agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    HealthCheck,
    Discovery,
    CreateMediaBuy,
    FullSalesFlow,
    CreativeSync,
    CreativeInline,
    /// Reserved identifier with no implementation yet.
    CreativeReference,
    PricingEdgeCases,
    ErrorHandling,
    Validation,
    TemporalValidation,
    BehaviorAnalysis,
    ResponseConsistency,
    CreativeFlow,
    SignalsFlow,
    GovernancePropertyLists,
    GovernanceContentStandards,
    SiSessionLifecycle,
    SiAvailability,
    CapabilityDiscovery,
}

impl Scenario {
    pub const ALL: [Scenario; 20] = [
        Scenario::HealthCheck,
        Scenario::Discovery,
        Scenario::CreateMediaBuy,
        Scenario::FullSalesFlow,
        Scenario::CreativeSync,
        Scenario::CreativeInline,
        Scenario::CreativeReference,
        Scenario::PricingEdgeCases,
        Scenario::ErrorHandling,
        Scenario::Validation,
        Scenario::TemporalValidation,
        Scenario::BehaviorAnalysis,
        Scenario::ResponseConsistency,
        Scenario::CreativeFlow,
        Scenario::SignalsFlow,
        Scenario::GovernancePropertyLists,
        Scenario::GovernanceContentStandards,
        Scenario::SiSessionLifecycle,
        Scenario::SiAvailability,
        Scenario::CapabilityDiscovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::HealthCheck => "health_check",
            Scenario::Discovery => "discovery",
            Scenario::CreateMediaBuy => "create_media_buy",
            Scenario::FullSalesFlow => "full_sales_flow",
            Scenario::CreativeSync => "creative_sync",
            Scenario::CreativeInline => "creative_inline",
            Scenario::CreativeReference => "creative_reference",
            Scenario::PricingEdgeCases => "pricing_edge_cases",
            Scenario::ErrorHandling => "error_handling",
            Scenario::Validation => "validation",
            Scenario::TemporalValidation => "temporal_validation",
            Scenario::BehaviorAnalysis => "behavior_analysis",
            Scenario::ResponseConsistency => "response_consistency",
            Scenario::CreativeFlow => "creative_flow",
            Scenario::SignalsFlow => "signals_flow",
            Scenario::GovernancePropertyLists => "governance_property_lists",
            Scenario::GovernanceContentStandards => "governance_content_standards",
            Scenario::SiSessionLifecycle => "si_session_lifecycle",
            Scenario::SiAvailability => "si_availability",
            Scenario::CapabilityDiscovery => "capability_discovery",
        }
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            Scenario::HealthCheck => "Agent answers capability introspection",
            Scenario::Discovery => "Product, format and property discovery",
            Scenario::CreateMediaBuy => "Create a media buy from a discovered product",
            Scenario::FullSalesFlow => "Discover, buy, update and check delivery",
            Scenario::CreativeSync => "Sync creatives to the creative library",
            Scenario::CreativeInline => "Create a media buy with inline creatives",
            Scenario::CreativeReference => "Reference library creatives from a media buy",
            Scenario::PricingEdgeCases => "Auction, floor and minimum-spend pricing rules",
            Scenario::ErrorHandling => "Unknown identifiers and unknown operations are rejected",
            Scenario::Validation => "Invalid enums, negative values and malformed identifiers",
            Scenario::TemporalValidation => "Flight date ordering and format rules",
            Scenario::BehaviorAnalysis => "Brief relevance and filter adherence",
            Scenario::ResponseConsistency => "Pagination and identifier structure invariants",
            Scenario::CreativeFlow => "Build and preview creatives",
            Scenario::SignalsFlow => "Signal discovery and activation",
            Scenario::GovernancePropertyLists => "Property list create/read/update/delete",
            Scenario::GovernanceContentStandards => "Content standards discovery and calibration",
            Scenario::SiSessionLifecycle => "Sponsored intelligence session lifecycle",
            Scenario::SiAvailability => "Sponsored intelligence offering availability",
            Scenario::CapabilityDiscovery => "Structured capabilities match advertised tools",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.as_str() == normalized)
            .ok_or_else(|| HarnessError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>().unwrap(), scenario);
        }
    }

    #[test]
    fn test_parse_accepts_kebab_case() {
        assert_eq!(
            "full-sales-flow".parse::<Scenario>().unwrap(),
            Scenario::FullSalesFlow
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            "warp_drive".parse::<Scenario>(),
            Err(HarnessError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Scenario::SiSessionLifecycle).unwrap();
        assert_eq!(json, "\"si_session_lifecycle\"");
    }
}
