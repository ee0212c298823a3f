//! Agent profile and protocol families.

use adcp_client::operations::*;
use adcp_client::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// What the harness knows about one agent.
///
/// Built by capability discovery; scenarios may return an enriched copy but
/// never mutate the one threaded to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub tools: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_formats: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_signals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adcp_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_protocols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_governance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_si: Option<bool>,
}

impl AgentProfile {
    pub fn new<I, S>(name: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tools: tools.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn has_tool(&self, operation: &str) -> bool {
        self.tools.contains(operation)
    }

    /// Take every field `enriched` knows; keep ours where it knows nothing.
    /// Name and tool list stay as discovered.
    pub fn merge(&mut self, enriched: AgentProfile) {
        fn take<T>(ours: &mut Option<T>, theirs: Option<T>) {
            if theirs.is_some() {
                *ours = theirs;
            }
        }
        take(&mut self.channels, enriched.channels);
        take(&mut self.pricing_models, enriched.pricing_models);
        take(&mut self.format_ids, enriched.format_ids);
        take(&mut self.delivery_types, enriched.delivery_types);
        take(&mut self.supported_formats, enriched.supported_formats);
        take(&mut self.supported_signals, enriched.supported_signals);
        take(&mut self.adcp_version, enriched.adcp_version);
        take(&mut self.supported_protocols, enriched.supported_protocols);
        take(&mut self.supports_governance, enriched.supports_governance);
        take(&mut self.supports_si, enriched.supports_si);
    }

    /// Record which protocol families the agent supports and derive the
    /// governance / SI flags from them.
    pub fn set_protocols(&mut self, protocols: Vec<String>) {
        self.supports_governance = Some(
            protocols
                .iter()
                .any(|p| ProtocolFamily::parse(p) == Some(ProtocolFamily::Governance)),
        );
        self.supports_si = Some(
            protocols
                .iter()
                .any(|p| ProtocolFamily::parse(p) == Some(ProtocolFamily::SponsoredIntelligence)),
        );
        self.supported_protocols = Some(protocols);
    }
}

/// A group of operations the protocol defines together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    MediaBuy,
    Creative,
    Signals,
    Governance,
    SponsoredIntelligence,
}

impl ProtocolFamily {
    pub const ALL: [ProtocolFamily; 5] = [
        ProtocolFamily::MediaBuy,
        ProtocolFamily::Creative,
        ProtocolFamily::Signals,
        ProtocolFamily::Governance,
        ProtocolFamily::SponsoredIntelligence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolFamily::MediaBuy => "media_buy",
            ProtocolFamily::Creative => "creative",
            ProtocolFamily::Signals => "signals",
            ProtocolFamily::Governance => "governance",
            ProtocolFamily::SponsoredIntelligence => "sponsored_intelligence",
        }
    }

    /// Parse a declared family name; accepts common aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "media_buy" => Some(ProtocolFamily::MediaBuy),
            "creative" => Some(ProtocolFamily::Creative),
            "signals" => Some(ProtocolFamily::Signals),
            "governance" => Some(ProtocolFamily::Governance),
            "sponsored_intelligence" | "si" => Some(ProtocolFamily::SponsoredIntelligence),
            _ => None,
        }
    }

    /// Operation names belonging to this family.
    pub fn operations(&self) -> &'static [&'static str] {
        match self {
            ProtocolFamily::MediaBuy => &[
                GetProducts::NAME,
                ListCreativeFormats::NAME,
                CreateMediaBuy::NAME,
                UpdateMediaBuy::NAME,
                GetMediaBuyDelivery::NAME,
                SyncCreatives::NAME,
                ListCreatives::NAME,
                ListAuthorizedProperties::NAME,
                ProvidePerformanceFeedback::NAME,
            ],
            ProtocolFamily::Creative => &[
                ListCreativeFormats::NAME,
                BuildCreative::NAME,
                PreviewCreative::NAME,
            ],
            ProtocolFamily::Signals => &[GetSignals::NAME, ActivateSignal::NAME],
            ProtocolFamily::Governance => &[
                CreatePropertyList::NAME,
                GetPropertyList::NAME,
                UpdatePropertyList::NAME,
                ListPropertyLists::NAME,
                DeletePropertyList::NAME,
                ListContentStandards::NAME,
                GetContentStandards::NAME,
                CreateContentStandards::NAME,
                UpdateContentStandards::NAME,
                CalibrateContent::NAME,
                ValidateContentDelivery::NAME,
            ],
            ProtocolFamily::SponsoredIntelligence => &[
                SiGetOffering::NAME,
                SiInitiateSession::NAME,
                SiSendMessage::NAME,
                SiTerminateSession::NAME,
            ],
        }
    }

    /// At least one of this family's operations is present.
    pub fn is_exposed_by(&self, tools: &BTreeSet<String>) -> bool {
        self.operations().iter().any(|op| tools.contains(*op))
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Families inferred purely from tool-name membership.
///
/// `creative` is only claimed when an operation beyond the shared
/// `list_creative_formats` is present, since every sales agent lists formats.
pub fn synthesize_protocols(tools: &BTreeSet<String>) -> Vec<ProtocolFamily> {
    ProtocolFamily::ALL
        .iter()
        .copied()
        .filter(|family| match family {
            ProtocolFamily::Creative => family
                .operations()
                .iter()
                .filter(|op| **op != ListCreativeFormats::NAME)
                .any(|op| tools.contains(*op)),
            _ => family.is_exposed_by(tools),
        })
        .collect()
}

/// Compare declared families against the tool list.
///
/// Returns one warning per declared family with no matching operation and
/// per unrecognised family name. Never fails.
pub fn cross_validate_protocols(declared: &[String], tools: &BTreeSet<String>) -> Vec<String> {
    let mut warnings = Vec::new();
    for name in declared {
        match ProtocolFamily::parse(name) {
            Some(family) if !family.is_exposed_by(tools) => warnings.push(format!(
                "Agent declares '{}' support but exposes none of its operations ({})",
                name,
                family.operations().join(", ")
            )),
            Some(_) => {}
            None => warnings.push(format!("Agent declares unknown protocol '{}'", name)),
        }
    }
    warnings
}

/// Render a format identifier for display: the `id` of a structured
/// identifier, or the raw string of a bare one.
pub fn format_id_label(format_id: &Value) -> Option<String> {
    match format_id {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Sorted, de-duplicated copy of `values`; `None` when empty.
pub(crate) fn distinct<I: IntoIterator<Item = String>>(values: I) -> Option<Vec<String>> {
    let set: BTreeSet<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    if set.is_empty() {
        None
    } else {
        Some(set.into_iter().collect())
    }
}
