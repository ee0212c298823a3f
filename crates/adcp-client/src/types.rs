//! Typed response payloads for the operations the harness exercises.
//!
//! Every struct is lenient: missing fields take their default, unknown fields
//! are ignored. Probes check the fields they care about explicitly instead of
//! relying on decode failures. Fields whose structure is itself under test
//! (format identifiers) stay as raw `Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Listing helpers
// ---------------------------------------------------------------------------

/// Pagination summary attached to listing responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySummary {
    pub total_matching: Option<u64>,
    pub returned: Option<u64>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// One way a product can be bought.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOption {
    pub pricing_option_id: String,
    pub pricing_model: String,
    pub rate: Option<f64>,
    pub fixed_price: Option<f64>,
    pub floor_price: Option<f64>,
    pub price_guidance: Option<Value>,
    pub currency: Option<String>,
    pub min_spend_per_package: Option<f64>,
}

impl PricingOption {
    /// Fixed rate, under either field name agents use.
    pub fn fixed_rate(&self) -> Option<f64> {
        self.fixed_price.or(self.rate)
    }

    /// No fixed rate, and a floor or price guidance present.
    pub fn is_auction(&self) -> bool {
        self.fixed_rate().is_none() && (self.floor_price.is_some() || self.price_guidance.is_some())
    }

    /// Lowest acceptable bid, from `floor_price` or `price_guidance.floor`.
    pub fn bid_floor(&self) -> Option<f64> {
        self.floor_price.or_else(|| {
            self.price_guidance
                .as_ref()
                .and_then(|g| g.get("floor"))
                .and_then(Value::as_f64)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub format_ids: Vec<Value>,
    pub delivery_type: Option<String>,
    pub pricing_options: Vec<PricingOption>,
    pub channels: Vec<String>,
    pub publisher_properties: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetProductsResponse {
    pub products: Vec<Product>,
    pub query_summary: Option<QuerySummary>,
    pub errors: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Creative formats & creatives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeFormat {
    pub format_id: Value,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub format_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCreativeFormatsResponse {
    pub formats: Vec<CreativeFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncedCreative {
    pub creative_id: Option<String>,
    pub action: Option<String>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncCreativesResponse {
    pub creatives: Vec<SyncedCreative>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCreativesResponse {
    pub creatives: Vec<Value>,
    pub query_summary: Option<QuerySummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildCreativeResponse {
    pub creative_manifest: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewCreativeResponse {
    pub previews: Vec<Value>,
    pub expires_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Media buys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateMediaBuyResponse {
    pub media_buy_id: Option<String>,
    pub buyer_ref: Option<String>,
    pub status: Option<String>,
    pub packages: Vec<Value>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateMediaBuyResponse {
    pub media_buy_id: Option<String>,
    pub status: Option<String>,
    pub affected_packages: Vec<Value>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaBuyDelivery {
    pub media_buy_id: Option<String>,
    pub status: Option<String>,
    pub totals: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMediaBuyDeliveryResponse {
    pub media_buy_deliveries: Vec<MediaBuyDelivery>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAuthorizedPropertiesResponse {
    pub publisher_domains: Vec<String>,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalDeployment {
    pub platform: Option<String>,
    pub account: Option<String>,
    pub is_live: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signal {
    pub signal_agent_segment_id: String,
    pub name: Option<String>,
    pub signal_type: Option<String>,
    pub deployments: Vec<SignalDeployment>,
    pub pricing: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSignalsResponse {
    pub signals: Vec<Signal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivateSignalResponse {
    pub decisioning_platform_segment_id: Option<String>,
    pub deployments: Vec<Value>,
    pub errors: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Governance: property lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyList {
    pub list_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Shared shape of create/get/update property list responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyListResponse {
    pub list: Option<PropertyList>,
    pub list_id: Option<String>,
    pub identifiers: Vec<Value>,
}

impl PropertyListResponse {
    /// Identifier from the nested list, falling back to the top-level field.
    pub fn resolved_list_id(&self) -> Option<&str> {
        self.list
            .as_ref()
            .map(|l| l.list_id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.list_id.as_deref())
    }

    pub fn resolved_name(&self) -> Option<&str> {
        self.list.as_ref().and_then(|l| l.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListPropertyListsResponse {
    pub lists: Vec<PropertyList>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletePropertyListResponse {
    pub deleted: Option<bool>,
    pub list_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Governance: content standards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStandards {
    pub standards_id: String,
    pub name: Option<String>,
    pub policy: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListContentStandardsResponse {
    pub standards: Vec<ContentStandards>,
}

/// Shared shape of get/create content standards responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStandardsResponse {
    pub standards_id: Option<String>,
    pub name: Option<String>,
    pub standards: Option<ContentStandards>,
}

impl ContentStandardsResponse {
    pub fn resolved_id(&self) -> Option<&str> {
        self.standards
            .as_ref()
            .map(|s| s.standards_id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.standards_id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrateContentResponse {
    pub verdict: Option<String>,
    pub score: Option<f64>,
    pub explanation: Option<String>,
    pub features: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Sponsored intelligence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiGetOfferingResponse {
    pub available: bool,
    pub offering_token: Option<String>,
    pub offering: Option<Value>,
    pub unavailable_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiSessionResponse {
    pub session_id: Option<String>,
    pub response: Option<Value>,
    pub session_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiTerminateSessionResponse {
    pub session_id: Option<String>,
    pub terminated: Option<bool>,
    pub session_status: Option<String>,
}

// ---------------------------------------------------------------------------
// Structured capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcpVersionInfo {
    pub major_versions: Vec<u32>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetAdcpCapabilitiesResponse {
    pub adcp: Option<AdcpVersionInfo>,
    pub supported_protocols: Vec<String>,
}

impl GetAdcpCapabilitiesResponse {
    /// Version string: explicit `version`, else `"<major>.x"` of the newest
    /// declared major version.
    pub fn version_label(&self) -> Option<String> {
        let info = self.adcp.as_ref()?;
        info.version.clone().or_else(|| {
            info.major_versions
                .iter()
                .max()
                .map(|major| format!("{}.x", major))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pricing_option_auction_detection() {
        let auction: PricingOption = serde_json::from_value(json!({
            "pricing_option_id": "cpm-auction",
            "pricing_model": "cpm",
            "floor_price": 2.5
        }))
        .expect("decode");
        assert!(auction.is_auction());
        assert_eq!(auction.bid_floor(), Some(2.5));

        let fixed: PricingOption = serde_json::from_value(json!({
            "pricing_option_id": "cpm-fixed",
            "pricing_model": "cpm",
            "rate": 12.0,
            "floor_price": 2.5
        }))
        .expect("decode");
        assert!(!fixed.is_auction());
        assert_eq!(fixed.fixed_rate(), Some(12.0));
    }

    #[test]
    fn test_bid_floor_from_price_guidance() {
        let option: PricingOption = serde_json::from_value(json!({
            "pricing_option_id": "vcpm",
            "pricing_model": "vcpm",
            "price_guidance": { "floor": 4.0, "p50": 6.0 }
        }))
        .expect("decode");
        assert!(option.is_auction());
        assert_eq!(option.bid_floor(), Some(4.0));
    }

    #[test]
    fn test_products_response_is_lenient() {
        let resp: GetProductsResponse = serde_json::from_value(json!({
            "products": [{ "product_id": "p1", "unexpected": true }]
        }))
        .expect("decode");
        assert_eq!(resp.products.len(), 1);
        assert!(resp.products[0].pricing_options.is_empty());
        assert!(resp.query_summary.is_none());
    }

    #[test]
    fn test_property_list_id_resolution() {
        let nested: PropertyListResponse =
            serde_json::from_value(json!({ "list": { "list_id": "pl-1", "name": "n" } }))
                .expect("decode");
        assert_eq!(nested.resolved_list_id(), Some("pl-1"));

        let flat: PropertyListResponse =
            serde_json::from_value(json!({ "list_id": "pl-2" })).expect("decode");
        assert_eq!(flat.resolved_list_id(), Some("pl-2"));
    }

    #[test]
    fn test_capabilities_version_label() {
        let caps: GetAdcpCapabilitiesResponse = serde_json::from_value(json!({
            "adcp": { "major_versions": [1, 2] },
            "supported_protocols": ["media_buy"]
        }))
        .expect("decode");
        assert_eq!(caps.version_label().as_deref(), Some("2.x"));
    }
}
