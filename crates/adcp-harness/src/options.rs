//! Harness options and environment overlay.

use adcp_client::{ClientOptions, Protocol};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{HarnessError, Result};
use crate::scenario::Scenario;

/// Brief used for discovery queries when none is configured.
pub const DEFAULT_BRIEF: &str =
    "Brand awareness campaign for a consumer product targeting adults 25-54 in the US";

/// Budget used for test media buys when none is configured.
pub const DEFAULT_BUDGET: f64 = 1000.0;

/// Advertiser identity sent with mutating requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandReference {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for BrandReference {
    fn default() -> Self {
        Self {
            domain: "conformance.adcontextprotocol.org".to_string(),
            name: Some("AdCP Conformance Harness".to_string()),
        }
    }
}

/// Options for one harness run.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessOptions {
    /// Brief text for discovery queries
    pub brief: Option<String>,
    /// Budget for test media buys
    pub budget: Option<f64>,
    /// Format identifiers to target
    pub format_ids: Vec<String>,
    /// Session correlation id
    pub session_id: Option<String>,
    /// `None` means dry-run
    pub dry_run: Option<bool>,
    /// Only consider products in these channels
    pub channels: Vec<String>,
    /// Only consider pricing options with these models
    pub pricing_models: Vec<String>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub brand: Option<BrandReference>,
    /// Scenario allow-list; empty means the default set
    pub scenarios: Vec<Scenario>,
    /// Transport hint; `None` detects from the URL
    pub protocol: Option<Protocol>,
    /// How many creative formats to exercise
    pub max_formats: Option<usize>,
    /// Signal types to query
    pub signal_types: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl HarnessOptions {
    /// Copy with defaults filled in: dry-run on and a generated session id.
    pub fn effective(&self) -> Self {
        let mut out = self.clone();
        out.dry_run.get_or_insert(true);
        if out.session_id.as_deref().map_or(true, str::is_empty) {
            out.session_id = Some(format!("conformance-{}", Uuid::new_v4()));
        }
        out
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(true)
    }

    pub fn brief_text(&self) -> &str {
        self.brief.as_deref().unwrap_or(DEFAULT_BRIEF)
    }

    pub fn test_budget(&self) -> f64 {
        self.budget.unwrap_or(DEFAULT_BUDGET)
    }

    pub fn format_breadth(&self) -> usize {
        self.max_formats.unwrap_or(3)
    }

    /// Scenario allow-list, `None` when the default set applies.
    pub fn scenario_allow_list(&self) -> Option<&[Scenario]> {
        if self.scenarios.is_empty() {
            None
        } else {
            Some(&self.scenarios)
        }
    }

    pub fn brand_json(&self) -> Value {
        let brand = self.brand.clone().unwrap_or_default();
        json!(brand)
    }

    /// Options for the task execution client.
    pub fn client_options(&self) -> ClientOptions {
        let mut opts = ClientOptions::default().with_dry_run(self.is_dry_run());
        if let Some(protocol) = self.protocol {
            opts = opts.with_protocol(protocol);
        }
        if let Some(session_id) = &self.session_id {
            opts = opts.with_session_id(session_id.clone());
        }
        if let Some(token) = &self.auth_token {
            opts = opts.with_auth_token(token.clone());
        }
        if let Some(secs) = self.timeout_secs {
            opts = opts.with_timeout(Duration::from_secs(secs));
        }
        opts
    }

    /// Defaults overlaid with `ADCP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_env_map(|key| std::env::var(key).ok())
    }

    /// Same as [`HarnessOptions::from_env`] with an injectable lookup.
    pub fn from_env_map<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut opts = HarnessOptions {
            auth_token: var("ADCP_AUTH_TOKEN"),
            brief: var("ADCP_TEST_BRIEF"),
            session_id: var("ADCP_TEST_SESSION_ID"),
            ..Self::default()
        };

        if let Some(raw) = var("ADCP_PROTOCOL") {
            let protocol = raw
                .parse::<Protocol>()
                .map_err(|e| HarnessError::invalid_option("ADCP_PROTOCOL", e.to_string()))?;
            opts.protocol = Some(protocol);
        }
        if let Some(raw) = var("ADCP_TEST_BUDGET") {
            let budget = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| HarnessError::invalid_option("ADCP_TEST_BUDGET", "not a number"))?;
            opts.budget = Some(budget);
        }
        if let Some(raw) = var("ADCP_DRY_RUN") {
            opts.dry_run = Some(parse_bool("ADCP_DRY_RUN", &raw)?);
        }
        Ok(opts)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(HarnessError::invalid_option(
            name,
            format!("expected a boolean, got '{}'", other),
        )),
    }
}

impl fmt::Debug for HarnessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessOptions")
            .field("brief", &self.brief)
            .field("budget", &self.budget)
            .field("format_ids", &self.format_ids)
            .field("session_id", &self.session_id)
            .field("dry_run", &self.dry_run)
            .field("channels", &self.channels)
            .field("pricing_models", &self.pricing_models)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("brand", &self.brand)
            .field("scenarios", &self.scenarios)
            .field("protocol", &self.protocol)
            .field("max_formats", &self.max_formats)
            .field("signal_types", &self.signal_types)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
