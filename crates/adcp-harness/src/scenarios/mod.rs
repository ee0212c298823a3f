//! Scenario modules.
//!
//! Each scenario is an async function from a [`ScenarioContext`] to a
//! [`ScenarioOutcome`]. Steps run strictly in order against the context's
//! client; later steps read identifiers created by earlier ones.

pub mod behavior;
pub mod capabilities;
pub mod creatives;
pub mod error_handling;
pub mod governance;
pub mod health;
pub mod media_buy;
pub mod pricing;
pub mod product_discovery;
pub mod si;
pub mod signals;
pub mod validation;

use adcp_client::operations::GetProducts;
use adcp_client::types::{PricingOption, Product};
use adcp_client::{Operation, TaskExecutor, TaskExecutorExt, TaskResult};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::observer::ProbeObserver;
use crate::options::HarnessOptions;
use crate::probes::{self, Severity};
use crate::profile::AgentProfile;
use crate::result::StepResult;
use crate::scenario::Scenario;
use crate::step::{run_step, StepLog};

/// Creative agent that defines the standard formats the harness targets.
pub const CREATIVE_AGENT_URL: &str = "https://creative.adcontextprotocol.org";

/// Structured format identifier for a standard format `id`.
pub fn format_id_ref(id: &str) -> Value {
    json!({ "agent_url": CREATIVE_AGENT_URL, "id": id })
}

/// Steps produced by one scenario plus an optionally enriched profile.
#[derive(Debug, Clone, Default)]
pub struct ScenarioOutcome {
    pub steps: Vec<StepResult>,
    pub profile: Option<AgentProfile>,
}

/// Everything a scenario needs: its own client, the run options, and the
/// read-only discovered profile.
pub struct ScenarioContext {
    pub scenario: Scenario,
    pub client: Arc<dyn TaskExecutor>,
    pub options: HarnessOptions,
    pub profile: AgentProfile,
    log: StepLog,
}

impl ScenarioContext {
    pub fn new(
        scenario: Scenario,
        client: Arc<dyn TaskExecutor>,
        options: HarnessOptions,
        profile: AgentProfile,
        observer: Arc<dyn ProbeObserver>,
    ) -> Self {
        Self {
            scenario,
            client,
            options,
            profile,
            log: StepLog::new(Some(scenario), observer),
        }
    }

    pub fn has_tool(&self, operation: &str) -> bool {
        self.profile.has_tool(operation)
    }

    pub fn record(&mut self, step: StepResult) {
        self.log.record(step);
    }

    /// Record a step that passes without calling the agent, e.g. a skipped
    /// optional probe.
    pub fn note(&mut self, name: &str, details: impl Into<String>) {
        let mut step = StepResult::new(name, None);
        step.details(details);
        self.record(step);
    }

    /// Call `Op` as a step. A transport error fails the step and returns
    /// `None`; a reported failure is returned for the caller to judge.
    pub async fn task<Op: Operation>(
        &self,
        name: &str,
        params: Value,
    ) -> (Option<TaskResult<Op::Response>>, StepResult) {
        let client = self.client.as_ref();
        run_step(name, Some(Op::NAME), || async move {
            Ok(client.call::<Op>(params).await?)
        })
        .await
    }

    /// Call `Op` expecting success; a reported failure fails the step.
    pub async fn require<Op: Operation>(
        &self,
        name: &str,
        params: Value,
    ) -> (Option<Op::Response>, StepResult) {
        let (result, mut step) = self.task::<Op>(name, params).await;
        match result {
            Some(TaskResult::Success(data)) => (Some(data), step),
            Some(TaskResult::Failure { error }) => {
                step.fail(error);
                (None, step)
            }
            None => (None, step),
        }
    }

    /// Raw call for probes that judge the payload structurally.
    pub async fn raw(
        &self,
        name: &str,
        operation: &str,
        params: Value,
    ) -> (Option<TaskResult<Value>>, StepResult) {
        let client = self.client.as_ref();
        run_step(name, Some(operation), || async move {
            Ok(client.execute_task(operation, params).await?)
        })
        .await
    }

    /// Send a request the agent must reject, and record the judgement.
    pub async fn expect_rejection(
        &mut self,
        name: &str,
        operation: &str,
        params: Value,
        violation: &str,
        severity: Severity,
    ) -> bool {
        let (result, mut step) = self.raw(name, operation, params).await;
        if let Some(result) = &result {
            probes::judge_rejection(&mut step, result, violation, severity);
        }
        let passed = step.passed;
        self.record(step);
        passed
    }

    /// Send a request the agent must accept, and record the judgement.
    pub async fn expect_acceptance(
        &mut self,
        name: &str,
        operation: &str,
        params: Value,
        input: &str,
    ) -> Option<Value> {
        let (result, mut step) = self.raw(name, operation, params).await;
        if let Some(result) = &result {
            probes::judge_acceptance(&mut step, result, input);
        }
        let passed = step.passed;
        self.record(step);
        match result {
            Some(TaskResult::Success(data)) if passed => Some(data),
            _ => None,
        }
    }

    /// Send a request whose handling the protocol leaves to the agent.
    pub async fn accept_either(&mut self, name: &str, operation: &str, params: Value, input: &str) {
        let (result, mut step) = self.raw(name, operation, params).await;
        if let Some(result) = &result {
            probes::judge_either(&mut step, result, input);
        }
        self.record(step);
    }

    pub fn last_created_id(&self) -> Option<&str> {
        self.log.last_created_id()
    }

    pub fn finish(self) -> ScenarioOutcome {
        ScenarioOutcome {
            steps: self.log.into_steps(),
            profile: None,
        }
    }

    pub fn finish_with_profile(self, profile: AgentProfile) -> ScenarioOutcome {
        ScenarioOutcome {
            steps: self.log.into_steps(),
            profile: Some(profile),
        }
    }

    /// Discovery query params built from the options.
    pub fn products_request(&self) -> Value {
        let mut params = json!({
            "brief": self.options.brief_text(),
            "brand": self.options.brand_json(),
        });
        let mut filters = serde_json::Map::new();
        if !self.options.channels.is_empty() {
            filters.insert("channels".to_string(), json!(self.options.channels));
        }
        if !self.options.format_ids.is_empty() {
            let format_ids: Vec<Value> = self
                .options
                .format_ids
                .iter()
                .map(|id| format_id_ref(id))
                .collect();
            filters.insert("format_ids".to_string(), Value::Array(format_ids));
        }
        if !filters.is_empty() {
            params["filters"] = Value::Object(filters);
        }
        params
    }

    pub fn buyer_ref(&self, label: &str) -> String {
        format!(
            "{}-{}",
            self.options.session_id.as_deref().unwrap_or("conformance"),
            label
        )
    }
}

/// Run the standard discovery query as a step and return the products.
pub(crate) async fn discover_products(ctx: &mut ScenarioContext) -> Option<Vec<Product>> {
    let params = ctx.products_request();
    let (response, mut step) = ctx.require::<GetProducts>("Discover products", params).await;
    let products = response.map(|r| r.products);
    if let Some(products) = &products {
        step.details(format!("Found {} products", products.len()));
        if products.is_empty() {
            step.warn("Agent returned no products for the brief");
        }
    }
    ctx.record(step);
    products
}

/// Discover products and pick one to buy; records a failed step when none
/// qualifies.
pub(crate) async fn discover_buy_target(
    ctx: &mut ScenarioContext,
) -> Option<(Vec<Product>, BuyTarget)> {
    let products = discover_products(ctx).await?;
    match select_product(&products, &ctx.options) {
        Some(target) => Some((products, target)),
        None => {
            ctx.record(prerequisite_missing(
                "Select product",
                "No product with a usable pricing option matches the filters",
            ));
            None
        }
    }
}

/// Product plus the pricing option a test buy should use.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyTarget {
    pub product: Product,
    pub pricing: PricingOption,
}

impl BuyTarget {
    /// Bid to send for auction pricing: comfortably above the floor.
    pub fn bid_price(&self) -> Option<f64> {
        if self.pricing.is_auction() {
            Some(self.pricing.bid_floor().map_or(10.0, |floor| floor * 1.5))
        } else {
            None
        }
    }

    /// Budget meeting both the configured amount and any minimum spend.
    pub fn budget(&self, configured: f64) -> f64 {
        match self.pricing.min_spend_per_package {
            Some(min) if min > configured => min,
            _ => configured,
        }
    }
}

/// Pick a product to buy.
///
/// Honours channel and pricing-model filters, prefers fixed pricing over
/// auction pricing, and otherwise keeps discovery order.
pub fn select_product(products: &[Product], options: &HarnessOptions) -> Option<BuyTarget> {
    let candidates = products.iter().filter(|p| {
        options.channels.is_empty() || p.channels.iter().any(|c| options.channels.contains(c))
    });

    let mut fallback = None;
    for product in candidates {
        for pricing in product.pricing_options.iter().filter(|o| {
            options.pricing_models.is_empty() || options.pricing_models.contains(&o.pricing_model)
        }) {
            let target = BuyTarget {
                product: product.clone(),
                pricing: pricing.clone(),
            };
            if !pricing.is_auction() {
                return Some(target);
            }
            fallback.get_or_insert(target);
        }
    }
    fallback
}

/// Pick a product whose pricing satisfies `predicate`.
pub fn find_pricing<F>(products: &[Product], predicate: F) -> Option<BuyTarget>
where
    F: Fn(&PricingOption) -> bool,
{
    products.iter().find_map(|product| {
        product
            .pricing_options
            .iter()
            .find(|o| predicate(o))
            .map(|pricing| BuyTarget {
                product: product.clone(),
                pricing: pricing.clone(),
            })
    })
}

/// Flight window starting tomorrow and lasting `days`, as RFC 3339 strings.
pub fn flight_dates(days: i64) -> (String, String) {
    let start = Utc::now() + Duration::days(1);
    let end = start + Duration::days(days);
    (start.to_rfc3339(), end.to_rfc3339())
}

/// `create_media_buy` request for one package of `target`.
pub fn media_buy_request(
    target: &BuyTarget,
    options: &HarnessOptions,
    buyer_ref: &str,
    budget: f64,
) -> Value {
    let (start_time, end_time) = flight_dates(30);
    let mut package = json!({
        "buyer_ref": format!("{}-pkg-1", buyer_ref),
        "product_id": target.product.product_id,
        "pricing_option_id": target.pricing.pricing_option_id,
        "budget": budget,
    });
    if let Some(bid) = target.bid_price() {
        package["bid_price"] = json!(bid);
    }
    if !target.product.format_ids.is_empty() {
        package["format_ids"] = json!(target.product.format_ids);
    }
    json!({
        "buyer_ref": buyer_ref,
        "brand": options.brand_json(),
        "packages": [package],
        "start_time": start_time,
        "end_time": end_time,
    })
}

/// Shallow copy of `request` with the first package's field replaced.
pub fn with_package_field(request: &Value, field: &str, value: Value) -> Value {
    let mut out = request.clone();
    if let Some(package) = out
        .get_mut("packages")
        .and_then(Value::as_array_mut)
        .and_then(|p| p.first_mut())
        .and_then(Value::as_object_mut)
    {
        package.insert(field.to_string(), value);
    }
    out
}

/// Shallow copy of `request` with the first package's field removed.
pub fn without_package_field(request: &Value, field: &str) -> Value {
    let mut out = request.clone();
    if let Some(package) = out
        .get_mut("packages")
        .and_then(Value::as_array_mut)
        .and_then(|p| p.first_mut())
        .and_then(Value::as_object_mut)
    {
        package.remove(field);
    }
    out
}

/// Standard failing step for a prerequisite that produced nothing usable.
pub(crate) fn prerequisite_missing(name: &str, reason: &str) -> StepResult {
    StepResult::synthetic_failure(name, reason.to_string())
}

/// Set the `created_id` on `step` and return the id for later steps.
pub(crate) fn track_created(step: &mut StepResult, id: Option<&str>) -> Option<String> {
    let id = id.filter(|id| !id.is_empty())?;
    step.created(id);
    Some(id.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use adcp_client::fakes::ScriptedAgent;

    #[test]
    fn test_products_request_uses_structured_format_ids() {
        let options = HarnessOptions {
            format_ids: vec!["display_300x250".to_string(), "video_15s".to_string()],
            channels: vec!["display".to_string()],
            ..Default::default()
        }
        .effective();
        let ctx = ScenarioContext::new(
            Scenario::Discovery,
            Arc::new(ScriptedAgent::new("seller")),
            options,
            AgentProfile::new("seller", ["get_products"]),
            Arc::new(NoopObserver),
        );

        let params = ctx.products_request();
        let format_ids = params["filters"]["format_ids"].as_array().expect("format ids");
        assert_eq!(format_ids.len(), 2);
        assert_eq!(format_ids[0], format_id_ref("display_300x250"));
        assert!(probes::check_format_ids(format_ids).is_ok());
        assert_eq!(params["filters"]["channels"], json!(["display"]));
    }

    fn products(values: Vec<Value>) -> Vec<Product> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).expect("product"))
            .collect()
    }

    #[test]
    fn test_select_product_prefers_fixed_pricing() {
        let list = products(vec![
            testing::product("auction", testing::auction_cpm("a1", 2.0)),
            testing::product("fixed", testing::fixed_cpm("f1")),
        ]);
        let target = select_product(&list, &HarnessOptions::default()).expect("target");
        assert_eq!(target.product.product_id, "fixed");
        assert!(target.bid_price().is_none());
    }

    #[test]
    fn test_select_product_falls_back_to_auction() {
        let list = products(vec![testing::product("auction", testing::auction_cpm("a1", 4.0))]);
        let target = select_product(&list, &HarnessOptions::default()).expect("target");
        assert_eq!(target.bid_price(), Some(6.0));
    }

    #[test]
    fn test_select_product_respects_filters() {
        let list = products(vec![testing::product("p", testing::fixed_cpm("f1"))]);
        let options = HarnessOptions {
            channels: vec!["ctv".to_string()],
            ..Default::default()
        };
        assert!(select_product(&list, &options).is_none());

        let options = HarnessOptions {
            pricing_models: vec!["cpcv".to_string()],
            ..Default::default()
        };
        assert!(select_product(&list, &options).is_none());
    }

    #[test]
    fn test_budget_honours_min_spend() {
        let list = products(vec![testing::product(
            "p",
            json!({ "pricing_option_id": "o", "pricing_model": "cpm", "rate": 5.0, "min_spend_per_package": 5000.0 }),
        )]);
        let target = select_product(&list, &HarnessOptions::default()).expect("target");
        assert_eq!(target.budget(1000.0), 5000.0);
        assert_eq!(target.budget(8000.0), 8000.0);
    }

    #[test]
    fn test_media_buy_request_shape() {
        let list = products(vec![testing::product("auction", testing::auction_cpm("a1", 2.0))]);
        let target = select_product(&list, &HarnessOptions::default()).expect("target");
        let request = media_buy_request(&target, &HarnessOptions::default(), "ref-1", 1000.0);

        assert_eq!(request["buyer_ref"], "ref-1");
        assert_eq!(request["packages"][0]["product_id"], "auction");
        assert_eq!(request["packages"][0]["bid_price"], 3.0);
        assert!(request["start_time"].as_str().unwrap() < request["end_time"].as_str().unwrap());

        let edited = with_package_field(&request, "budget", json!(-500));
        assert_eq!(edited["packages"][0]["budget"], -500);
        let stripped = without_package_field(&request, "bid_price");
        assert!(stripped["packages"][0].get("bid_price").is_none());
    }
}
