//! Media buy creation and the full sales flow.

use adcp_client::operations::{
    CreateMediaBuy, GetMediaBuyDelivery, ProvidePerformanceFeedback, UpdateMediaBuy,
};
use adcp_client::Operation;
use serde_json::{json, Value};

use super::{
    discover_buy_target, media_buy_request, track_created, with_package_field, BuyTarget,
    ScenarioContext, ScenarioOutcome,
};
use crate::probes::Severity;

/// Budget the negative-budget probe sends.
pub const NEGATIVE_BUDGET: f64 = -500.0;

/// A media buy created during a scenario.
#[derive(Debug, Clone)]
pub(crate) struct CreatedBuy {
    pub media_buy_id: String,
    pub buyer_ref: String,
    pub request: Value,
}

/// Create a media buy for `target` as a step.
pub(crate) async fn create_buy(
    ctx: &mut ScenarioContext,
    step_name: &str,
    target: &BuyTarget,
    label: &str,
    customize: impl FnOnce(Value) -> Value,
) -> Option<CreatedBuy> {
    let buyer_ref = ctx.buyer_ref(label);
    let budget = target.budget(ctx.options.test_budget());
    let request = customize(media_buy_request(target, &ctx.options, &buyer_ref, budget));

    let (response, mut step) = ctx
        .require::<CreateMediaBuy>(step_name, request.clone())
        .await;
    let mut created = None;
    if let Some(response) = response {
        step.preview(&response);
        if !response.errors.is_empty() {
            step.fail(format!("create_media_buy reported errors: {}", json!(response.errors)));
        } else if let Some(id) = track_created(&mut step, response.media_buy_id.as_deref()) {
            step.details(format!(
                "Created media buy {} (status: {}) for product {}",
                id,
                response.status.as_deref().unwrap_or("unknown"),
                target.product.product_id
            ));
            created = Some(CreatedBuy {
                media_buy_id: id,
                buyer_ref,
                request,
            });
        } else {
            step.fail("create_media_buy succeeded without a media_buy_id");
        }
    }
    ctx.record(step);
    created
}

/// Send the standard buy with a negative package budget.
pub(crate) async fn probe_negative_budget(ctx: &mut ScenarioContext, target: &BuyTarget) -> bool {
    let buyer_ref = ctx.buyer_ref("negative-budget");
    let request = media_buy_request(target, &ctx.options, &buyer_ref, ctx.options.test_budget());
    let request = with_package_field(&request, "budget", json!(NEGATIVE_BUDGET));
    ctx.expect_rejection(
        "Reject negative budget",
        CreateMediaBuy::NAME,
        request,
        "a negative budget",
        Severity::Critical,
    )
    .await
}

async fn check_delivery(ctx: &mut ScenarioContext, media_buy_id: &str) {
    let (response, mut step) = ctx
        .require::<GetMediaBuyDelivery>(
            "Get media buy delivery",
            json!({ "media_buy_ids": [media_buy_id] }),
        )
        .await;
    if let Some(response) = response {
        let found = response
            .media_buy_deliveries
            .iter()
            .any(|d| d.media_buy_id.as_deref() == Some(media_buy_id));
        if found {
            step.details(format!("Delivery reported for {}", media_buy_id));
        } else {
            step.warn(format!("No delivery entry for {}", media_buy_id));
            step.details(format!(
                "{} delivery entries returned",
                response.media_buy_deliveries.len()
            ));
        }
    }
    ctx.record(step);
}

pub async fn create_media_buy(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let Some((_, target)) = discover_buy_target(&mut ctx).await else {
        return ctx.finish();
    };

    let created = create_buy(&mut ctx, "Create media buy", &target, "buy", |r| r).await;
    probe_negative_budget(&mut ctx, &target).await;

    if let Some(buy) = created {
        if ctx.has_tool(GetMediaBuyDelivery::NAME) {
            check_delivery(&mut ctx, &buy.media_buy_id).await;
        }
    }
    ctx.finish()
}

pub async fn full_sales_flow(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let Some((_, target)) = discover_buy_target(&mut ctx).await else {
        return ctx.finish();
    };
    let Some(buy) = create_buy(&mut ctx, "Create media buy", &target, "flow", |r| r).await else {
        return ctx.finish();
    };

    let budget = target.budget(ctx.options.test_budget());
    let update = json!({
        "media_buy_id": buy.media_buy_id,
        "buyer_ref": buy.buyer_ref,
        "packages": [{
            "buyer_ref": buy.request["packages"][0]["buyer_ref"],
            "budget": (budget * 1.1).round(),
        }],
    });
    let (response, mut step) = ctx
        .require::<UpdateMediaBuy>("Update media buy budget", update)
        .await;
    if let Some(response) = response {
        if response.errors.is_empty() {
            step.details(format!(
                "Updated {} (status: {})",
                buy.media_buy_id,
                response.status.as_deref().unwrap_or("unknown")
            ));
        } else {
            step.fail(format!("update_media_buy reported errors: {}", json!(response.errors)));
        }
    }
    ctx.record(step);

    let pause = json!({ "media_buy_id": buy.media_buy_id, "paused": true });
    let (response, mut step) = ctx.require::<UpdateMediaBuy>("Pause media buy", pause).await;
    if let Some(response) = response {
        if response.errors.is_empty() {
            step.details(format!("Paused {}", buy.media_buy_id));
        } else {
            step.fail(format!("pause reported errors: {}", json!(response.errors)));
        }
    }
    ctx.record(step);

    if ctx.has_tool(GetMediaBuyDelivery::NAME) {
        check_delivery(&mut ctx, &buy.media_buy_id).await;
    }

    if ctx.has_tool(ProvidePerformanceFeedback::NAME) {
        let feedback = json!({
            "media_buy_id": buy.media_buy_id,
            "measurement_period": {
                "start": buy.request["start_time"],
                "end": buy.request["end_time"],
            },
            "performance_index": 1.0,
            "metric_type": "overall_performance",
        });
        ctx.accept_either(
            "Provide performance feedback",
            ProvidePerformanceFeedback::NAME,
            feedback,
            "performance feedback for a fresh buy",
        )
        .await;
    }

    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use crate::scenarios::testing;
    use adcp_client::fakes::ScriptedAgent;
    use adcp_client::TaskResult;

    fn products() -> Value {
        json!({ "products": [testing::product("p1", testing::fixed_cpm("o1"))] })
    }

    fn budget_checking_seller() -> ScriptedAgent {
        ScriptedAgent::new("seller")
            .with_success("get_products", products())
            .with_tool("create_media_buy", |params| {
                let budget = params["packages"][0]["budget"].as_f64().unwrap_or(0.0);
                if budget < 0.0 {
                    TaskResult::failure("budget must be positive")
                } else {
                    TaskResult::Success(json!({ "media_buy_id": "mb-1", "status": "pending_activation" }))
                }
            })
    }

    #[tokio::test]
    async fn test_create_media_buy_happy_path() {
        let agent = budget_checking_seller()
            .with_success("get_media_buy_delivery", json!({ "media_buy_deliveries": [{ "media_buy_id": "mb-1" }] }));
        let outcome =
            create_media_buy(testing::context(Scenario::CreateMediaBuy, &agent).await).await;

        assert_eq!(
            testing::step_names(&outcome),
            vec![
                "Discover products",
                "Create media buy",
                "Reject negative budget",
                "Get media buy delivery"
            ]
        );
        assert!(outcome.steps.iter().all(|s| s.passed), "{:?}", outcome.steps);
        assert_eq!(
            testing::step(&outcome, "Create media buy").created_id.as_deref(),
            Some("mb-1")
        );
    }

    #[tokio::test]
    async fn test_create_without_id_fails() {
        let agent = ScriptedAgent::new("seller")
            .with_success("get_products", products())
            .with_success("create_media_buy", json!({ "status": "submitted" }));
        let outcome =
            create_media_buy(testing::context(Scenario::CreateMediaBuy, &agent).await).await;
        assert!(!testing::step(&outcome, "Create media buy").passed);
    }

    #[tokio::test]
    async fn test_no_products_stops_scenario() {
        let agent = ScriptedAgent::new("seller")
            .with_success("get_products", json!({ "products": [] }))
            .with_success("create_media_buy", json!({ "media_buy_id": "x" }));
        let outcome =
            create_media_buy(testing::context(Scenario::CreateMediaBuy, &agent).await).await;
        assert_eq!(
            testing::step_names(&outcome),
            vec!["Discover products", "Select product"]
        );
        assert!(agent.calls_to("create_media_buy").is_empty());
    }

    #[tokio::test]
    async fn test_full_sales_flow_threads_media_buy_id() {
        let agent = budget_checking_seller()
            .with_success("update_media_buy", json!({ "media_buy_id": "mb-1", "status": "active" }));
        let outcome =
            full_sales_flow(testing::context(Scenario::FullSalesFlow, &agent).await).await;

        assert!(outcome.steps.iter().all(|s| s.passed), "{:?}", outcome.steps);
        let updates = agent.calls_to("update_media_buy");
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u["media_buy_id"] == "mb-1"));
        assert_eq!(updates[1]["paused"], true);
    }
}
