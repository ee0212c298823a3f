//! Pricing rules: auction bids, floors, minimum spend and fixed-rate edges.

use adcp_client::operations::CreateMediaBuy;
use adcp_client::types::PricingOption;
use adcp_client::Operation;
use serde_json::json;

use super::{
    discover_products, find_pricing, media_buy_request, select_product, with_package_field,
    without_package_field, BuyTarget, ScenarioContext, ScenarioOutcome,
};
use crate::probes::Severity;
use crate::result::StepResult;

pub async fn pricing_edge_cases(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let Some(products) = discover_products(&mut ctx).await else {
        return ctx.finish();
    };
    let budget = ctx.options.test_budget();

    match find_pricing(&products, |o| o.is_auction()) {
        Some(target) => {
            let request = buy_request(&ctx, &target, "auction-no-bid", target.budget(budget));
            ctx.expect_rejection(
                "Reject auction buy without bid price",
                CreateMediaBuy::NAME,
                without_package_field(&request, "bid_price"),
                "auction pricing without a bid_price",
                Severity::Normal,
            )
            .await;

            if let Some(floor) = target.pricing.bid_floor() {
                let request = buy_request(&ctx, &target, "below-floor", target.budget(budget));
                ctx.expect_rejection(
                    "Reject bid below floor",
                    CreateMediaBuy::NAME,
                    with_package_field(&request, "bid_price", json!(floor * 0.5)),
                    &format!("a bid of {} under a floor of {}", floor * 0.5, floor),
                    Severity::Normal,
                )
                .await;
            }
        }
        None => ctx.note("Auction pricing", "No auction pricing offered; probes skipped"),
    }

    let positive_min_spend = |o: &PricingOption| o.min_spend_per_package.is_some_and(|m| m > 0.0);
    match find_pricing(&products, positive_min_spend) {
        Some(target) => {
            let min = target.pricing.min_spend_per_package.unwrap_or_default();
            let request = buy_request(&ctx, &target, "below-min-spend", min * 0.5);
            ctx.expect_rejection(
                "Reject budget below minimum spend",
                CreateMediaBuy::NAME,
                request,
                &format!("a budget of {} under a minimum spend of {}", min * 0.5, min),
                Severity::Normal,
            )
            .await;
        }
        None => ctx.note("Minimum spend", "No positive minimum spend declared; probe skipped"),
    }

    if let Some(target) = find_pricing(&products, |o| o.fixed_rate().is_some()) {
        let request = buy_request(&ctx, &target, "fixed-with-bid", target.budget(budget));
        ctx.accept_either(
            "Bid price on fixed pricing",
            CreateMediaBuy::NAME,
            with_package_field(&request, "bid_price", json!(1.0)),
            "a bid_price on fixed-rate pricing",
        )
        .await;
    }

    match select_product(&products, &ctx.options) {
        Some(target) => {
            let request = buy_request(&ctx, &target, "zero-budget", 0.0);
            ctx.accept_either(
                "Zero budget",
                CreateMediaBuy::NAME,
                request,
                "a zero budget",
            )
            .await;
        }
        None => ctx.record(StepResult::synthetic_failure(
            "Zero budget",
            "No product with a usable pricing option",
        )),
    }

    ctx.finish()
}

fn buy_request(
    ctx: &ScenarioContext,
    target: &BuyTarget,
    label: &str,
    budget: f64,
) -> serde_json::Value {
    media_buy_request(target, &ctx.options, &ctx.buyer_ref(label), budget)
}
