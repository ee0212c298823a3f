//! Input validation and flight-date rules.

use adcp_client::operations::{CreateMediaBuy, GetProducts, SyncCreatives};
use adcp_client::Operation;
use chrono::{Duration, Utc};
use serde_json::json;

use super::media_buy::probe_negative_budget;
use super::{
    discover_buy_target, format_id_ref, media_buy_request, BuyTarget, ScenarioContext,
    ScenarioOutcome,
};
use crate::probes::Severity;

/// Assignment weights are percentages.
pub const MAX_ASSIGNMENT_WEIGHT: u32 = 100;

pub async fn validation(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let mut params = ctx.products_request();
    params["filters"] = json!({ "delivery_type": "not_a_real_delivery_type" });
    ctx.expect_rejection(
        "Reject invalid delivery_type",
        GetProducts::NAME,
        params,
        "an invalid delivery_type enum value",
        Severity::Normal,
    )
    .await;

    ctx.expect_rejection(
        "Reject non-string brief",
        GetProducts::NAME,
        json!({ "brief": 12345 }),
        "a numeric brief",
        Severity::Normal,
    )
    .await;

    if ctx.has_tool(CreateMediaBuy::NAME) {
        if let Some((_, target)) = discover_buy_target(&mut ctx).await {
            probe_negative_budget(&mut ctx, &target).await;
        }
    }

    if ctx.has_tool(SyncCreatives::NAME) {
        let weight = MAX_ASSIGNMENT_WEIGHT * 3 / 2;
        let creative_id = ctx.buyer_ref("weight-probe");
        let request = json!({
            "creatives": [{
                "creative_id": creative_id,
                "name": "Weight probe",
                "format_id": format_id_ref("display_300x250"),
                "assets": {}
            }],
            "assignments": {
                (creative_id.clone()): [{ "package_id": "pkg-1", "weight": weight }]
            }
        });
        ctx.expect_rejection(
            "Reject oversized assignment weight",
            SyncCreatives::NAME,
            request,
            &format!("an assignment weight of {}", weight),
            Severity::Normal,
        )
        .await;
    }

    ctx.finish()
}

fn dated_request(
    ctx: &ScenarioContext,
    target: &BuyTarget,
    label: &str,
    start: &str,
    end: &str,
) -> serde_json::Value {
    let mut request = media_buy_request(
        target,
        &ctx.options,
        &ctx.buyer_ref(label),
        target.budget(ctx.options.test_budget()),
    );
    request["start_time"] = json!(start);
    request["end_time"] = json!(end);
    request
}

pub async fn temporal_validation(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let Some((_, target)) = discover_buy_target(&mut ctx).await else {
        return ctx.finish();
    };

    let now = Utc::now();
    let in_days = |days: i64| (now + Duration::days(days)).to_rfc3339();

    let request = dated_request(&ctx, &target, "end-before-start", &in_days(10), &in_days(5));
    ctx.expect_rejection(
        "Reject end before start",
        CreateMediaBuy::NAME,
        request,
        "an end_time before start_time",
        Severity::Normal,
    )
    .await;

    let request = dated_request(&ctx, &target, "malformed-date", "next tuesday", &in_days(30));
    ctx.expect_rejection(
        "Reject malformed start_time",
        CreateMediaBuy::NAME,
        request,
        "a start_time that is not a timestamp",
        Severity::Normal,
    )
    .await;

    let request = dated_request(&ctx, &target, "past-start", &in_days(-7), &in_days(30));
    ctx.accept_either(
        "Start time in the past",
        CreateMediaBuy::NAME,
        request,
        "a start_time in the past",
    )
    .await;

    let instant = in_days(5);
    let request = dated_request(&ctx, &target, "zero-length", &instant, &instant);
    ctx.accept_either(
        "Zero-length flight",
        CreateMediaBuy::NAME,
        request,
        "a flight whose end equals its start",
    )
    .await;

    let request = dated_request(&ctx, &target, "asap", "asap", &in_days(30));
    ctx.expect_acceptance(
        "Accept asap start",
        CreateMediaBuy::NAME,
        request,
        "start_time 'asap'",
    )
    .await;

    ctx.finish()
}
