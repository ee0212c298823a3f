//! Unknown operations and unknown identifiers must be rejected, and the agent
//! must keep answering normally afterwards.

use adcp_client::operations::{GetMediaBuyDelivery, GetProducts, UpdateMediaBuy};
use adcp_client::{Operation, TaskResult};
use serde_json::json;

use super::{ScenarioContext, ScenarioOutcome};
use crate::probes::{rejection_reason, Severity};

/// Operation name no agent implements.
pub const UNKNOWN_OPERATION: &str = "nonexistent_operation_conformance";

/// Media buy identifier no agent has issued.
pub const UNKNOWN_MEDIA_BUY_ID: &str = "mb-nonexistent-conformance-000";

pub async fn error_handling(mut ctx: ScenarioContext) -> ScenarioOutcome {
    ctx.expect_rejection(
        "Reject unknown operation",
        UNKNOWN_OPERATION,
        json!({}),
        "an unknown operation",
        Severity::Normal,
    )
    .await;

    if ctx.has_tool(UpdateMediaBuy::NAME) {
        ctx.expect_rejection(
            "Reject update of unknown media buy",
            UpdateMediaBuy::NAME,
            json!({ "media_buy_id": UNKNOWN_MEDIA_BUY_ID, "paused": true }),
            "an update to an unknown media buy",
            Severity::Normal,
        )
        .await;
    }

    if ctx.has_tool(GetMediaBuyDelivery::NAME) {
        let (result, mut step) = ctx
            .raw(
                "Unknown media buy delivery",
                GetMediaBuyDelivery::NAME,
                json!({ "media_buy_ids": [UNKNOWN_MEDIA_BUY_ID] }),
            )
            .await;
        if let Some(result) = &result {
            match rejection_reason(result) {
                Some(reason) => {
                    step.pass(format!("Correctly rejected unknown media buy: {}", reason));
                }
                None => {
                    let reported = match result {
                        TaskResult::Success(data) => data
                            .get("media_buy_deliveries")
                            .and_then(|d| d.as_array())
                            .map_or(0, Vec::len),
                        TaskResult::Failure { .. } => 0,
                    };
                    if reported == 0 {
                        step.pass("No delivery reported for an unknown media buy");
                    } else {
                        step.fail(format!(
                            "Agent reported delivery for unknown media buy {}",
                            UNKNOWN_MEDIA_BUY_ID
                        ));
                    }
                }
            }
        }
        ctx.record(step);
    }

    let params = ctx.products_request();
    let (response, mut step) = ctx
        .require::<GetProducts>("Recover after errors", params)
        .await;
    if let Some(response) = response {
        step.details(format!(
            "Agent still answers normally ({} products)",
            response.products.len()
        ));
    }
    ctx.record(step);

    ctx.finish()
}
