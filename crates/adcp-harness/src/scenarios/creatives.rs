//! Creative library sync, inline creatives and the build/preview flow.

use adcp_client::operations::{
    BuildCreative, ListCreativeFormats, ListCreatives, PreviewCreative, SyncCreatives,
};
use adcp_client::{Operation, TaskResult};
use serde_json::{json, Value};

use super::media_buy::create_buy;
use super::{
    discover_buy_target, format_id_ref, track_created, with_package_field, ScenarioContext,
    ScenarioOutcome,
};
use crate::probes::{check_format_ids, check_pagination, rejection_reason};
use crate::profile::format_id_label;

const DEFAULT_FORMAT: &str = "display_300x250";

/// Structured format identifier the test creatives target.
fn target_format_id(ctx: &ScenarioContext) -> Value {
    let id = ctx
        .options
        .format_ids
        .first()
        .or_else(|| ctx.profile.format_ids.as_ref().and_then(|ids| ids.first()))
        .map(String::as_str)
        .unwrap_or(DEFAULT_FORMAT);
    format_id_ref(id)
}

fn test_creative(creative_id: &str, format_id: &Value) -> Value {
    json!({
        "creative_id": creative_id,
        "name": "Conformance test creative",
        "format_id": format_id,
        "assets": {
            "main": {
                "asset_type": "image",
                "url": "https://conformance.adcontextprotocol.org/creatives/300x250.png",
                "width": 300,
                "height": 250
            }
        },
        "click_url": "https://conformance.adcontextprotocol.org/landing"
    })
}

/// Rejection reason for a sync request: top-level rejection, or any
/// per-creative error or failed action.
fn sync_rejection_reason(result: &TaskResult<Value>) -> Option<String> {
    if let Some(reason) = rejection_reason(result) {
        return Some(reason);
    }
    let creatives = result.data()?.get("creatives")?.as_array()?;
    creatives.iter().find_map(|c| {
        let errors = c.get("errors").and_then(Value::as_array);
        match errors {
            Some(errors) if !errors.is_empty() => Some(errors[0].to_string()),
            _ if c.get("action").and_then(Value::as_str) == Some("failed") => {
                Some("creative action 'failed'".to_string())
            }
            _ => None,
        }
    })
}

pub async fn creative_sync(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let format_id = target_format_id(&ctx);
    let creative_id = ctx.buyer_ref("creative");
    let request = json!({ "creatives": [test_creative(&creative_id, &format_id)] });

    let (response, mut step) = ctx.require::<SyncCreatives>("Sync creative", request).await;
    if let Some(response) = response {
        step.preview(&response);
        let failed: Vec<String> = response
            .creatives
            .iter()
            .filter(|c| !c.errors.is_empty() || c.action.as_deref() == Some("failed"))
            .map(|c| c.creative_id.clone().unwrap_or_default())
            .collect();
        if !response.errors.is_empty() {
            step.fail(format!("sync_creatives reported errors: {}", json!(response.errors)));
        } else if !failed.is_empty() {
            step.fail(format!("Creatives failed to sync: {}", failed.join(", ")));
        } else {
            let synced = response
                .creatives
                .iter()
                .find_map(|c| c.creative_id.as_deref())
                .or(Some(creative_id.as_str()));
            track_created(&mut step, synced);
            let action = response
                .creatives
                .first()
                .and_then(|c| c.action.as_deref())
                .unwrap_or("unspecified");
            step.details(format!("Synced {} (action: {})", creative_id, action));
        }
    }
    ctx.record(step);

    if ctx.has_tool(ListCreatives::NAME) {
        let (response, mut step) = ctx.require::<ListCreatives>("List creatives", json!({})).await;
        if let Some(response) = response {
            step.details(format!("Library holds {} creatives", response.creatives.len()));
            match check_pagination(response.query_summary.as_ref(), response.creatives.len()) {
                Ok(warnings) => {
                    for w in warnings {
                        step.warn(w);
                    }
                }
                Err(bug) => {
                    step.fail(bug);
                }
            }
        }
        ctx.record(step);
    }

    let mut malformed = test_creative(&ctx.buyer_ref("creative-no-format"), &format_id);
    if let Some(obj) = malformed.as_object_mut() {
        obj.remove("format_id");
    }
    let (result, mut step) = ctx
        .raw(
            "Reject creative without format",
            SyncCreatives::NAME,
            json!({ "creatives": [malformed] }),
        )
        .await;
    if let Some(result) = result {
        match sync_rejection_reason(&result) {
            Some(reason) => {
                step.pass(format!("Correctly rejected creative without format_id: {}", reason));
            }
            None => {
                step.fail("Agent accepted a creative without format_id");
            }
        }
    }
    ctx.record(step);

    ctx.finish()
}

pub async fn creative_inline(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let Some((_, target)) = discover_buy_target(&mut ctx).await else {
        return ctx.finish();
    };
    let format_id = target
        .product
        .format_ids
        .first()
        .cloned()
        .unwrap_or_else(|| target_format_id(&ctx));
    let creative = test_creative(&ctx.buyer_ref("inline-creative"), &format_id);

    create_buy(
        &mut ctx,
        "Create media buy with inline creative",
        &target,
        "inline",
        move |request| with_package_field(&request, "creatives", json!([creative])),
    )
    .await;

    ctx.finish()
}

pub async fn creative_flow(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let (response, mut step) = ctx
        .require::<ListCreativeFormats>("List creative formats", json!({}))
        .await;
    let formats = match response {
        Some(response) => {
            if response.formats.is_empty() {
                step.fail("Agent lists no creative formats");
            } else {
                step.details(format!("Found {} creative formats", response.formats.len()));
            }
            let ids: Vec<Value> = response.formats.iter().map(|f| f.format_id.clone()).collect();
            if let Err(problems) = check_format_ids(&ids) {
                step.fail(format!("Malformed format identifiers: {}", problems.join("; ")));
            }
            response.formats
        }
        None => Vec::new(),
    };
    ctx.record(step);

    let breadth = ctx.options.format_breadth();
    let mut first_manifest: Option<(Value, Value)> = None;
    for format in formats.iter().filter(|f| f.format_id.is_object()).take(breadth) {
        let label = format_id_label(&format.format_id).unwrap_or_default();
        let request = json!({
            "target_format_id": format.format_id,
            "message": ctx.options.brief_text(),
            "creative_manifest": {
                "format_id": format.format_id,
                "assets": test_creative("seed", &format.format_id)["assets"],
            },
        });
        let (response, mut step) = ctx
            .require::<BuildCreative>(&format!("Build creative ({})", label), request)
            .await;
        if let Some(response) = response {
            match response.creative_manifest {
                Some(manifest) => {
                    step.details(format!("Built manifest for {}", label));
                    step.preview(&manifest);
                    first_manifest.get_or_insert((format.format_id.clone(), manifest));
                }
                None => {
                    step.fail("build_creative returned no creative_manifest");
                }
            }
        }
        ctx.record(step);
    }

    if ctx.has_tool(PreviewCreative::NAME) {
        if let Some((format_id, manifest)) = first_manifest {
            let request = json!({
                "request_type": "single",
                "format_id": format_id,
                "creative_manifest": manifest,
            });
            let (response, mut step) = ctx
                .require::<PreviewCreative>("Preview creative", request)
                .await;
            if let Some(response) = response {
                if response.previews.is_empty() {
                    step.warn("preview_creative returned no previews");
                }
                step.details(format!("{} previews", response.previews.len()));
            }
            ctx.record(step);
        }
    }

    ctx.finish()
}
