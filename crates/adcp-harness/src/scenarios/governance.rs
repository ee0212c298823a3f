//! Governance protocol: property list CRUD and content standards.

use adcp_client::operations::{
    CalibrateContent, CreatePropertyList, DeletePropertyList, GetContentStandards,
    GetPropertyList, ListContentStandards, ListPropertyLists, UpdatePropertyList,
};
use adcp_client::Operation;
use serde_json::json;

use super::{prerequisite_missing, track_created, ScenarioContext, ScenarioOutcome};
use crate::probes::Severity;

const UNKNOWN_STANDARDS_ID: &str = "standards-nonexistent-conformance-000";

pub async fn governance_property_lists(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let name = ctx.buyer_ref("property-list");
    let request = json!({
        "name": name,
        "description": "Conformance test property list",
        "base_properties": [{
            "selection_type": "identifiers",
            "identifiers": [{ "type": "domain", "value": "conformance.adcontextprotocol.org" }]
        }],
        "brand": ctx.options.brand_json(),
    });
    let (response, mut step) = ctx
        .require::<CreatePropertyList>("Create property list", request)
        .await;
    let list_id = response.as_ref().and_then(|r| {
        let id = track_created(&mut step, r.resolved_list_id());
        if id.is_none() {
            step.fail("create_property_list returned no list_id");
        }
        id
    });
    if let Some(id) = &list_id {
        step.details(format!("Created property list {}", id));
    }
    ctx.record(step);

    let Some(list_id) = list_id else {
        return ctx.finish();
    };

    let (response, mut step) = ctx
        .require::<GetPropertyList>("Get property list", json!({ "list_id": list_id }))
        .await;
    if let Some(response) = response {
        match response.resolved_list_id() {
            Some(id) if id != list_id => {
                step.fail(format!("Asked for {} but received {}", list_id, id));
            }
            _ => {
                step.details(format!(
                    "Read back {} ({} identifiers)",
                    response.resolved_name().unwrap_or(&list_id),
                    response.identifiers.len()
                ));
            }
        }
    }
    ctx.record(step);

    if ctx.has_tool(UpdatePropertyList::NAME) {
        let renamed = format!("{} (renamed)", name);
        let (response, mut step) = ctx
            .require::<UpdatePropertyList>(
                "Update property list",
                json!({ "list_id": list_id, "name": renamed }),
            )
            .await;
        if let Some(response) = response {
            match response.resolved_name() {
                Some(n) if n != renamed => step.warn(format!("Name after update is '{}'", n)),
                _ => step.details("Renamed property list"),
            };
        }
        ctx.record(step);
    }

    if ctx.has_tool(ListPropertyLists::NAME) {
        let (response, mut step) = ctx
            .require::<ListPropertyLists>("List property lists", json!({}))
            .await;
        if let Some(response) = response {
            step.details(format!("{} property lists", response.lists.len()));
            if !response.lists.iter().any(|l| l.list_id == list_id) {
                step.warn(format!("Created list {} missing from listing", list_id));
            }
        }
        ctx.record(step);
    }

    if ctx.has_tool(DeletePropertyList::NAME) {
        let (response, mut step) = ctx
            .require::<DeletePropertyList>("Delete property list", json!({ "list_id": list_id }))
            .await;
        let deleted = match response {
            Some(response) if response.deleted == Some(false) => {
                step.fail("delete_property_list reported deleted=false");
                false
            }
            Some(_) => {
                step.details(format!("Deleted {}", list_id));
                true
            }
            None => false,
        };
        ctx.record(step);

        if deleted {
            ctx.expect_rejection(
                "Reject get after delete",
                GetPropertyList::NAME,
                json!({ "list_id": list_id }),
                "a read of a deleted property list",
                Severity::Normal,
            )
            .await;
        }
    }

    ctx.finish()
}

pub async fn governance_content_standards(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let (response, mut step) = ctx
        .require::<ListContentStandards>("List content standards", json!({}))
        .await;
    let standards = response.map(|r| r.standards).unwrap_or_default();
    if step.passed {
        step.details(format!("{} content standards", standards.len()));
    }
    ctx.record(step);

    let known_id = standards
        .iter()
        .map(|s| s.standards_id.clone())
        .find(|id| !id.is_empty());

    if ctx.has_tool(GetContentStandards::NAME) {
        match &known_id {
            Some(id) => {
                let (response, mut step) = ctx
                    .require::<GetContentStandards>(
                        "Get content standards",
                        json!({ "standards_id": id }),
                    )
                    .await;
                if let Some(response) = response {
                    match response.resolved_id() {
                        Some(got) if got != id => {
                            step.fail(format!("Asked for {} but received {}", id, got));
                        }
                        _ => {
                            step.details(format!("Read standards {}", id));
                        }
                    }
                }
                ctx.record(step);
            }
            None => ctx.note("Get content standards", "No standards listed; probe skipped"),
        }
    }

    if ctx.has_tool(CalibrateContent::NAME) {
        let mut request = json!({
            "content": {
                "type": "article",
                "url": "https://conformance.adcontextprotocol.org/articles/sample",
                "text": "A neutral article about home gardening and seasonal vegetables."
            }
        });
        if let Some(id) = &known_id {
            request["standards_id"] = json!(id);
        }
        let (response, mut step) = ctx
            .require::<CalibrateContent>("Calibrate content", request)
            .await;
        if let Some(response) = response {
            match (&response.verdict, response.score) {
                (None, None) => {
                    step.fail("calibrate_content returned neither verdict nor score");
                }
                (verdict, score) => {
                    step.details(format!(
                        "verdict={} score={}",
                        verdict.as_deref().unwrap_or("-"),
                        score.map_or_else(|| "-".to_string(), |s| s.to_string())
                    ));
                }
            }
        }
        ctx.record(step);
    }

    if ctx.has_tool(GetContentStandards::NAME) {
        ctx.expect_rejection(
            "Reject unknown standards id",
            GetContentStandards::NAME,
            json!({ "standards_id": UNKNOWN_STANDARDS_ID }),
            "a read of unknown content standards",
            Severity::Normal,
        )
        .await;
    } else if standards.is_empty() && !ctx.has_tool(CalibrateContent::NAME) {
        ctx.record(prerequisite_missing(
            "Content standards",
            "No standards listed and no operation to inspect them",
        ));
    }

    ctx.finish()
}
