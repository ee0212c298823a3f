//! Product, format and property discovery.

use adcp_client::operations::{GetProducts, ListAuthorizedProperties, ListCreativeFormats};
use adcp_client::Operation;
use serde_json::{json, Value};

use super::{ScenarioContext, ScenarioOutcome};
use crate::discovery::apply_product_sample;
use crate::probes::{check_format_ids, check_pagination};
use crate::profile::{distinct, format_id_label};

pub async fn discovery(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let mut profile = ctx.profile.clone();

    let params = ctx.products_request();
    let (response, mut step) = ctx.require::<GetProducts>("Get products", params).await;
    if let Some(response) = response {
        let count = response.products.len();
        step.details(format!("Found {} products", count));
        step.preview(&response.products.iter().map(|p| &p.product_id).collect::<Vec<_>>());

        match check_pagination(response.query_summary.as_ref(), count) {
            Ok(warnings) => {
                for w in warnings {
                    step.warn(w);
                }
            }
            Err(bug) => {
                step.fail(bug);
            }
        }

        let format_ids: Vec<Value> = response
            .products
            .iter()
            .flat_map(|p| p.format_ids.iter().cloned())
            .collect();
        if let Err(problems) = check_format_ids(&format_ids) {
            step.fail(format!(
                "Malformed format identifiers: {}",
                problems.join("; ")
            ));
        }
        for product in response.products.iter().filter(|p| p.pricing_options.is_empty()) {
            step.warn(format!("Product '{}' has no pricing options", product.product_id));
        }
        apply_product_sample(&mut profile, &response);
    }
    ctx.record(step);

    if ctx.has_tool(ListCreativeFormats::NAME) {
        let (response, mut step) = ctx
            .require::<ListCreativeFormats>("List creative formats", json!({}))
            .await;
        if let Some(response) = response {
            step.details(format!("Found {} creative formats", response.formats.len()));
            let ids: Vec<Value> = response.formats.iter().map(|f| f.format_id.clone()).collect();
            if let Err(problems) = check_format_ids(&ids) {
                step.fail(format!(
                    "Malformed format identifiers: {}",
                    problems.join("; ")
                ));
            }
            profile.supported_formats =
                distinct(response.formats.iter().filter_map(|f| format_id_label(&f.format_id)));
        }
        ctx.record(step);
    }

    if ctx.has_tool(ListAuthorizedProperties::NAME) {
        let (response, mut step) = ctx
            .require::<ListAuthorizedProperties>("List authorized properties", json!({}))
            .await;
        if let Some(response) = response {
            if response.publisher_domains.is_empty() {
                step.warn("Agent is not authorized for any publisher domain");
            }
            step.details(format!(
                "Authorized for {} publisher domains",
                response.publisher_domains.len()
            ));
            step.preview(&response.publisher_domains);
        }
        ctx.record(step);
    }

    ctx.finish_with_profile(profile)
}
