//! Behavioural checks on product discovery: brief relevance, filter
//! adherence and response-shape consistency.

use adcp_client::operations::{GetProducts, ListCreativeFormats};
use adcp_client::types::Product;
use adcp_client::Operation;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};

use super::{ScenarioContext, ScenarioOutcome};
use crate::probes::{check_format_ids, check_pagination};
use crate::result::StepResult;

const CONTRAST_BRIEF: &str = "Premium connected TV video for a luxury automotive launch";

fn product_ids(products: &[Product]) -> BTreeSet<String> {
    products.iter().map(|p| p.product_id.clone()).collect()
}

pub async fn behavior_analysis(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let brief = ctx.options.brief_text().to_string();
    let (first, mut step) = ctx
        .require::<GetProducts>("Products for configured brief", json!({ "brief": brief }))
        .await;
    if let Some(first) = &first {
        step.details(format!("{} products", first.products.len()));
    }
    ctx.record(step);

    let (second, mut step) = ctx
        .require::<GetProducts>("Products for contrasting brief", json!({ "brief": CONTRAST_BRIEF }))
        .await;
    if let (Some(first), Some(second)) = (&first, &second) {
        let a = product_ids(&first.products);
        let b = product_ids(&second.products);
        step.details(format!(
            "{} products; {} shared with the configured brief",
            b.len(),
            a.intersection(&b).count()
        ));
        if !a.is_empty() && a == b {
            step.warn("Identical products for unrelated briefs; the brief may be ignored");
        }
    }
    ctx.record(step);

    let channel = ctx
        .profile
        .channels
        .as_ref()
        .and_then(|c| c.first().cloned())
        .or_else(|| {
            first
                .as_ref()
                .and_then(|r| r.products.iter().find_map(|p| p.channels.first().cloned()))
        });
    match channel {
        Some(channel) => {
            let params = json!({
                "brief": ctx.options.brief_text(),
                "filters": { "channels": [channel] },
            });
            let (response, mut step) = ctx
                .require::<GetProducts>("Channel filter adherence", params)
                .await;
            if let Some(response) = response {
                let off_channel: Vec<&str> = response
                    .products
                    .iter()
                    .filter(|p| !p.channels.is_empty() && !p.channels.contains(&channel))
                    .map(|p| p.product_id.as_str())
                    .collect();
                if off_channel.is_empty() {
                    step.details(format!(
                        "{} products, all in channel '{}'",
                        response.products.len(),
                        channel
                    ));
                } else {
                    step.fail(format!(
                        "Filter channels=[{}] returned products outside it: {}",
                        channel,
                        off_channel.join(", ")
                    ));
                }
            }
            ctx.record(step);
        }
        None => ctx.note("Channel filter adherence", "No channels known; probe skipped"),
    }

    ctx.accept_either(
        "Discovery without brief",
        GetProducts::NAME,
        json!({}),
        "a get_products request without a brief",
    )
    .await;

    ctx.finish()
}

/// Structural identifier checks over a product list.
fn identifier_problems(products: &[Product]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    for (i, product) in products.iter().enumerate() {
        if product.product_id.is_empty() {
            problems.push(format!("products[{}] has no product_id", i));
        } else if !seen.insert(product.product_id.as_str()) {
            problems.push(format!("duplicate product_id '{}'", product.product_id));
        }
        let mut option_ids = HashSet::new();
        for option in &product.pricing_options {
            if option.pricing_option_id.is_empty() {
                problems.push(format!(
                    "product '{}' has a pricing option without pricing_option_id",
                    product.product_id
                ));
            } else if !option_ids.insert(option.pricing_option_id.as_str()) {
                problems.push(format!(
                    "product '{}' repeats pricing_option_id '{}'",
                    product.product_id, option.pricing_option_id
                ));
            }
        }
    }
    problems
}

pub async fn response_consistency(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let params = ctx.products_request();
    let (response, mut step) = ctx
        .require::<GetProducts>("Pagination consistency", params.clone())
        .await;
    let products = response.as_ref().map(|r| r.products.clone());
    if let Some(response) = &response {
        match check_pagination(response.query_summary.as_ref(), response.products.len()) {
            Ok(warnings) => {
                step.details(format!(
                    "{} products consistent with query_summary",
                    response.products.len()
                ));
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

    let Some(products) = products else {
        return ctx.finish();
    };

    let mut step = StepResult::new("Format identifier structure", Some(GetProducts::NAME));
    let format_ids: Vec<Value> = products
        .iter()
        .flat_map(|p| p.format_ids.iter().cloned())
        .collect();
    match check_format_ids(&format_ids) {
        Ok(()) => step.details(format!("{} format identifiers well-formed", format_ids.len())),
        Err(problems) => step.fail(problems.join("; ")),
    };
    ctx.record(step);

    let mut step = StepResult::new("Identifier integrity", Some(GetProducts::NAME));
    let problems = identifier_problems(&products);
    if problems.is_empty() {
        step.details("Product and pricing option identifiers are present and unique");
    } else {
        step.fail(problems.join("; "));
    }
    ctx.record(step);

    let (repeat, mut step) = ctx
        .require::<GetProducts>("Repeat query stability", params)
        .await;
    if let Some(repeat) = repeat {
        let before = product_ids(&products);
        let after = product_ids(&repeat.products);
        if before == after {
            step.details("Same products for an identical query");
        } else {
            step.details(format!("{} vs {} products", before.len(), after.len()));
            step.warn("Product set changed between identical queries");
        }
    }
    ctx.record(step);

    if ctx.has_tool(ListCreativeFormats::NAME) {
        let (response, mut step) = ctx
            .require::<ListCreativeFormats>("Creative format identifiers", json!({}))
            .await;
        if let Some(response) = response {
            let ids: Vec<Value> = response.formats.iter().map(|f| f.format_id.clone()).collect();
            match check_format_ids(&ids) {
                Ok(()) => step.details(format!("{} formats well-formed", ids.len())),
                Err(problems) => step.fail(problems.join("; ")),
            };
        }
        ctx.record(step);
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

    #[tokio::test]
    async fn test_channel_filter_violation() {
        let agent = ScriptedAgent::new("seller").with_tool("get_products", |_| {
            TaskResult::Success(json!({ "products": [
                { "product_id": "d1", "channels": ["display"] },
                { "product_id": "v1", "channels": ["olv"] }
            ]}))
        });
        let outcome =
            behavior_analysis(testing::context(Scenario::BehaviorAnalysis, &agent).await).await;

        let filter = testing::step(&outcome, "Channel filter adherence");
        assert!(!filter.passed);
        assert!(filter.error.as_deref().unwrap().contains("v1"));

        let contrast = testing::step(&outcome, "Products for contrasting brief");
        assert!(contrast.passed);
        assert_eq!(contrast.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_brief_sensitive_agent_passes() {
        let agent = ScriptedAgent::new("seller").with_tool("get_products", |params| {
            let brief = params["brief"].as_str().unwrap_or_default();
            let (id, channel) = if brief.contains("automotive") {
                ("ctv-1", "ctv")
            } else {
                ("disp-1", "display")
            };
            let wants = params["filters"]["channels"][0].as_str();
            if wants.is_some() && wants != Some(channel) {
                return TaskResult::Success(json!({ "products": [] }));
            }
            TaskResult::Success(json!({ "products": [{ "product_id": id, "channels": [channel] }] }))
        });
        let outcome =
            behavior_analysis(testing::context(Scenario::BehaviorAnalysis, &agent).await).await;
        assert!(outcome.steps.iter().all(|s| s.passed), "{:?}", outcome.steps);
        assert!(outcome.steps.iter().all(|s| s.warnings.is_empty()));
    }

    /// Test: total_matching=5, returned=0, no items is a pagination bug
    #[tokio::test]
    async fn test_pagination_bug() {
        let agent = ScriptedAgent::new("seller").with_success(
            "get_products",
            json!({ "products": [], "query_summary": { "total_matching": 5, "returned": 0 } }),
        );
        let outcome = response_consistency(
            testing::context(Scenario::ResponseConsistency, &agent).await,
        )
        .await;
        let step = testing::step(&outcome, "Pagination consistency");
        assert!(!step.passed);
        assert!(step.error.as_deref().unwrap().contains("Pagination bug"));
    }

    #[test]
    fn test_identifier_problems() {
        let products: Vec<Product> = serde_json::from_value(json!([
            { "product_id": "p1", "pricing_options": [
                { "pricing_option_id": "o1" }, { "pricing_option_id": "o1" }
            ]},
            { "product_id": "p1" },
            { "product_id": "" }
        ]))
        .expect("products");
        let problems = identifier_problems(&products);
        assert_eq!(problems.len(), 3);
    }
}
