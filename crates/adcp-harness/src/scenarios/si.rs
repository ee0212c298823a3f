//! Sponsored intelligence: offering availability and the session lifecycle.

use adcp_client::operations::{SiGetOffering, SiInitiateSession, SiSendMessage, SiTerminateSession};
use adcp_client::{Operation, TaskResult};
use serde_json::{json, Value};

use super::{track_created, ScenarioContext, ScenarioOutcome};
use crate::probes::{rejection_reason, Severity};

const UNKNOWN_SESSION_ID: &str = "si-session-nonexistent-conformance-000";
const UNKNOWN_OFFERING_ID: &str = "si-offering-nonexistent-conformance-000";

fn is_terminated(status: Option<&str>) -> bool {
    matches!(status, Some("terminated" | "closed" | "ended"))
}

fn user_context(ctx: &ScenarioContext) -> Value {
    json!({
        "context": ctx.options.brief_text(),
        "identity": { "consent_granted": false },
    })
}

pub async fn si_session_lifecycle(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let mut request = user_context(&ctx);
    request["offering_id"] = json!(ctx.buyer_ref("offering"));
    let (response, mut step) = ctx
        .require::<SiInitiateSession>("Initiate session", request)
        .await;
    let session_id = response.as_ref().and_then(|r| {
        let id = track_created(&mut step, r.session_id.as_deref());
        if id.is_none() {
            step.fail("si_initiate_session returned no session_id");
        }
        id
    });
    if let Some(id) = &session_id {
        step.details(format!("Opened session {}", id));
    }
    ctx.record(step);

    let Some(session_id) = session_id else {
        return ctx.finish();
    };

    let (response, mut step) = ctx
        .require::<SiSendMessage>(
            "Send message",
            json!({ "session_id": session_id, "message": "What do you recommend for a weekend trip?" }),
        )
        .await;
    if let Some(response) = response {
        if response.response.is_none() {
            step.warn("si_send_message returned no response content");
        }
        step.details(format!(
            "status={}",
            response.session_status.as_deref().unwrap_or("unspecified")
        ));
    }
    ctx.record(step);

    let (response, mut step) = ctx
        .require::<SiTerminateSession>(
            "Terminate session",
            json!({ "session_id": session_id, "reason": "user_exit" }),
        )
        .await;
    if let Some(response) = response {
        if response.terminated == Some(false) {
            step.fail("si_terminate_session reported terminated=false");
        } else {
            step.details(format!("Terminated {}", session_id));
        }
    }
    ctx.record(step);

    let (result, mut step) = ctx
        .raw(
            "Reject message after termination",
            SiSendMessage::NAME,
            json!({ "session_id": session_id, "message": "Are you still there?" }),
        )
        .await;
    if let Some(result) = &result {
        let closed_status = match result {
            TaskResult::Success(data) => {
                is_terminated(data.get("session_status").and_then(Value::as_str))
            }
            TaskResult::Failure { .. } => false,
        };
        match rejection_reason(result) {
            Some(reason) => {
                step.pass(format!("Correctly rejected message to closed session: {}", reason));
            }
            None if closed_status => {
                step.pass("Agent reported the session as terminated");
            }
            None => {
                step.fail("Agent accepted a message to a terminated session");
                step.preview(&result.data());
            }
        }
    }
    ctx.record(step);

    ctx.expect_rejection(
        "Reject unknown session",
        SiSendMessage::NAME,
        json!({ "session_id": UNKNOWN_SESSION_ID, "message": "Hello" }),
        "a message to an unknown session",
        Severity::Normal,
    )
    .await;

    ctx.finish()
}

pub async fn si_availability(mut ctx: ScenarioContext) -> ScenarioOutcome {
    let mut request = user_context(&ctx);
    request["offering_id"] = json!(ctx.buyer_ref("offering"));
    let (response, mut step) = ctx.require::<SiGetOffering>("Get offering", request).await;
    if let Some(response) = response {
        if response.available {
            match response.offering_token.as_deref() {
                Some(token) if !token.is_empty() => {
                    step.details("Offering available with token");
                }
                _ => {
                    step.fail("Available offering without offering_token");
                }
            }
        } else {
            step.details(format!(
                "Offering unavailable: {}",
                response.unavailable_reason.as_deref().unwrap_or("no reason given")
            ));
        }
    }
    ctx.record(step);

    let mut request = user_context(&ctx);
    request["offering_id"] = json!(UNKNOWN_OFFERING_ID);
    let (result, mut step) = ctx
        .raw("Unknown offering", SiGetOffering::NAME, request)
        .await;
    if let Some(result) = &result {
        let available = result
            .data()
            .and_then(|d| d.get("available"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        match rejection_reason(result) {
            Some(reason) => {
                step.pass(format!("Correctly rejected unknown offering: {}", reason));
            }
            None if !available => {
                step.pass("Unknown offering reported unavailable");
            }
            None => {
                step.fail(format!("Agent reported {} as available", UNKNOWN_OFFERING_ID));
            }
        }
    }
    ctx.record(step);

    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use crate::scenarios::testing;
    use adcp_client::fakes::ScriptedAgent;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    fn session_agent() -> ScriptedAgent {
        let open: Arc<Mutex<HashSet<String>>> = Arc::default();
        let (init, send, term) = (open.clone(), open.clone(), open);
        ScriptedAgent::new("si")
            .with_tool("si_initiate_session", move |_| {
                init.lock().unwrap().insert("sess-1".to_string());
                TaskResult::Success(json!({ "session_id": "sess-1", "session_status": "active" }))
            })
            .with_tool("si_send_message", move |params| {
                let id = params["session_id"].as_str().unwrap_or_default();
                if send.lock().unwrap().contains(id) {
                    TaskResult::Success(json!({ "session_id": id, "response": { "text": "Try the coast." } }))
                } else {
                    TaskResult::failure("session not found")
                }
            })
            .with_tool("si_terminate_session", move |params| {
                let id = params["session_id"].as_str().unwrap_or_default();
                let removed = term.lock().unwrap().remove(id);
                TaskResult::Success(json!({ "session_id": id, "terminated": removed }))
            })
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let agent = session_agent();
        let outcome =
            si_session_lifecycle(testing::context(Scenario::SiSessionLifecycle, &agent).await)
                .await;
        assert_eq!(
            testing::step_names(&outcome),
            vec![
                "Initiate session",
                "Send message",
                "Terminate session",
                "Reject message after termination",
                "Reject unknown session"
            ]
        );
        assert!(outcome.steps.iter().all(|s| s.passed), "{:?}", outcome.steps);
    }

    /// Test: a terminated status on a later message counts as rejection
    #[tokio::test]
    async fn test_terminated_status_counts_as_rejection() {
        let agent = ScriptedAgent::new("si")
            .with_success("si_initiate_session", json!({ "session_id": "s" }))
            .with_success("si_terminate_session", json!({ "terminated": true }))
            .with_success("si_send_message", json!({ "session_status": "terminated" }));
        let outcome =
            si_session_lifecycle(testing::context(Scenario::SiSessionLifecycle, &agent).await)
                .await;
        assert!(testing::step(&outcome, "Reject message after termination").passed);
        assert!(!testing::step(&outcome, "Reject unknown session").passed);
    }

    #[tokio::test]
    async fn test_available_offering_requires_token() {
        let agent = ScriptedAgent::new("si").with_success("si_get_offering", json!({ "available": true }));
        let outcome =
            si_availability(testing::context(Scenario::SiAvailability, &agent).await).await;
        assert!(!testing::step(&outcome, "Get offering").passed);
        assert!(!testing::step(&outcome, "Unknown offering").passed);
    }

    #[tokio::test]
    async fn test_unavailable_offering_passes() {
        let agent = ScriptedAgent::new("si").with_success(
            "si_get_offering",
            json!({ "available": false, "unavailable_reason": "no inventory" }),
        );
        let outcome =
            si_availability(testing::context(Scenario::SiAvailability, &agent).await).await;
        assert!(outcome.steps.iter().all(|s| s.passed), "{:?}", outcome.steps);
    }
}
