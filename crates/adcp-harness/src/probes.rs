//! Validation probe judgements.
//!
//! An adversarial probe's step passes when the agent behaves as the protocol
//! requires, which for a malformed request means rejecting it. The judgement
//! functions here are pure: they inspect a raw task result and settle a
//! step's pass/fail state.

use adcp_client::types::QuerySummary;
use adcp_client::TaskResult;
use serde_json::Value;

use crate::result::StepResult;

/// How loudly an accepted invalid request is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Critical,
}

/// The agent's reason for rejecting a request, if it rejected it.
///
/// A reported failure is a rejection; so is a success payload carrying a
/// non-empty `errors` array.
pub fn rejection_reason(result: &TaskResult<Value>) -> Option<String> {
    match result {
        TaskResult::Failure { error } => Some(error.clone()),
        TaskResult::Success(payload) => payload
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
            .map(|errors| describe_error(&errors[0])),
    }
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| map.get("code").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Settle `step` for a probe that must be rejected.
pub fn judge_rejection(
    step: &mut StepResult,
    result: &TaskResult<Value>,
    violation: &str,
    severity: Severity,
) {
    match rejection_reason(result) {
        Some(reason) => {
            step.pass(format!("Correctly rejected {}: {}", violation, reason));
        }
        None => {
            let message = match severity {
                Severity::Critical => format!("CRITICAL: agent accepted {}", violation),
                Severity::Normal => format!("Agent accepted {}", violation),
            };
            step.fail(message);
            if let Some(data) = result.data() {
                step.preview(data);
            }
        }
    }
}

/// Settle `step` for a probe that must be accepted.
pub fn judge_acceptance(step: &mut StepResult, result: &TaskResult<Value>, input: &str) {
    match rejection_reason(result) {
        Some(reason) => {
            step.fail(format!("Agent rejected {}: {}", input, reason));
        }
        None => {
            step.pass(format!("Accepted {}", input));
            if let Some(data) = result.data() {
                step.preview(data);
            }
        }
    }
}

/// Settle `step` for an input the protocol leaves to the agent: either
/// outcome passes and the behaviour is noted.
pub fn judge_either(step: &mut StepResult, result: &TaskResult<Value>, input: &str) {
    match rejection_reason(result) {
        Some(reason) => step.pass(format!("Agent rejected {} ({})", input, reason)),
        None => step.pass(format!("Agent accepted {}", input)),
    };
}

/// Listing-consistency check on a query summary against the items present.
///
/// Returns warnings for soft mismatches, or an error for a pagination bug:
/// `total_matching > 0` with `returned == 0` and no items.
pub fn check_pagination(
    summary: Option<&QuerySummary>,
    item_count: usize,
) -> Result<Vec<String>, String> {
    let Some(summary) = summary else {
        return Ok(Vec::new());
    };
    let mut warnings = Vec::new();
    let total = summary.total_matching.unwrap_or(0);
    let returned = summary.returned;

    if total > 0 && returned == Some(0) && item_count == 0 {
        return Err(format!(
            "Pagination bug: query_summary reports total_matching={} but returned=0 and no items",
            total
        ));
    }
    if let Some(returned) = returned {
        if returned != item_count as u64 {
            warnings.push(format!(
                "query_summary.returned={} but {} items present",
                returned, item_count
            ));
        }
    }
    if summary.total_matching.is_some() && total < item_count as u64 {
        warnings.push(format!(
            "query_summary.total_matching={} is less than the {} items returned",
            total, item_count
        ));
    }
    Ok(warnings)
}

/// Every format identifier must be an object with a non-empty string `id`.
///
/// Returns one message per malformed identifier.
pub fn check_format_ids(format_ids: &[Value]) -> Result<(), Vec<String>> {
    let problems: Vec<String> = format_ids
        .iter()
        .enumerate()
        .filter_map(|(i, id)| match id {
            Value::Object(map) => match map.get("id").and_then(Value::as_str) {
                Some(s) if !s.is_empty() => None,
                _ => Some(format!("format_ids[{}] has no string 'id' field", i)),
            },
            Value::String(s) => Some(format!(
                "format_ids[{}] is a bare string '{}', expected an object with 'id'",
                i, s
            )),
            other => Some(format!("format_ids[{}] has unexpected shape: {}", i, other)),
        })
        .collect();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step() -> StepResult {
        StepResult::new("probe", Some("create_media_buy"))
    }

    #[test]
    fn test_rejection_passes_when_agent_reports_failure() {
        let mut s = step();
        judge_rejection(
            &mut s,
            &TaskResult::failure("budget must be positive"),
            "negative budget",
            Severity::Critical,
        );
        assert!(s.passed);
        assert!(s.details.unwrap().contains("budget must be positive"));
    }

    #[test]
    fn test_rejection_fails_critically_when_accepted() {
        let mut s = step();
        judge_rejection(
            &mut s,
            &TaskResult::Success(json!({ "media_buy_id": "mb-1" })),
            "negative budget",
            Severity::Critical,
        );
        assert!(!s.passed);
        assert!(s.error.unwrap().starts_with("CRITICAL"));
        assert!(s.response_preview.unwrap().contains("mb-1"));
    }

    #[test]
    fn test_errors_array_counts_as_rejection() {
        let result = TaskResult::Success(json!({
            "errors": [{ "code": "INVALID_DATES", "message": "end before start" }]
        }));
        assert_eq!(rejection_reason(&result).as_deref(), Some("end before start"));

        let empty = TaskResult::Success(json!({ "errors": [] }));
        assert!(rejection_reason(&empty).is_none());
    }

    #[test]
    fn test_acceptance_inverts() {
        let mut s = step();
        judge_acceptance(&mut s, &TaskResult::failure("no"), "asap start time");
        assert!(!s.passed);

        let mut s = step();
        judge_acceptance(&mut s, &TaskResult::Success(json!({})), "asap start time");
        assert!(s.passed);
    }

    #[test]
    fn test_either_always_passes() {
        let mut s = step();
        judge_either(&mut s, &TaskResult::failure("zero budget"), "zero budget");
        assert!(s.passed);
        let mut s = step();
        judge_either(&mut s, &TaskResult::Success(json!({})), "zero budget");
        assert!(s.passed);
        assert_eq!(s.details.as_deref(), Some("Agent accepted zero budget"));
    }

    #[test]
    fn test_pagination_bug_detected() {
        let summary = QuerySummary {
            total_matching: Some(5),
            returned: Some(0),
        };
        let err = check_pagination(Some(&summary), 0).unwrap_err();
        assert!(err.starts_with("Pagination bug"));
    }

    #[test]
    fn test_pagination_consistent() {
        let summary = QuerySummary {
            total_matching: Some(10),
            returned: Some(2),
        };
        assert_eq!(check_pagination(Some(&summary), 2), Ok(vec![]));
        assert_eq!(check_pagination(None, 0), Ok(vec![]));

        let empty = QuerySummary {
            total_matching: Some(0),
            returned: Some(0),
        };
        assert_eq!(check_pagination(Some(&empty), 0), Ok(vec![]));
    }

    #[test]
    fn test_pagination_mismatch_warns() {
        let summary = QuerySummary {
            total_matching: Some(1),
            returned: Some(1),
        };
        let warnings = check_pagination(Some(&summary), 3).expect("no bug");
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_format_ids_structure() {
        assert!(check_format_ids(&[json!({ "agent_url": "https://c", "id": "d_300x250" })]).is_ok());
        let problems =
            check_format_ids(&[json!("display_300x250"), json!({ "agent_url": "https://c" })])
                .unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("bare string"));
    }
}
