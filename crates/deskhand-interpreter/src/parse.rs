//! Strict parsing of model responses into plans.
//!
//! Accepted shapes, after Markdown fences are stripped:
//!
//! - `{"actions": [ ... ], "reasoning": "..."}` where each element is an
//!   action object with an optional boolean `fatal`
//! - `{"refusal": "..."}`, or the older `{"action": "error", "error": "..."}`
//!
//! Anything else is a schema violation. Values are never coerced: a string
//! where a number belongs fails the whole plan.

use deskhand_core::{Action, ActionPlan, PlanStep};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{InterpretError, InterpretResult};

/// Remove a surrounding Markdown code fence, if any.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) up to the first newline.
        body = match rest.find('\n') {
            Some(newline) => &rest[newline..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse a model response into a plan.
///
/// # Errors
///
/// [`InterpretError::Refused`] for a refusal object,
/// [`InterpretError::SchemaViolation`] for everything that is not a valid
/// plan.
pub fn parse_plan(response: &str) -> InterpretResult<ActionPlan> {
    let body = strip_code_fences(response);
    if body.is_empty() {
        return Err(violation("empty response"));
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| violation(format!("not valid JSON: {e}")))?;
    let Value::Object(mut object) = value else {
        return Err(violation("response is not a JSON object"));
    };

    if let Some(reason) = refusal(&object)? {
        return Err(InterpretError::Refused { reason });
    }

    if let Some(reasoning) = object.remove("reasoning") {
        debug!(reasoning = %reasoning, "Model reasoning");
    }
    let actions = object
        .remove("actions")
        .ok_or_else(|| violation("missing 'actions' array"))?;
    if let Some(extra) = object.keys().next() {
        return Err(violation(format!("unexpected top-level field '{extra}'")));
    }
    let Value::Array(elements) = actions else {
        return Err(violation("'actions' is not an array"));
    };

    let steps = elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| parse_step(index.saturating_add(1), element))
        .collect::<InterpretResult<Vec<_>>>()?;
    Ok(ActionPlan::new(steps))
}

fn refusal(object: &Map<String, Value>) -> InterpretResult<Option<String>> {
    if let Some(reason) = object.get("refusal") {
        return match reason {
            Value::String(reason) => Ok(Some(reason.clone())),
            _ => Err(violation("'refusal' is not a string")),
        };
    }
    if object.get("action").and_then(Value::as_str) == Some("error") {
        let reason = object
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("no reason given");
        return Ok(Some(reason.to_string()));
    }
    Ok(None)
}

fn parse_step(number: usize, element: Value) -> InterpretResult<PlanStep> {
    let Value::Object(mut fields) = element else {
        return Err(violation(format!("step {number}: not a JSON object")));
    };
    let fatal = match fields.remove("fatal") {
        None => false,
        Some(Value::Bool(fatal)) => fatal,
        Some(other) => {
            return Err(violation(format!(
                "step {number}: 'fatal' must be a boolean, got {other}"
            )));
        },
    };
    let action: Action = serde_json::from_value(Value::Object(fields))
        .map_err(|e| violation(format!("step {number}: {e}")))?;
    action
        .check_shape()
        .map_err(|e| violation(format!("step {number}: {e}")))?;

    Ok(if fatal {
        PlanStep::fatal(action)
    } else {
        PlanStep::new(action)
    })
}

fn violation(reason: impl Into<String>) -> InterpretError {
    InterpretError::SchemaViolation(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_core::{ActionKind, MouseButton, WriteMode};
    use std::path::PathBuf;

    fn schema_reason(response: &str) -> String {
        match parse_plan(response) {
            Err(InterpretError::SchemaViolation(reason)) => reason,
            other => panic!("expected a schema violation, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```json{}```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_parses_plan_with_defaults() {
        let plan = parse_plan(
            r#"```json
            {"reasoning": "open and type", "actions": [
                {"action": "open_app", "app_name": "gedit", "fatal": true},
                {"action": "type", "text": "hi"},
                {"action": "click", "x": 10, "y": 20},
                {"action": "file_write", "file_path": "a.txt", "content": "x", "mode": "append"},
                {"action": "wait", "seconds": 2}
            ]}
            ```"#,
        )
        .unwrap();

        assert_eq!(plan.len(), 5);
        assert!(plan.steps()[0].is_fatal());
        assert!(!plan.steps()[1].is_fatal());
        assert_eq!(plan.steps()[1].action().kind(), ActionKind::TypeText);
        assert_eq!(
            plan.steps()[2].action(),
            &Action::Click {
                x: 10,
                y: 20,
                button: MouseButton::Left,
                clicks: 1
            }
        );
        assert_eq!(
            plan.steps()[3].action(),
            &Action::FileWrite {
                file_path: PathBuf::from("a.txt"),
                content: "x".to_string(),
                mode: WriteMode::Append
            }
        );
    }

    #[test]
    fn test_empty_actions_is_empty_plan() {
        assert!(parse_plan(r#"{"actions": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_refusals() {
        assert_eq!(
            parse_plan(r#"{"refusal": "too vague"}"#),
            Err(InterpretError::Refused {
                reason: "too vague".to_string()
            })
        );
        assert_eq!(
            parse_plan(r#"{"action": "error", "error": "unsafe", "reasoning": "x"}"#),
            Err(InterpretError::Refused {
                reason: "unsafe".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let reason = schema_reason(r#"{"actions": [{"action": "run_shell", "cmd": "ls"}]}"#);
        assert!(reason.starts_with("step 1:"), "{reason}");
    }

    #[test]
    fn test_rejects_missing_field() {
        let reason = schema_reason(r#"{"actions": [{"action": "open_app"}]}"#);
        assert!(reason.contains("app_name"), "{reason}");
    }

    #[test]
    fn test_rejects_wrong_type_without_coercion() {
        let reason = schema_reason(r#"{"actions": [{"action": "click", "x": "100", "y": 5}]}"#);
        assert!(reason.starts_with("step 1:"), "{reason}");
        schema_reason(r#"{"actions": [{"action": "wait", "seconds": 1, "fatal": "yes"}]}"#);
    }

    #[test]
    fn test_rejects_extra_fields() {
        schema_reason(r#"{"actions": [{"action": "wait", "seconds": 1, "speed": 2}]}"#);
        schema_reason(r#"{"actions": [], "confidence": 0.9}"#);
    }

    #[test]
    fn test_rejects_shape_violations() {
        let reason = schema_reason(
            r#"{"actions": [{"action": "wait", "seconds": 1}, {"action": "open_app", "app_name": "  "}]}"#,
        );
        assert!(reason.starts_with("step 2:"), "{reason}");
    }

    #[test]
    fn test_rejects_non_plans() {
        schema_reason("");
        schema_reason("Sure! I'll open gedit for you.");
        schema_reason("[1, 2]");
        schema_reason(r#"{"reasoning": "no actions"}"#);
        schema_reason(r#"{"actions": {"action": "wait"}}"#);
        schema_reason(r#"{"refusal": 42}"#);
    }
}
