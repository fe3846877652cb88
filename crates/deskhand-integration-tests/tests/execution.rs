//! Integration tests for plan execution: ordering, isolation between
//! steps, fatal steps and cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{PipelineHarness, plan};
use deskhand_automation::{CANCELLED_REASON, DriverError};
use deskhand_core::{ActionKind, ActionOutcome, ExecutionError};
use deskhand_interpreter::InterpretError;
use deskhand_runtime::PipelineError;
use deskhand_test::{MockDriver, MockLlmTurn, ScriptedConfirmation};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_steps_run_in_plan_order() {
    let h = PipelineHarness::builder(vec![plan(&[
        json!({"action": "open_app", "app_name": "gedit"}),
        json!({"action": "wait", "seconds": 0.01}),
        json!({"action": "click", "x": 200, "y": 120}),
        json!({"action": "type_text", "text": "shopping list"}),
        json!({"action": "key_press", "key": "ctrl+s"}),
    ])])
    .build();

    let report = h
        .pipeline
        .run("start a shopping list in gedit", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_success());
    let kinds: Vec<String> = h
        .driver
        .calls()
        .iter()
        .map(|c| c.split(' ').next().unwrap().to_string())
        .collect();
    assert_eq!(
        kinds,
        vec!["open_app", "wait", "click", "type_text", "key_press"]
    );
    assert_eq!(report.lines().len(), 5);
}

#[tokio::test]
async fn test_timed_out_step_does_not_stop_the_next() {
    let driver = MockDriver::new().slow(ActionKind::TypeText, Duration::from_millis(500));
    let h = PipelineHarness::builder(vec![plan(&[
        json!({"action": "type_text", "text": "hello"}),
        json!({"action": "open_app", "app_name": "chrome.exe"}),
    ])])
    .driver(driver)
    .action_timeout(Duration::from_millis(50))
    .build();

    let report = h
        .pipeline
        .run("say hello and open chrome", &CancellationToken::new())
        .await
        .unwrap();

    let outcomes = report.outcome.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].error(), Some(ExecutionError::Timeout));
    assert!(outcomes[1].is_success());
    assert!(h.driver.calls().contains(&"open_app chrome.exe".to_string()));
    assert_eq!(report.outcome.summary(), "1 succeeded, 1 failed, 0 skipped");
}

#[tokio::test]
async fn test_driver_failure_is_captured_per_step() {
    let driver = MockDriver::new().failing(
        ActionKind::OpenApp,
        DriverError::NotFound("calculator".to_string()),
    );
    let h = PipelineHarness::builder(vec![plan(&[
        json!({"action": "open_app", "app_name": "calculator"}),
        json!({"action": "scroll", "direction": "down", "clicks": 2}),
    ])])
    .driver(driver)
    .build();

    let report = h
        .pipeline
        .run("open the calculator and scroll", &CancellationToken::new())
        .await
        .unwrap();

    let outcomes = report.outcome.outcomes();
    assert_eq!(outcomes[0].error(), Some(ExecutionError::TargetNotFound));
    assert!(outcomes[1].is_success());
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_fatal_failure_skips_the_rest() {
    let driver = MockDriver::new().failing(
        ActionKind::OpenApp,
        DriverError::NotFound("gedit".to_string()),
    );
    let response = json!({
        "actions": [
            {"action": "open_app", "app_name": "gedit", "fatal": true},
            {"action": "type_text", "text": "dear diary"},
            {"action": "key_press", "key": "ctrl+s"},
        ]
    })
    .to_string();
    let h = PipelineHarness::builder(vec![MockLlmTurn::text(response)])
        .driver(driver)
        .build();

    let report = h
        .pipeline
        .run("write in my diary", &CancellationToken::new())
        .await
        .unwrap();

    let outcomes = report.outcome.outcomes();
    assert!(outcomes[0].is_failure());
    assert!(outcomes[1].is_skipped());
    assert!(outcomes[2].is_skipped());
    assert_eq!(h.driver.calls(), vec!["open_app gedit"]);
}

#[tokio::test]
async fn test_cancel_before_interpretation() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "open_app", "app_name": "gedit"}),
    ])]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h.pipeline.run("open gedit", &cancel).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Interpret(InterpretError::Cancelled)
    ));
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_mid_plan_skips_remaining_steps() {
    let driver = MockDriver::new().slow(ActionKind::OpenApp, Duration::from_millis(200));
    let h = PipelineHarness::builder(vec![plan(&[
        json!({"action": "open_app", "app_name": "gedit"}),
        json!({"action": "type_text", "text": "never typed"}),
    ])])
    .driver(driver)
    .confirm_with(Arc::new(ScriptedConfirmation::accepting()))
    .build();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = h.pipeline.run("open gedit and type", &cancel).await.unwrap();

    let outcomes = report.outcome.outcomes();
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[1], ActionOutcome::skipped(CANCELLED_REASON));
    assert_eq!(h.driver.calls(), vec!["open_app gedit"]);
}

#[tokio::test]
async fn test_file_round_trip_through_the_driver() {
    let h = PipelineHarness::builder(vec![
        plan(&[json!({"action": "file_write", "file_path": "todo.txt", "content": "milk"})]),
        plan(&[json!({"action": "file_read", "file_path": "todo.txt"})]),
    ])
    .confirm_with(Arc::new(ScriptedConfirmation::accepting()))
    .build();
    let cancel = CancellationToken::new();

    let write = h.pipeline.run("note milk", &cancel).await.unwrap();
    assert!(write.confirmed);

    let read = h.pipeline.run("what's on my list", &cancel).await.unwrap();
    assert!(!read.confirmed);
    assert_eq!(
        read.outcome.outcomes()[0],
        ActionOutcome::succeeded("File content:\nmilk")
    );
}
