//! Integration tests for the safety policy as seen through the pipeline.
//!
//! A denied plan must never reach the driver, whatever else the plan holds.

mod common;

use common::{PipelineHarness, plan};
use deskhand_approval::GateError;
use deskhand_audit::{AuditStage, AuditStatus};
use deskhand_core::Severity;
use deskhand_runtime::PipelineError;
use serde_json::json;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn denial_reasons(err: PipelineError) -> Vec<String> {
    match err {
        PipelineError::Gate(GateError::PolicyDenied(reasons)) => reasons,
        other => panic!("expected a policy denial, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Denials
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unlisted_application_is_denied_and_nothing_runs() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "open_app", "app_name": "chrome.exe"}),
        json!({"action": "open_app", "app_name": "cmd.exe"}),
    ])]);

    let err = h
        .pipeline
        .run("open chrome and a terminal", &CancellationToken::new())
        .await
        .unwrap_err();

    let reasons = denial_reasons(err);
    assert!(reasons.iter().any(|r| r.contains("'cmd.exe' is not whitelisted")));
    // The whitelisted step is held back too.
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_unsafe_extension_is_denied() {
    let h = PipelineHarness::new(vec![plan(&[json!({
        "action": "file_write",
        "file_path": "payload.exe",
        "content": "MZ"
    })])]);

    let reasons = denial_reasons(
        h.pipeline
            .run("save the payload", &CancellationToken::new())
            .await
            .unwrap_err(),
    );
    assert!(reasons.iter().any(|r| r.contains("'.exe'")));
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_dangerous_keyword_is_denied() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "open_app", "app_name": "gedit"}),
        json!({"action": "type_text", "text": "sudo rm -rf / --no-preserve-root"}),
    ])]);

    let reasons = denial_reasons(
        h.pipeline
            .run("clean up the disk", &CancellationToken::new())
            .await
            .unwrap_err(),
    );
    assert!(reasons.iter().any(|r| r.contains("dangerous keyword")));
    assert!(reasons.iter().all(|r| r.starts_with("step 2")));
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_path_escaping_base_dir_into_restricted_dir_is_denied() {
    let h = PipelineHarness::new(vec![plan(&[json!({
        "action": "file_read",
        "file_path": "../../../../../../etc/shadow.txt"
    })])]);

    let reasons = denial_reasons(
        h.pipeline
            .run("show me the shadow file", &CancellationToken::new())
            .await
            .unwrap_err(),
    );
    assert!(reasons.iter().any(|r| r.contains("restricted directory '/etc'")));
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_blocked_key_and_out_of_bounds_click_are_denied() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "key_press", "key": "Alt+F4"}),
        json!({"action": "click", "x": -5, "y": 20}),
    ])]);

    let reasons = denial_reasons(
        h.pipeline
            .run("close everything", &CancellationToken::new())
            .await
            .unwrap_err(),
    );
    assert_eq!(reasons.len(), 2);
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_denial_is_audited_at_validate_and_gate() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "open_app", "app_name": "regedit.exe"}),
    ])]);

    h.pipeline
        .run("open the registry", &CancellationToken::new())
        .await
        .unwrap_err();

    let entries = h.audit.entries().unwrap();
    let trail: Vec<_> = entries.iter().map(|e| (e.stage, e.status)).collect();
    assert_eq!(
        trail,
        vec![
            (AuditStage::Interpret, AuditStatus::Succeeded),
            (AuditStage::Validate, AuditStatus::Denied),
            (AuditStage::Gate, AuditStatus::Denied),
        ]
    );
    assert!(entries[1].output_summary.contains("regedit.exe"));
}

// ---------------------------------------------------------------------------
// Validation properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_validation_is_idempotent() {
    let actions = [
        json!({"action": "open_app", "app_name": "gedit"}),
        json!({"action": "file_write", "file_path": "notes.md", "content": "hi"}),
        json!({"action": "key_press", "key": "ctrl+alt+del"}),
    ];
    let h = PipelineHarness::new(vec![plan(&actions)]);

    let (plan, first) = h
        .pipeline
        .check("take notes", &CancellationToken::new())
        .await
        .unwrap();
    let policy = h.pipeline.policy();
    let second = policy.validate(&plan);
    let third = policy.validate(&plan);

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(first.severity(), Severity::Denied);
    assert_eq!(h.driver.call_count(), 0);
}

#[tokio::test]
async fn test_check_never_executes() {
    let h = PipelineHarness::new(vec![plan(&[
        json!({"action": "open_app", "app_name": "chrome.exe"}),
    ])]);

    let (plan, verdict) = h
        .pipeline
        .check("open chrome.exe", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(plan.len(), 1);
    assert!(verdict.is_allowed());
    assert_eq!(h.driver.call_count(), 0);
    assert_eq!(h.audit.entries().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reloaded_policy_applies_to_next_command() {
    let h = PipelineHarness::new(vec![
        plan(&[json!({"action": "open_app", "app_name": "firefox"})]),
        plan(&[json!({"action": "open_app", "app_name": "firefox"})]),
    ]);
    let cancel = CancellationToken::new();

    assert!(h.pipeline.run("open firefox", &cancel).await.is_err());

    h.pipeline.reload_policy(
        deskhand_test::test_policy_builder(h.base_dir())
            .whitelist(["firefox"])
            .build()
            .unwrap(),
    );
    let report = h.pipeline.run("open firefox", &cancel).await.unwrap();
    assert!(report.is_success());
    assert_eq!(h.driver.calls(), vec!["open_app firefox"]);
}
