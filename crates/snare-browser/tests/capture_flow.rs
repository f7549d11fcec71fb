//! End-to-end capture against a fake inspector running in an embedded JS engine.

mod common;

use common::{inspector_prelude, JsRemote};
use serde_json::json;
use snare_browser::{capture_and_persist, BrowserError, JsonFileSink, MemorySink, Trigger};
use snare_core::{ArmOrder, RemoteConfig, RetryConfig, SnareConfig};
use std::path::Path;
use tempfile::TempDir;

fn report_sink(dir: &Path) -> JsonFileSink {
    JsonFileSink::new(dir.join("latest-run/lhr.json"))
}

/// Run a capture expected to fail and check nothing was written
async fn assert_fails_without_output(remote: &JsRemote, config: &SnareConfig) -> BrowserError {
    let temp = TempDir::new().unwrap();
    let sink = report_sink(temp.path());

    let err = capture_and_persist(remote, config, &sink).await.unwrap_err();

    assert!(!sink.path().exists(), "report written despite {}", err);
    assert!(!temp.path().join("latest-run").exists());
    err
}

#[tokio::test]
async fn test_trigger_retries_until_enabled_and_clicks_once() {
    let remote = JsRemote::start(&inspector_prelude(4, 1));
    let trigger = Trigger::from_config(&RemoteConfig::default(), &RetryConfig::default()).unwrap();

    let outcome = trigger.fire(&remote).await.unwrap();

    assert_eq!(outcome.attempts, 5);
    assert_eq!(remote.inspect("showViewCalls"), Some(json!(5)));
    assert_eq!(remote.inspect("clicks"), Some(json!(1)));
}

#[tokio::test]
async fn test_bounded_trigger_never_clicks_disabled_button() {
    let remote = JsRemote::start(&inspector_prelude(100, 1));
    let policy = RetryConfig {
        max_attempts: Some(10),
        ..Default::default()
    };
    let trigger = Trigger::from_config(&RemoteConfig::default(), &policy).unwrap();

    let err = trigger.fire(&remote).await.unwrap_err();

    assert!(matches!(err, BrowserError::TriggerTimeout { attempts: 10, .. }));
    assert_eq!(remote.inspect("clicks"), Some(json!(0)));
}

#[tokio::test]
async fn test_capture_writes_report_exactly() {
    let remote = JsRemote::start(&inspector_prelude(2, 1));
    let temp = TempDir::new().unwrap();
    let sink = report_sink(temp.path());

    let outcome = capture_and_persist(&remote, &SnareConfig::default(), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.trigger.attempts, 3);
    assert_eq!(outcome.report, json!({ "score": 0.9 }));
    assert_eq!(
        std::fs::read_to_string(sink.path()).unwrap(),
        r#"{"score":0.9}"#
    );

    // The panel saw no difference and the override is gone
    assert_eq!(remote.inspect("lastRender"), Some(json!("rendered")));
    assert_eq!(remote.inspect("reportsBuilt"), Some(json!(1)));
    assert_eq!(remote.inspect("clicks"), Some(json!(1)));
    assert_eq!(
        remote.inspect("UI.panels.lighthouse.__proto__._buildReportUI === originalBuild"),
        Some(json!(true))
    );
}

#[tokio::test]
async fn test_arming_first_survives_fast_operation() {
    let remote = JsRemote::start(&inspector_prelude(1, 0));
    let sink = MemorySink::new();
    let mut config = SnareConfig::default();
    config.capture.arm_order = ArmOrder::BeforeTrigger;

    let outcome = capture_and_persist(&remote, &config, &sink).await.unwrap();

    assert_eq!(outcome.report, json!({ "score": 0.9 }));
    assert_eq!(sink.reports(), vec![json!({ "score": 0.9 })]);
    assert_eq!(remote.inspect("typeof globalThis.__snareCapture"), Some(json!("undefined")));
}

#[tokio::test]
async fn test_arming_after_trigger_misses_fast_operation() {
    let remote = JsRemote::start(&inspector_prelude(1, 0));
    let sink = MemorySink::new();

    let err = capture_and_persist(&remote, &SnareConfig::default(), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, BrowserError::RemoteException(_)), "{}", err);
    assert!(sink.reports().is_empty());
    assert_eq!(remote.inspect("reportsBuilt"), Some(json!(1)));
    // The late override is still waiting for a call that already happened
    assert_eq!(
        remote.inspect("UI.panels.lighthouse.__proto__._buildReportUI === originalBuild"),
        Some(json!(false))
    );
}

#[tokio::test]
async fn test_wrong_method_name_writes_nothing() {
    let remote = JsRemote::start(&inspector_prelude(0, 1));
    let mut config = SnareConfig::default();
    config.remote.method_name = "_renderReport".to_string();

    let err = assert_fails_without_output(&remote, &config).await;

    assert!(matches!(err, BrowserError::SnifferConfig(_)), "{}", err);
}

#[tokio::test]
async fn test_capture_index_past_arguments_writes_nothing() {
    // _buildReportUI(lhr, artifacts) plus its return value: index 3 is undefined
    let remote = JsRemote::start(&inspector_prelude(0, 1));
    let mut config = SnareConfig::default();
    config.remote.capture_index = 3;

    let err = assert_fails_without_output(&remote, &config).await;

    assert!(matches!(err, BrowserError::EmptyResult(_)), "{}", err);
    assert_eq!(remote.inspect("reportsBuilt"), Some(json!(1)));
}

#[tokio::test]
async fn test_trigger_timeout_writes_nothing() {
    let remote = JsRemote::start(&inspector_prelude(100, 1));
    let mut config = SnareConfig::default();
    config.retry.max_attempts = Some(5);

    let err = assert_fails_without_output(&remote, &config).await;

    assert!(matches!(err, BrowserError::TriggerTimeout { attempts: 5, .. }), "{}", err);
    assert_eq!(remote.inspect("clicks"), Some(json!(0)));
}
