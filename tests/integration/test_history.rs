//! Run history.

use e2e_monitor::services::{NoopNotifier, Runner};
use std::sync::Arc;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_history_empty_before_second_run() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, body) = get_json(&app, "/history/TestAlwaysPasses").await;
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!([]));

    runner.run_job("TestAlwaysPasses").await.unwrap();
    let (_, body) = get_json(&app, "/history/TestAlwaysPasses").await;
    assert_eq!(body, serde_json::json!([]));
}

#[actix_rt::test]
async fn test_history_records_previous_runs() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    for _ in 0..3 {
        runner.run_job("TestAlwaysFails").await.unwrap();
    }

    let (status, body) = get_json(&app, "/api/history/TestAlwaysFails").await;
    assert_eq!(status, 200);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["Failures"], 1);
    assert_eq!(entries[1]["Failures"], 2);
    assert_eq!(entries[1]["Name"], "TestAlwaysFails");
    assert_eq!(entries[1]["State"], "FAILED");
    assert!(entries[1]["RecordedAt"].is_string());
}

#[actix_rt::test]
async fn test_history_is_bounded() {
    let runner = Runner::with_options(Arc::new(NoopNotifier), 1);
    runner.register("TestAlwaysPasses", passes);
    let app = create_test_app(&runner).await;

    for _ in 0..4 {
        runner.run_job("TestAlwaysPasses").await.unwrap();
    }

    let (_, body) = get_json(&app, "/history/TestAlwaysPasses").await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["Successes"], 3);
}

#[actix_rt::test]
async fn test_history_unknown_job_is_not_found() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, body) = get_json(&app, "/history/Nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}
