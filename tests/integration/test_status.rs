//! Status and health endpoints.

use super::test_helpers::*;

#[actix_rt::test]
async fn test_status_lists_jobs_that_never_ran() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, body) = get_json(&app, "/status").await;
    assert_eq!(status, 200);

    let job = &body["TestAlwaysPasses"];
    assert_eq!(job["Name"], "TestAlwaysPasses");
    assert_eq!(job["State"], "");
    assert!(job["LastSuccessTime"].is_null());
    assert!(job["LastFailureTime"].is_null());
    assert_eq!(job["LastFailureOutput"], "");
    assert_eq!(job["Failures"], 0);
    assert_eq!(job["Successes"], 0);
    assert_eq!(body.as_object().map(|o| o.len()), Some(2));
}

#[actix_rt::test]
async fn test_status_after_runs() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    runner.run_job("TestAlwaysPasses").await.unwrap();
    runner.run_job("TestAlwaysFails").await.unwrap();

    let (status, body) = get_json(&app, "/status").await;
    assert_eq!(status, 200);

    let passed = &body["TestAlwaysPasses"];
    assert_eq!(passed["State"], "PASSED");
    assert_eq!(passed["Successes"], 1);
    assert!(passed["LastSuccessTime"].is_string());
    assert!(passed["LastFailureTime"].is_null());

    let failed = &body["TestAlwaysFails"];
    assert_eq!(failed["State"], "FAILED");
    assert_eq!(failed["Failures"], 1);
    assert!(failed["LastFailureTime"].is_string());
    let output = failed["LastFailureOutput"].as_str().unwrap();
    assert!(output.contains("expected nil, got some error"));
    assert!(output.ends_with("FAIL\n"));
}

#[actix_rt::test]
async fn test_api_prefix_serves_same_routes() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (root_status, root_body) = get_json(&app, "/status").await;
    let (api_status, api_body) = get_json(&app, "/api/status").await;
    assert_eq!(root_status, 200);
    assert_eq!(api_status, 200);
    assert_eq!(root_body, api_body);
}

#[actix_rt::test]
async fn test_health_reports_job_count() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    for uri in ["/health", "/api/health"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["jobs"], 2);
    }
}
