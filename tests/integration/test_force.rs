//! Forced runs.

use actix_web::test;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_force_runs_job_in_background() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, body) = get_json(&app, "/force/TestAlwaysPasses").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "TestAlwaysPasses");
    assert_eq!(body["started"], true);

    let job = wait_for(&runner, "TestAlwaysPasses", |s| s.successes == 1).await;
    assert_eq!(job.failures, 0);
}

#[actix_rt::test]
async fn test_force_accepts_post() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let req = test::TestRequest::post()
        .uri("/api/force/TestAlwaysFails")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let job = wait_for(&runner, "TestAlwaysFails", |s| s.failures == 1).await;
    assert!(job.last_failure_output.contains("FAIL"));
}

#[actix_rt::test]
async fn test_force_unknown_job_is_not_found() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, body) = get_json(&app, "/force/Nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Job Nope not found");
    assert!(runner.status().get("Nope").is_none());
}

#[actix_rt::test]
async fn test_missing_name_is_bad_request() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    for uri in ["/force", "/api/force", "/log", "/history"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, 400, "{}", uri);
        assert_eq!(body["error"], "INVALID_INPUT");
    }
}
