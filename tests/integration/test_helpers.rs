//! Shared test helpers for HTTP integration tests.

use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use e2e_monitor::api;
use e2e_monitor::harness::{T, TestResult};
use e2e_monitor::models::JobStatus;
use e2e_monitor::services::Runner;
use serde_json::Value;

pub fn passes(t: &T) -> TestResult {
    t.log("this is fine!");
    Ok(())
}

pub fn fails(t: &T) -> TestResult {
    t.log("this always fails");
    t.error("expected nil, got some error");
    Ok(())
}

/// Runner with one passing and one failing job, neither of which has run.
pub fn create_runner() -> Runner {
    let runner = Runner::new();
    runner.register("TestAlwaysPasses", passes);
    runner.register("TestAlwaysFails", fails);
    runner
}

/// Create a test app with routes mounted at the root and under `/api`.
pub async fn create_test_app(
    runner: &Runner,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(runner.clone()))
            .service(web::scope("/api").configure(api::configure_routes))
            .configure(api::configure_routes),
    )
    .await
}

/// GET `uri` and return the status code and JSON body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET `uri` and return the status code, content type and raw body.
pub async fn get_text<S>(app: &S, uri: &str) -> (u16, String, String)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = test::read_body(resp).await;
    (
        status,
        content_type,
        String::from_utf8_lossy(&body).into_owned(),
    )
}

/// Poll the runner until `name` satisfies `done`, or panic after a few seconds.
pub async fn wait_for<F>(runner: &Runner, name: &str, done: F) -> JobStatus
where
    F: Fn(&JobStatus) -> bool,
{
    for _ in 0..500 {
        if let Some(status) = runner.status().get(name)
            && done(status)
        {
            return status.clone();
        }
        actix_rt::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach the expected state", name);
}
