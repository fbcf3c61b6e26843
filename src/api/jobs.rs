//! Job API handlers: status table, forced runs, live output and history.

use std::collections::BTreeMap;

use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::{HistoryEntry, JobStatus};
use crate::services::Runner;

/// Response after starting a forced run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForceRunResponse {
    /// Job name
    pub name: String,
    /// Always true: the run was queued and executes in the background
    pub started: bool,
}

/// Extract the `{name}` path segment, rejecting requests without one.
fn name_param(req: &HttpRequest) -> AppResult<&str> {
    req.match_info()
        .get("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput("missing test name param".to_string()))
}

/// Status of every scheduled job.
///
/// A job that is running is reported with state `RUNNING` and the counters of
/// its previous run.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "Jobs",
    responses(
        (status = 200, description = "Job table keyed by name", body = BTreeMap<String, JobStatus>)
    )
)]
pub async fn get_status(runner: web::Data<Runner>) -> HttpResponse {
    let status: BTreeMap<String, JobStatus> = runner.status();
    HttpResponse::Ok().json(status)
}

/// Trigger a run of a job without waiting for it.
///
/// If the job is already running, the new run starts when the current one completes.
#[utoipa::path(
    get,
    path = "/api/force/{name}",
    tag = "Jobs",
    params(
        ("name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 200, description = "Run started", body = ForceRunResponse),
        (status = 400, description = "Missing job name", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn force_run(req: HttpRequest, runner: web::Data<Runner>) -> AppResult<HttpResponse> {
    let name = name_param(&req)?;
    runner.force_run(name)?;

    Ok(HttpResponse::Ok().json(ForceRunResponse {
        name: name.to_string(),
        started: true,
    }))
}

/// Output accumulated so far by the run in progress.
#[utoipa::path(
    get,
    path = "/api/log/{name}",
    tag = "Jobs",
    params(
        ("name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 200, description = "Rendered output of the running test", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing job name", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found or not running", body = crate::error::ErrorResponse),
    )
)]
pub async fn live_output(req: HttpRequest, runner: web::Data<Runner>) -> AppResult<HttpResponse> {
    let name = name_param(&req)?;
    let output = runner.live_output(name)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(output))
}

/// Records of past runs of a job, oldest first.
#[utoipa::path(
    get,
    path = "/api/history/{name}",
    tag = "Jobs",
    params(
        ("name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 200, description = "History entries", body = Vec<HistoryEntry>),
        (status = 400, description = "Missing job name", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_history(req: HttpRequest, runner: web::Data<Runner>) -> AppResult<HttpResponse> {
    let name = name_param(&req)?;
    let history = runner.history(name)?;
    Ok(HttpResponse::Ok().json(history))
}

/// Configure job routes. Mounted both at the root and under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/status").route(web::get().to(get_status)))
        .service(
            web::resource(["/force", "/force/{name}"])
                .route(web::get().to(force_run))
                .route(web::post().to(force_run)),
        )
        .service(web::resource(["/log", "/log/{name}"]).route(web::get().to(live_output)))
        .service(
            web::resource(["/history", "/history/{name}"]).route(web::get().to(get_history)),
        );
}
