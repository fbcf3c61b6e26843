//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "E2E Monitor",
        version = "0.1.0",
        description = "Status, forced runs and live output of scheduled end-to-end checks"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        // Job endpoints
        api::jobs::get_status,
        api::jobs::force_run,
        api::jobs::live_output,
        api::jobs::get_history,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            // Jobs
            models::JobState,
            models::JobStatus,
            models::HistoryEntry,
            api::jobs::ForceRunResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Jobs", description = "Scheduled check status and control")
    )
)]
pub struct ApiDoc;
