//! API endpoint modules.

pub mod health;
pub mod jobs;
pub mod openapi;

pub use health::configure_health_routes;
pub use jobs::configure_routes as configure_job_routes;
pub use openapi::ApiDoc;

use actix_web::web;

/// Configure every API route. Mounted both at the root and under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_job_routes);
}
