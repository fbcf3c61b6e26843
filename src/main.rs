//! E2E monitor - main entry point.
//!
//! Schedules the built-in checks and serves their status over HTTP.

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use e2e_monitor::api::{self, ApiDoc};
use e2e_monitor::config::Config;
use e2e_monitor::harness::{T, TestResult};
use e2e_monitor::services::{LogNotifier, Runner};
use e2e_monitor::{errorf, logf};

fn always_passes(t: &T) -> TestResult {
    t.log("this is fine!");
    Ok(())
}

fn always_fails(t: &T) -> TestResult {
    t.log("this always fails");
    t.error("expected nil, got some error");
    errorf!(t, "expected {}, got {}", 0, 1);
    Ok(())
}

fn subtests(t: &T) -> TestResult {
    t.log("this test uses subtests");

    let cases = [("foo", "run foo", false), ("bar", "run bar", true)];
    for (name, log, fail) in cases {
        t.run(name, |t| {
            logf!(t, "this test logs: {}", log);
            if fail {
                t.error("fail");
            }
            Ok(())
        });
    }
    Ok(())
}

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - E2E_PORT, E2E_HISTORY_LIMIT and E2E_CHECK_INTERVAL_SECS must be numbers");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  E2E Monitor");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let runner = Runner::with_options(Arc::new(LogNotifier), config.history_limit);
    runner.schedule("TestAlwaysPasses", always_passes, config.check_interval);
    runner.schedule("TestAlwaysFails", always_fails, config.check_interval);
    runner.schedule("TestSubtests", subtests, config.check_interval);
    info!(
        "Scheduled {} checks every {}s (history limit: {})",
        runner.names().len(),
        config.check_interval.as_secs(),
        config.history_limit
    );

    let bind_address = config.bind_address();
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();
    let runner = web::Data::new(runner);

    if let Some(ref dir) = static_dir {
        info!("Dashboard served from {:?} at /ui", dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let server = HttpServer::new(move || {
        let cors = if is_development {
            // Dashboard dev server
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        } else {
            // Same-origin only
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        let mut app = App::new()
            // CORS must wrap before other middleware
            .wrap(cors)
            .wrap(e2e_monitor::middleware::RequestLogger)
            .app_data(runner.clone())
            .service(
                SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", ApiDoc::openapi()),
            )
            .service(web::scope("/api").configure(api::configure_routes));

        if let Some(ref dir) = static_dir {
            app = app.service(Files::new("/ui", dir.clone()).index_file("index.html"));
        }

        app.configure(api::configure_routes)
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
